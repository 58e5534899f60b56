//! Daemon configuration.
//!
//! Flags win over environment variables; the environment surface is
//! what a deployment manifest would set (`RELAY_NAMESPACE`,
//! `RELAY_CONTROL_PLANE_URL`, `RELAY_PORT`, `RELAY_DEFAULT_TTL`).

use anyhow::{Context, bail};

pub const NAMESPACE_ENV: &str = "RELAY_NAMESPACE";
pub const CONTROL_PLANE_ENV: &str = "RELAY_CONTROL_PLANE_URL";
pub const PORT_ENV: &str = "RELAY_PORT";
pub const DEFAULT_TTL_ENV: &str = "RELAY_DEFAULT_TTL";

const DEFAULT_PORT: u16 = 8080;

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace whose triggers this broker serves.
    pub namespace: String,
    /// Base URL of the control plane's trigger listing API.
    pub control_plane: String,
    /// Ingress listen port.
    pub port: u16,
    /// Hop count assigned to events that arrive without one.
    pub default_ttl: i64,
    /// Seconds between full registry resyncs.
    pub resync_interval_secs: u64,
}

impl Config {
    /// Merge CLI flags with the environment.
    pub fn resolve(
        namespace: Option<String>,
        control_plane: Option<String>,
        port: Option<u16>,
        default_ttl: Option<i64>,
        resync_interval_secs: u64,
    ) -> anyhow::Result<Self> {
        let namespace = match namespace.or_else(|| env_var(NAMESPACE_ENV)) {
            Some(ns) => ns,
            None => bail!("namespace is required (--namespace or {NAMESPACE_ENV})"),
        };
        let control_plane = match control_plane.or_else(|| env_var(CONTROL_PLANE_ENV)) {
            Some(url) => url,
            None => bail!("control plane URL is required (--control-plane or {CONTROL_PLANE_ENV})"),
        };

        let port = match port {
            Some(port) => port,
            None => match env_var(PORT_ENV) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("invalid {PORT_ENV} value `{raw}`"))?,
                None => DEFAULT_PORT,
            },
        };
        let default_ttl = match default_ttl {
            Some(ttl) => ttl,
            None => match env_var(DEFAULT_TTL_ENV) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("invalid {DEFAULT_TTL_ENV} value `{raw}`"))?,
                None => relay_event::DEFAULT_TTL,
            },
        };
        if default_ttl <= 0 {
            bail!("default TTL must be positive, got {default_ttl}");
        }

        Ok(Self {
            namespace,
            control_plane,
            port,
            default_ttl,
            resync_interval_secs,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
