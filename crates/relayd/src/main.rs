//! relayd — the event broker daemon.
//!
//! Single binary that assembles the broker pipeline:
//! - Trigger registry, prewarmed from the control plane before serving
//! - Background resync loop (eventual consistency with the control plane)
//! - Dispatcher (outbound delivery)
//! - Ingress HTTP server
//!
//! # Usage
//!
//! ```text
//! relayd --namespace default --control-plane http://controller:8080
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use relay_dispatch::Dispatcher;
use relay_ingress::{Ingress, IngressServer};
use relay_registry::{HttpTriggerSource, TriggerRegistry};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "relayd", about = "Relay event broker daemon")]
struct Cli {
    /// Namespace whose triggers this broker serves.
    #[arg(long)]
    namespace: Option<String>,

    /// Base URL of the control plane's trigger listing API.
    #[arg(long)]
    control_plane: Option<String>,

    /// Port for the ingress listener.
    #[arg(long)]
    port: Option<u16>,

    /// Hop count assigned to events arriving without one.
    #[arg(long)]
    default_ttl: Option<i64>,

    /// Seconds between full registry resyncs.
    #[arg(long, default_value = "60")]
    resync_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relayd=debug,relay=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(
        cli.namespace,
        cli.control_plane,
        cli.port,
        cli.default_ttl,
        cli.resync_interval,
    )?;

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(
        namespace = %config.namespace,
        port = config.port,
        default_ttl = config.default_ttl,
        "relayd starting"
    );

    let registry = Arc::new(TriggerRegistry::new());
    let source = HttpTriggerSource::new(config.control_plane.clone(), config.namespace.clone());

    // Blocking prewarm: serving with a cold cache would spuriously
    // reject all traffic, so failure here is fatal.
    let warm = registry.prewarm(&source).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic full resync keeps the cache eventually consistent even
    // if individual watch notifications are missed.
    let resync_interval = Duration::from_secs(config.resync_interval_secs);
    {
        let registry = registry.clone();
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(resync_interval);
            ticker.tick().await; // First tick fires immediately; skip it.
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = registry.resync(&source).await {
                            warn!(error = %e, "registry resync failed, keeping cached view");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    // Translate the process signal into the shutdown watch.
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    let ingress = Arc::new(Ingress::new(
        registry,
        Dispatcher::new(),
        config.default_ttl,
    ));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let server = IngressServer::bind(addr, ingress).await?;

    if let Err(e) = server.serve(warm, shutdown_rx).await {
        error!(error = %e, "ingress server exited with error");
        return Err(e);
    }

    info!("relayd exiting");
    Ok(())
}
