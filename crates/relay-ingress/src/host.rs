//! Request addressing: the host header encodes the target trigger.
//!
//! Triggers are addressed as `<name>.<namespace>[.<cluster suffix>]`,
//! the shape a cluster DNS name naturally takes. Only the first two
//! labels matter; any port and any further labels are ignored.

use thiserror::Error;

use relay_registry::TriggerKey;

/// Errors parsing a request host into a trigger identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("empty host")]
    Empty,

    #[error("host `{0}` does not contain a name and namespace")]
    MissingNamespace(String),
}

/// Parse `name.namespace...` (with optional `:port`) into a [`TriggerKey`].
pub fn parse_trigger_host(host: &str) -> Result<TriggerKey, HostError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(HostError::Empty);
    }

    // Strip any port suffix.
    let host = host.split(':').next().unwrap_or(host);

    let mut labels = host.split('.');
    let name = labels.next().filter(|l| !l.is_empty());
    let namespace = labels.next().filter(|l| !l.is_empty());
    match (name, namespace) {
        (Some(name), Some(namespace)) => Ok(TriggerKey::new(namespace, name)),
        _ => Err(HostError::MissingNamespace(host.to_string())),
    }
}
