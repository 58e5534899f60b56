//! Error types for trigger resolution and control-plane sync.

use std::time::Duration;

use thiserror::Error;

use crate::types::TriggerKey;

/// Errors from the registry's read path.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No cached trigger for the requested key.
    #[error("trigger {0} not found")]
    NotFound(TriggerKey),
}

/// Errors talking to the control plane's trigger listing.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("control plane request failed: {0}")]
    Transport(String),

    #[error("control plane returned status {0}")]
    Status(u16),

    #[error("failed to decode trigger listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("control plane request timed out after {0:?}")]
    Timeout(Duration),
}
