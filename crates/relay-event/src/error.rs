//! Error types for event decoding.

use thiserror::Error;

/// Errors produced while decoding an HTTP message into an [`crate::Event`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message carries no event type header, so it cannot be matched
    /// against any trigger filter.
    #[error("missing required event type header `{0}`")]
    MissingEventType(&'static str),

    /// The transport body could not be read.
    #[error("failed to read message body: {0}")]
    Body(String),
}
