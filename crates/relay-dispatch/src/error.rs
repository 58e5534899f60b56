//! Error types for outbound dispatch.

use std::time::Duration;

use thiserror::Error;

use relay_event::DecodeError;

/// Errors from a single dispatch attempt.
///
/// None of these are retried in-process; the ingress surfaces them to
/// the original caller as a terminal HTTP status.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The subscriber URI is not a usable absolute HTTP target.
    #[error("invalid subscriber target `{0}`")]
    InvalidTarget(String),

    /// The outbound request could not be constructed.
    #[error("failed to build outbound request: {0}")]
    Request(#[from] http::Error),

    /// Connection-level failure talking to the subscriber.
    #[error("subscriber request failed: {0}")]
    Transport(String),

    /// The subscriber did not answer within the write timeout.
    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),

    /// The subscriber answered with a non-2xx status.
    #[error("subscriber returned status {0}")]
    Status(http::StatusCode),

    /// The subscriber's reply body could not be read.
    #[error("failed to read reply body: {0}")]
    ReplyBody(String),

    /// The subscriber replied with a body that is not a valid event.
    #[error("failed to decode reply event: {0}")]
    ReplyDecode(#[from] DecodeError),
}
