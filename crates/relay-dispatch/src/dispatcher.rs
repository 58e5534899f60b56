//! The outbound HTTP dispatcher.

use std::time::Duration;

use bytes::Bytes;
use http::response::Parts;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use relay_event::{Event, codec};

use crate::error::DispatchError;

/// Bound on a single outbound call, covering connect through body read.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Delivers events to subscriber endpoints over HTTP.
///
/// The underlying client pools connections, so one `Dispatcher` is
/// shared across all requests.
pub struct Dispatcher {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fire-and-forget delivery: the reply body, if any, is discarded.
    pub async fn dispatch(&self, event: &Event, target: &str) -> Result<(), DispatchError> {
        self.send(event, target).await.map(|_| ())
    }

    /// Delivery with reply capture.
    ///
    /// A 2xx with an empty body is a plain ack (`Ok(None)`); a 2xx with
    /// a body is decoded into a new reply event. A reply that is not a
    /// valid event is an error, not a silent drop.
    pub async fn dispatch_with_reply(
        &self,
        event: &Event,
        target: &str,
    ) -> Result<Option<Event>, DispatchError> {
        let (parts, body) = self.send(event, target).await?;
        if body.is_empty() {
            return Ok(None);
        }
        let reply = codec::decode(&parts.headers, body)?;
        debug!(
            event_type = reply.event_type().unwrap_or(""),
            "captured reply event from subscriber"
        );
        Ok(Some(reply))
    }

    async fn send(&self, event: &Event, target: &str) -> Result<(Parts, Bytes), DispatchError> {
        let uri: http::Uri = target
            .parse()
            .map_err(|_| DispatchError::InvalidTarget(target.to_string()))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(DispatchError::InvalidTarget(target.to_string()));
        }

        let mut request = http::Request::post(uri).body(Full::new(event.payload().clone()))?;
        codec::apply_headers(event, request.headers_mut());

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| DispatchError::Timeout(self.timeout))?
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let (parts, body) = response.into_parts();
        if !parts.status.is_success() {
            return Err(DispatchError::Status(parts.status));
        }

        let body = tokio::time::timeout(self.timeout, body.collect())
            .await
            .map_err(|_| DispatchError::Timeout(self.timeout))?
            .map_err(|e| DispatchError::ReplyBody(e.to_string()))?
            .to_bytes();

        debug!(status = %parts.status, bytes = body.len(), "dispatch delivered");
        Ok((parts, body))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
