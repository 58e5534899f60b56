//! Per-request orchestration of the broker pipeline.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use tracing::{debug, info, warn};

use relay_dispatch::Dispatcher;
use relay_event::{Event, apply_hop, codec};
use relay_registry::{TriggerRegistry, matches};

use crate::host::parse_trigger_host;

/// The request handler: holds everything the pipeline needs, all
/// injected so tests can run it against fakes.
pub struct Ingress {
    registry: Arc<TriggerRegistry>,
    dispatcher: Dispatcher,
    default_ttl: i64,
}

impl Ingress {
    pub fn new(registry: Arc<TriggerRegistry>, dispatcher: Dispatcher, default_ttl: i64) -> Self {
        Self {
            registry,
            dispatcher,
            default_ttl,
        }
    }

    /// Run one request through the pipeline.
    ///
    /// Every exit path produces exactly one response, and at most one
    /// outbound dispatch happens per request.
    pub async fn handle(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        if request.uri().path() != "/" {
            return status_only(StatusCode::NOT_FOUND);
        }
        if request.method() != Method::POST {
            return status_only(StatusCode::METHOD_NOT_ALLOWED);
        }

        let (parts, body) = request.into_parts();

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| parts.uri.host())
            .unwrap_or("");
        let key = match parse_trigger_host(host) {
            Ok(key) => key,
            Err(e) => {
                warn!(host, error = %e, "unable to parse host as a trigger");
                return rejected("bad host");
            }
        };

        let payload = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(trigger = %key, error = %e, "failed to read request body");
                return rejected("unreadable body");
            }
        };
        let event = match codec::decode(&parts.headers, payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(trigger = %key, error = %e, "malformed event");
                return rejected("malformed event");
            }
        };

        let trigger = match self.registry.resolve(&key) {
            Ok(trigger) => trigger,
            Err(e) => {
                info!(trigger = %key, error = %e, "event for unknown trigger");
                return rejected("trigger not found");
            }
        };
        let Some(subscriber) = trigger.subscriber() else {
            warn!(trigger = %key, "trigger has no subscriber yet");
            return rejected("trigger has no subscriber");
        };

        if !matches(trigger.filter.as_ref(), &event) {
            // Expected steady-state traffic, not an error.
            debug!(trigger = %key, "event did not pass filter");
            return status_only(StatusCode::ACCEPTED);
        }

        let Some(event) = apply_hop(&event, self.default_ttl) else {
            debug!(trigger = %key, "hop count exhausted, event dropped");
            return status_only(StatusCode::ACCEPTED);
        };

        match self.dispatcher.dispatch_with_reply(&event, subscriber).await {
            Ok(Some(reply)) => {
                debug!(trigger = %key, "forwarding subscriber reply to caller");
                reply_response(&reply)
            }
            Ok(None) => status_only(StatusCode::ACCEPTED),
            Err(e) => {
                info!(trigger = %key, subscriber, error = %e, "dispatch failed");
                rejected("dispatch failed")
            }
        }
    }
}

fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Terminal 400 with a structured error body.
fn rejected(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// 202 carrying the reply event's headers and payload.
///
/// Headers that fail to copy are logged and skipped; the reply payload
/// itself is written verbatim.
fn reply_response(reply: &Event) -> Response<Full<Bytes>> {
    let mut response = Response::builder()
        .status(StatusCode::ACCEPTED)
        .body(Full::new(reply.payload().clone()))
        .unwrap();
    codec::apply_headers(reply, response.headers_mut());
    response
}
