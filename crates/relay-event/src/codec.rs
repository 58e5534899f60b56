//! HTTP envelope codec.
//!
//! `decode` lifts the envelope headers and payload out of a transport
//! message into an [`Event`]; `apply_headers` copies an event's headers
//! back onto an outbound request or response, replacing (never
//! appending to) anything already there.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::event::{CONTENT_TYPE_HEADER, EVENT_TYPE_HEADER, Event, TTL_HEADER};

/// Headers forwarded by exact name.
const FORWARD_EXACT: &[&str] = &[CONTENT_TYPE_HEADER, TTL_HEADER];

/// Header name prefixes forwarded wholesale (event envelope and
/// caller-supplied extensions).
const FORWARD_PREFIXES: &[&str] = &["ce-", "x-"];

fn is_envelope_header(name: &str) -> bool {
    FORWARD_EXACT.contains(&name) || FORWARD_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Decode transport headers and a payload into an [`Event`].
///
/// Only envelope-relevant headers are kept; names are lowercased on the
/// way in. A repeated header keeps its first value, and values that are
/// not valid UTF-8 are skipped. The event type header is the one
/// structurally required field.
pub fn decode(headers: &HeaderMap, payload: Bytes) -> Result<Event, DecodeError> {
    let mut pairs = Vec::new();
    for (name, value) in headers {
        let name = name.as_str().to_ascii_lowercase();
        if !is_envelope_header(&name) {
            continue;
        }
        match value.to_str() {
            Ok(value) => pairs.push((name, value.to_string())),
            Err(_) => {
                debug!(header = %name, "skipping non-UTF-8 header value");
            }
        }
    }

    let event = Event::new(pairs, payload);
    if event.event_type().is_none() {
        return Err(DecodeError::MissingEventType(EVENT_TYPE_HEADER));
    }
    Ok(event)
}

/// Copy every event header onto a transport header map, replacing any
/// existing value of the same name.
///
/// A header that cannot be represented on the wire is logged and
/// skipped rather than failing the whole message.
pub fn apply_headers(event: &Event, headers: &mut HeaderMap) {
    for (name, value) in event.headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                warn!(header = %name, "dropping header that is not valid on the wire");
            }
        }
    }
}
