//! The immutable event record.
//!
//! An [`Event`] is a mapping of canonicalized header names to string
//! values plus an opaque payload. It is constructed once when a request
//! is decoded and read-only from then on; pipeline stages that need a
//! different event (the hop-count guard, reply capture) build a new one.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Header carrying the event type, matched against trigger filters.
pub const EVENT_TYPE_HEADER: &str = "ce-eventtype";

/// Header carrying the event source, matched against trigger filters.
pub const EVENT_SOURCE_HEADER: &str = "ce-source";

/// Header carrying the remaining hop count for loop prevention.
pub const TTL_HEADER: &str = "relay-ttl";

/// Payload media type header.
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// An event in flight: envelope headers plus opaque payload bytes.
///
/// Header names are canonicalized (ASCII-lowercased) on construction so
/// lookups are deterministic regardless of transport casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    headers: BTreeMap<String, String>,
    payload: Bytes,
}

impl Event {
    /// Build an event from header pairs and a payload.
    ///
    /// Names are lowercased; if two names collide after canonicalization
    /// the first value wins.
    pub fn new<I, N, V>(headers: I, payload: Bytes) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in headers {
            map.entry(name.as_ref().to_ascii_lowercase())
                .or_insert_with(|| value.into());
        }
        Self {
            headers: map,
            payload,
        }
    }

    /// Look up a header value by name (any casing).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Iterate over all headers in canonical form.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The opaque payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The event type header, if present.
    pub fn event_type(&self) -> Option<&str> {
        self.header(EVENT_TYPE_HEADER)
    }

    /// The event source header, if present.
    pub fn source(&self) -> Option<&str> {
        self.header(EVENT_SOURCE_HEADER)
    }

    /// A copy of this event with one header replaced (or added).
    ///
    /// The original is untouched; this is how the hop-count guard
    /// produces the forwarded event.
    pub fn with_header(&self, name: &str, value: impl Into<String>) -> Event {
        let mut headers = self.headers.clone();
        headers.insert(name.to_ascii_lowercase(), value.into());
        Event {
            headers,
            payload: self.payload.clone(),
        }
    }
}
