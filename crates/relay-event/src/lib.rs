//! relay-event — the in-memory event record and its HTTP envelope.
//!
//! Events travel over HTTP as a set of envelope headers (event type,
//! event source, hop count, content type) plus an opaque payload body.
//! This crate owns the three leaf pieces of the pipeline:
//!
//! - **`event`** — the immutable [`Event`] record with canonicalized
//!   header names
//! - **`codec`** — decoding an HTTP message into an `Event` and copying
//!   an `Event` back onto an outbound message
//! - **`ttl`** — the hop-count guard that bounds forwarding loops

pub mod codec;
pub mod error;
pub mod event;
pub mod ttl;

pub use error::DecodeError;
pub use event::{
    CONTENT_TYPE_HEADER, EVENT_SOURCE_HEADER, EVENT_TYPE_HEADER, Event, TTL_HEADER,
};
pub use ttl::{DEFAULT_TTL, apply_hop};
