//! Hop-count (TTL) guard.
//!
//! Every event in flight carries a hop count in [`TTL_HEADER`]. The
//! guard decrements it once per dispatch hop and signals a drop when it
//! would reach zero, which is what keeps a reply that re-enters the
//! broker from looping forever.
//!
//! A missing or unparsable hop count is deliberately *reset* to the
//! default rather than treated as expired: events from plain HTTP
//! producers that have never heard of the header must still flow.

use tracing::debug;

use crate::event::{Event, TTL_HEADER};

/// Hop count assigned when an event arrives without a usable one.
pub const DEFAULT_TTL: i64 = 10;

/// Apply one hop to the event's TTL.
///
/// Returns the event to forward, or `None` when the hop count is
/// exhausted and the event must be silently dropped. The input event is
/// never mutated; the returned event is a new record with the rewritten
/// header.
pub fn apply_hop(event: &Event, default_ttl: i64) -> Option<Event> {
    let Some(raw) = event.header(TTL_HEADER) else {
        debug!(default = default_ttl, "no hop count on event, applying default");
        return Some(event.with_header(TTL_HEADER, default_ttl.to_string()));
    };

    let Ok(ttl) = raw.parse::<i64>() else {
        // Unparsable is treated exactly like absent.
        debug!(value = %raw, default = default_ttl, "unparsable hop count, applying default");
        return Some(event.with_header(TTL_HEADER, default_ttl.to_string()));
    };

    let next = ttl - 1;
    if next <= 0 {
        debug!(ttl, "hop count exhausted, dropping event");
        return None;
    }
    Some(event.with_header(TTL_HEADER, next.to_string()))
}
