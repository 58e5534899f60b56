//! Filter evaluation — the pure match/drop decision.

use tracing::{debug, warn};

use relay_event::Event;

use crate::types::{AttributeFilter, TriggerFilter};

/// Decide whether an event passes a trigger's filter.
///
/// A trigger with no filter matches nothing; that is a control-plane
/// bug, so it is logged loudly rather than silently. Otherwise both
/// legs must pass: `Any` is always satisfied, `Exact` requires
/// byte-exact equality with the corresponding event header.
pub fn matches(filter: Option<&TriggerFilter>, event: &Event) -> bool {
    let Some(filter) = filter else {
        warn!("trigger has no filter, dropping event (fail-closed)");
        return false;
    };

    if !leg_matches(&filter.event_type, event.event_type()) {
        debug!(
            filter = ?filter.event_type,
            event_type = event.event_type().unwrap_or(""),
            "event type does not match filter"
        );
        return false;
    }
    if !leg_matches(&filter.source, event.source()) {
        debug!(
            filter = ?filter.source,
            source = event.source().unwrap_or(""),
            "event source does not match filter"
        );
        return false;
    }
    true
}

fn leg_matches(filter: &AttributeFilter, value: Option<&str>) -> bool {
    match filter {
        AttributeFilter::Any => true,
        AttributeFilter::Exact(want) => value == Some(want.as_str()),
    }
}
