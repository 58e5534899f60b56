//! Trigger domain types and the control-plane wire descriptor.
//!
//! The wire shape is stringly typed: the literal `"Any"` means
//! match-anything. It is converted exactly once, at the boundary, into
//! the tagged [`AttributeFilter`] so the evaluator never re-interprets
//! sentinels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire sentinel meaning "match any value" for a filter leg.
pub const MATCH_ANY: &str = "Any";

/// Namespace-scoped identity of a trigger, derived from the inbound
/// request's host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub namespace: String,
    pub name: String,
}

impl TriggerKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One leg of a trigger filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeFilter {
    /// Matches any value, including an absent header.
    Any,
    /// Matches only a byte-exact header value.
    Exact(String),
}

impl AttributeFilter {
    fn from_wire(value: Option<String>) -> Self {
        match value {
            None => AttributeFilter::Any,
            Some(v) if v == MATCH_ANY => AttributeFilter::Any,
            Some(v) => AttributeFilter::Exact(v),
        }
    }
}

/// A trigger's filter predicate: both legs must pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFilter {
    pub event_type: AttributeFilter,
    pub source: AttributeFilter,
}

/// The broker's read-only view of a trigger object.
///
/// A trigger without a filter matches nothing (fail-closed); a trigger
/// without a subscriber URI exists but cannot be dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub key: TriggerKey,
    pub filter: Option<TriggerFilter>,
    pub subscriber_uri: Option<String>,
}

impl Trigger {
    /// The subscriber endpoint, if the trigger is ready to receive.
    pub fn subscriber(&self) -> Option<&str> {
        self.subscriber_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

/// Trigger descriptor as listed/pushed by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDescriptor {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_source: Option<String>,
    #[serde(default, rename = "subscriberURI", skip_serializing_if = "Option::is_none")]
    pub subscriber_uri: Option<String>,
}

impl TriggerDescriptor {
    /// The cache key this descriptor maps to.
    pub fn key(&self) -> TriggerKey {
        TriggerKey::new(self.namespace.clone(), self.name.clone())
    }
}

impl From<TriggerDescriptor> for Trigger {
    fn from(desc: TriggerDescriptor) -> Self {
        let key = desc.key();
        // A descriptor with neither filter leg has no filter at all,
        // which the evaluator treats as match-nothing.
        let filter = if desc.filter_type.is_none() && desc.filter_source.is_none() {
            None
        } else {
            Some(TriggerFilter {
                event_type: AttributeFilter::from_wire(desc.filter_type),
                source: AttributeFilter::from_wire(desc.filter_source),
            })
        };
        Trigger {
            key,
            filter,
            subscriber_uri: desc.subscriber_uri,
        }
    }
}
