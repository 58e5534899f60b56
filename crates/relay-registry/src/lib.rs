//! relay-registry — cached trigger lookup for the broker hot path.
//!
//! The control plane owns trigger objects; this crate holds the broker's
//! eventually-consistent local view of them and the pure filter check
//! the pipeline runs against each event.
//!
//! # Components
//!
//! - **`types`** — `Trigger`, its filter variants, and the wire
//!   descriptor exchanged with the control plane
//! - **`registry`** — the concurrent cache, prewarm, and resync
//! - **`filter`** — the `matches(filter, event)` evaluator
//! - **`control`** — the control-plane list client and the update
//!   listener that is the registry's sole writer
//!
//! # Lifecycle
//!
//! The registry must be prewarmed with a full listing before the ingress
//! accepts traffic; [`registry::TriggerRegistry::prewarm`] returns the
//! [`registry::Prewarmed`] token the ingress server demands, so serving
//! with a cold cache does not compile.

pub mod control;
pub mod error;
pub mod filter;
pub mod registry;
pub mod types;

pub use control::{HttpTriggerSource, TriggerPage, TriggerSource, TriggerUpdate, spawn_update_listener};
pub use error::{ControlPlaneError, RegistryError};
pub use filter::matches;
pub use registry::{Prewarmed, TriggerRegistry};
pub use types::{AttributeFilter, Trigger, TriggerDescriptor, TriggerFilter, TriggerKey};
