//! relay-ingress — the HTTP receiver at the front of the broker.
//!
//! Each inbound request walks the same pipeline:
//!
//! ```text
//! POST / ── host → (namespace, name)
//!        ── decode event
//!        ── resolve trigger          (registry)
//!        ── evaluate filter          (match or silent 202)
//!        ── apply hop count          (forward or silent 202)
//!        ── dispatch to subscriber   (one outbound call)
//!        └─ reply headers + payload, or empty 202
//! ```
//!
//! Every terminal state maps to exactly one HTTP status; nothing
//! escapes the handler as anything but HTTP semantics.

pub mod host;
pub mod pipeline;
pub mod server;

pub use host::{HostError, parse_trigger_host};
pub use pipeline::Ingress;
pub use server::IngressServer;
