//! relay-dispatch — outbound event delivery.
//!
//! The dispatcher performs the one network call of the pipeline: a POST
//! of the event to a subscriber endpoint, optionally decoding the
//! subscriber's synchronous reply back into an event. Delivery is
//! at-most-once per hop: no retry loop and no backoff live here — a
//! supervisor that wants retries must be external and time-bounded.

pub mod dispatcher;
pub mod error;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
