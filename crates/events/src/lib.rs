//! Domain events and their serialized envelope.
//!
//! Events produced inside a stock transaction are wrapped in an
//! [`EventEnvelope`] and written to the outbox in the same transaction; the
//! notification dispatcher decodes them after commit.

pub mod envelope;
pub mod event;

pub use envelope::{EnvelopeError, EventEnvelope};
pub use event::Event;
