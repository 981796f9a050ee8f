use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A fact recorded in the outbox alongside the change that produced it.
///
/// The subject is the record the event is about (a product for stock
/// adjustments); the envelope stores it so relays can filter without decoding
/// the payload.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Kind of record the event is about (e.g. "product").
    const SUBJECT_TYPE: &'static str;

    /// Stable event name (e.g. "inventory.stock.adjusted").
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    fn subject_id(&self) -> Uuid;

    /// When the underlying change was committed (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
