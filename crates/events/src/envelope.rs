use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use crate::event::Event;

/// Envelope for an event, containing subject + schema metadata.
///
/// This is the unit written to the outbox.
///
/// Notes:
/// - `subject_id` identifies the entity the event is about (e.g. a product).
/// - `event_type`/`event_version` are captured at encode time so payloads can
///   be decoded without guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    subject_id: Uuid,
    subject_type: String,

    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("payload serialization failed: {0}")]
    Encode(String),

    #[error("expected event type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("payload deserialization failed: {0}")]
    Decode(String),
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        subject_id: Uuid,
        subject_type: impl Into<String>,
        event_type: impl Into<String>,
        event_version: u32,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            subject_id,
            subject_type: subject_type.into(),
            event_type: event_type.into(),
            event_version,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<JsonValue> {
    /// Wrap a typed event as a JSON envelope, capturing its metadata.
    pub fn encode<E>(event_id: Uuid, event: &E) -> Result<Self, EnvelopeError>
    where
        E: Event + Serialize,
    {
        let payload =
            serde_json::to_value(event).map_err(|e| EnvelopeError::Encode(e.to_string()))?;

        Ok(Self::new(
            event_id,
            event.subject_id(),
            E::SUBJECT_TYPE,
            event.event_type(),
            event.version(),
            event.occurred_at(),
            payload,
        ))
    }

    /// Decode the payload into `E`, checking the recorded event type first.
    pub fn decode<E>(&self, expected_type: &str) -> Result<E, EnvelopeError>
    where
        E: DeserializeOwned,
    {
        if self.event_type != expected_type {
            return Err(EnvelopeError::TypeMismatch {
                expected: expected_type.to_string(),
                found: self.event_type.clone(),
            });
        }
        serde_json::from_value(self.payload.clone())
            .map_err(|e| EnvelopeError::Decode(e.to_string()))
    }
}
