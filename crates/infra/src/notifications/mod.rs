//! Administrator stock notifications.
//!
//! Stock transactions write a `StockAdjusted` event to the outbox; after
//! commit the [`NotificationDispatcher`] evaluates the threshold alert and
//! emits one [`Notification`] per administrator to a [`NotificationStore`].
//! Delivery failures are logged and retried by the [`NotificationWorker`];
//! they never reach the stock or order caller.

pub mod dispatcher;
pub mod postgres;
pub mod worker;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use uuid::Uuid;

use groupbuy_core::{NotificationId, UserId};
use groupbuy_inventory::{StockAdjusted, StockAlert};

use crate::error::StoreError;

pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use postgres::PostgresNotificationStore;
pub use worker::{NotificationWorker, NotificationWorkerHandle, OutboxSignal, OutboxTrigger};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification store error: {0}")]
    Store(String),

    #[error(transparent)]
    Outbox(#[from] StoreError),
}

/// A persisted notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: StockAlert,
    pub title: String,
    pub message: String,
    pub payload: JsonValue,
    /// Outbox event this notification was derived from.
    pub source_event_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_alert(
        recipient: UserId,
        alert: StockAlert,
        event: &StockAdjusted,
        source_event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        let name = &event.product_name;
        let (title, message) = match alert {
            StockAlert::OutOfStock => (
                "Out of stock".to_string(),
                format!("{name} is out of stock."),
            ),
            StockAlert::RestockCompleted => (
                "Restock completed".to_string(),
                format!("{name} is back in stock ({} available).", event.after_stock),
            ),
            StockAlert::LowStock => (
                "Low stock".to_string(),
                format!(
                    "{name} is running low: {} left (minimum {}).",
                    event.after_stock, event.min_stock
                ),
            ),
        };

        Self {
            id: NotificationId::new(),
            user_id: recipient,
            kind: alert,
            title,
            message,
            payload: json!({
                "product_id": event.product_id,
                "product_name": event.product_name,
                "change_type": event.change_type,
                "before_stock": event.before_stock,
                "after_stock": event.after_stock,
                "min_stock": event.min_stock,
            }),
            source_event_id,
            created_at: at,
        }
    }
}

/// Destination for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a notification. Returns `false` when one for the same
    /// `(source_event_id, user_id)` already exists.
    async fn emit(&self, notification: &Notification) -> Result<bool, NotificationError>;
}

/// In-memory notification store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    inner: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn emit(&self, notification: &Notification) -> Result<bool, NotificationError> {
        let mut items = self
            .inner
            .lock()
            .map_err(|_| NotificationError::Store("lock poisoned".to_string()))?;

        if items.iter().any(|n| {
            n.source_event_id == notification.source_event_id && n.user_id == notification.user_id
        }) {
            return Ok(false);
        }
        items.push(notification.clone());
        Ok(true)
    }
}
