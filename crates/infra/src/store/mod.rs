//! Storage boundary for products, orders, the stock audit trail and the
//! outbox.
//!
//! Writes that must be atomic go through a [`StoreTx`] obtained from
//! [`StorefrontStore::begin`]. A transaction that is dropped without
//! [`StoreTx::commit`] is rolled back.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use groupbuy_core::{DomainError, OrderId, ProductId, UserId};
use groupbuy_events::EventEnvelope;
use groupbuy_inventory::{Product, StockHistoryEntry};
use groupbuy_sales::Order;

use crate::error::StoreError;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Admin => "ADMIN",
        }
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER" => Ok(Role::Customer),
            "ADMIN" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The slice of a user account the order core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An event written to the outbox inside a stock transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    /// Monotonic position; dispatch order.
    pub sequence: i64,
    pub envelope: EventEnvelope<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Unit of work over the storefront tables.
#[async_trait]
pub trait StoreTx: Send {
    /// Read a product and hold its row lock until the transaction ends.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Persist the product's current stock and `updated_at`.
    async fn update_stock(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn append_history(&mut self, entry: &StockHistoryEntry) -> Result<(), StoreError>;

    /// Insert an order with its items.
    ///
    /// Fails with [`StoreError::DuplicateOrderNumber`] if the order number is
    /// taken.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Read an order (with items) and hold its row lock.
    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Persist status, payment status, admin note and `updated_at`.
    async fn update_order_status(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn enqueue_outbox(&mut self, envelope: &EventEnvelope<JsonValue>)
        -> Result<(), StoreError>;

    /// History rows that reference `order_id`, oldest first.
    async fn order_history(
        &mut self,
        order_id: OrderId,
    ) -> Result<Vec<StockHistoryEntry>, StoreError>;

    /// Make every staged write visible. Dropping the transaction instead
    /// discards them.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Storefront persistence.
#[async_trait]
pub trait StorefrontStore: Send + Sync + 'static {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn list_admins(&self) -> Result<Vec<User>, StoreError>;

    /// Products among `ids` (unknown ids are skipped; order unspecified).
    async fn find_products(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, StoreError>;

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Newest first.
    async fn stock_history(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockHistoryEntry>, StoreError>;

    /// Products with `stock < min_stock`, ascending by stock.
    async fn low_stock_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Undispatched outbox records in sequence order.
    async fn pending_outbox(&self, limit: u32) -> Result<Vec<OutboxRecord>, StoreError>;

    async fn mark_outbox_dispatched(
        &self,
        event_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Insert or replace a product (catalog maintenance, seeding).
    async fn save_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Insert or replace a user (seeding).
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
}
