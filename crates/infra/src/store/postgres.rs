//! Postgres-backed storefront store.
//!
//! ## Locking
//!
//! `product_for_update` and `order_for_update` issue `SELECT … FOR UPDATE`, so
//! concurrent adjustments of the same product serialize on its row lock while
//! different products proceed in parallel.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation on `orders_order_number_key`) | `23505` | `DuplicateOrderNumber` |
//! | Database (other unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use groupbuy_core::{DomainError, Money, OrderId, OrderItemId, ProductId, StockHistoryId, UserId};
use groupbuy_events::EventEnvelope;
use groupbuy_inventory::{Product, StockHistoryEntry};
use groupbuy_sales::{CustomerSnapshot, Order, OrderItem, OrderNumber, OrderParts};

use super::{OutboxRecord, StoreError, StoreTx, StorefrontStore, User};

/// Embedded schema migrations (`crates/infra/migrations`).
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    image: Option<String>,
    price: i64,
    stock: i64,
    min_stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Money::from_minor(row.price).map_err(corrupt)?;
        Ok(
            Product::new(ProductId::from_uuid(row.id), row.name, price, row.stock, row.min_stock)
                .map_err(corrupt)?
                .with_image(row.image)
                .with_active(row.is_active)
                .with_timestamps(row.created_at, row.updated_at),
        )
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            role: row.role.parse().map_err(corrupt)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    product_id: Uuid,
    change_type: String,
    quantity: i64,
    before_stock: i64,
    after_stock: i64,
    reason: String,
    user_id: Option<Uuid>,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for StockHistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(StockHistoryEntry {
            id: StockHistoryId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            change_type: row.change_type.parse().map_err(corrupt)?,
            quantity: row.quantity,
            before_stock: row.before_stock,
            after_stock: row.after_stock,
            reason: row.reason,
            user_id: row.user_id.map(UserId::from_uuid),
            order_id: row.order_id.map(OrderId::from_uuid),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    total_amount: i64,
    status: String,
    payment_status: String,
    customer_note: Option<String>,
    admin_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_image: Option<String>,
    unit_price: i64,
    quantity: i64,
    subtotal: i64,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            product_id: ProductId::from_uuid(row.product_id),
            product_name: row.product_name,
            product_image: row.product_image,
            unit_price: Money::from_minor(row.unit_price).map_err(corrupt)?,
            quantity: row.quantity,
            subtotal: Money::from_minor(row.subtotal).map_err(corrupt)?,
        })
    }
}

fn assemble_order(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, StoreError> {
    let items = items
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Order::rehydrate(OrderParts {
        id: OrderId::from_uuid(row.id),
        order_number: OrderNumber::parse(row.order_number).map_err(corrupt)?,
        customer: CustomerSnapshot {
            user_id: UserId::from_uuid(row.user_id),
            name: row.customer_name,
            email: row.customer_email,
            phone: row.customer_phone,
        },
        total_amount: Money::from_minor(row.total_amount).map_err(corrupt)?,
        status: row.status.parse().map_err(corrupt)?,
        payment_status: row.payment_status.parse().map_err(corrupt)?,
        customer_note: row.customer_note,
        admin_note: row.admin_note,
        items,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
    .map_err(corrupt)
}

#[derive(Debug, FromRow)]
struct OutboxRow {
    sequence: i64,
    event_id: Uuid,
    subject_id: Uuid,
    subject_type: String,
    event_type: String,
    event_version: i32,
    occurred_at: DateTime<Utc>,
    payload: JsonValue,
    created_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxRecord {
    fn from(row: OutboxRow) -> Self {
        OutboxRecord {
            sequence: row.sequence,
            envelope: EventEnvelope::new(
                row.event_id,
                row.subject_id,
                row.subject_type,
                row.event_type,
                row.event_version.max(0) as u32,
                row.occurred_at,
                row.payload,
            ),
            created_at: row.created_at,
            dispatched_at: row.dispatched_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, image, price, stock, min_stock, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_name, customer_email, \
     customer_phone, total_amount, status, payment_status, customer_note, admin_note, \
     created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, product_image, unit_price, quantity, subtotal";

struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("product_for_update", e))?;

        row.map(Product::try_from).transpose()
    }

    #[instrument(
        skip(self, product),
        fields(product_id = %product.id_typed(), stock = product.stock()),
        err
    )]
    async fn update_stock(&mut self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = $2, updated_at = $3 WHERE id = $1")
            .bind(product.id_typed().as_uuid())
            .bind(product.stock())
            .bind(product.updated_at())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_stock", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict(format!(
                "product {} vanished during update",
                product.id_typed()
            )));
        }
        Ok(())
    }

    #[instrument(
        skip(self, entry),
        fields(product_id = %entry.product_id, change_type = %entry.change_type),
        err
    )]
    async fn append_history(&mut self, entry: &StockHistoryEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stock_history (
                id, product_id, change_type, quantity, before_stock, after_stock,
                reason, user_id, order_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.product_id.as_uuid())
        .bind(entry.change_type.as_str())
        .bind(entry.quantity)
        .bind(entry.before_stock)
        .bind(entry.after_stock)
        .bind(&entry.reason)
        .bind(entry.user_id.map(Uuid::from))
        .bind(entry.order_id.map(Uuid::from))
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_history", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, order),
        fields(order_number = %order.order_number(), items = order.items().len()),
        err
    )]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let customer = order.customer();
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, customer_name, customer_email, customer_phone,
                total_amount, status, payment_status, customer_note, admin_note,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.order_number().as_str())
        .bind(customer.user_id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(order.total_amount().minor_units())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.customer_note())
        .bind(order.admin_note())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for (line_no, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, line_no, product_id, product_name, product_image,
                    unit_price, quantity, subtotal
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(item.product_image.as_deref())
            .bind(item.unit_price.minor_units())
            .bind(item.quantity)
            .bind(item.subtotal.minor_units())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_for_update", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY line_no"
        ))
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_for_update", e))?;

        assemble_order(row, items).map(Some)
    }

    #[instrument(
        skip(self, order),
        fields(order_id = %order.id_typed(), status = order.status().as_str()),
        err
    )]
    async fn update_order_status(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payment_status = $3, admin_note = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.admin_note())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, envelope),
        fields(event_id = %envelope.event_id(), event_type = envelope.event_type()),
        err
    )]
    async fn enqueue_outbox(
        &mut self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO outbox (
                event_id, subject_id, subject_type, event_type, event_version,
                occurred_at, payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(envelope.event_id())
        .bind(envelope.subject_id())
        .bind(envelope.subject_type())
        .bind(envelope.event_type())
        .bind(envelope.event_version() as i32)
        .bind(envelope.occurred_at())
        .bind(envelope.payload())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("enqueue_outbox", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn order_history(
        &mut self,
        order_id: OrderId,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, change_type, quantity, before_stock, after_stock,
                   reason, user_id, order_id, created_at
            FROM stock_history
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_history", e))?;
        rows.into_iter().map(StockHistoryEntry::try_from).collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl StorefrontStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, email, role FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_user", e))?;
        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_admins(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, email, role FROM users WHERE role = 'ADMIN' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_admins", e))?;
        rows.into_iter().map(User::try_from).collect()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn find_products(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE id = ANY($1) AND ($2 = FALSE OR is_active)"
        ))
        .bind(&ids)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_products", e))?;
        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_product", e))?;
        row.map(Product::try_from).transpose()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn stock_history(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, change_type, quantity, before_stock, after_stock,
                   reason, user_id, order_id, created_at
            FROM stock_history
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_history", e))?;
        rows.into_iter().map(StockHistoryEntry::try_from).collect()
    }

    #[instrument(skip(self), err)]
    async fn low_stock_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE stock < min_stock ORDER BY stock ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock_products", e))?;
        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY line_no"
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_order", e))?;

        assemble_order(row, items).map(Some)
    }

    #[instrument(skip(self), err)]
    async fn pending_outbox(&self, limit: u32) -> Result<Vec<OutboxRecord>, StoreError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT sequence, event_id, subject_id, subject_type, event_type, event_version,
                   occurred_at, payload, created_at, dispatched_at
            FROM outbox
            WHERE dispatched_at IS NULL
            ORDER BY sequence ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("pending_outbox", e))?;
        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    #[instrument(skip(self, event_ids), fields(count = event_ids.len()), err)]
    async fn mark_outbox_dispatched(
        &self,
        event_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE outbox SET dispatched_at = $2 \
             WHERE event_id = ANY($1) AND dispatched_at IS NULL",
        )
        .bind(event_ids)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_outbox_dispatched", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, image, price, stock, min_stock, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                image = EXCLUDED.image,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                min_stock = EXCLUDED.min_stock,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.image())
        .bind(product.price().minor_units())
        .bind(product.stock())
        .bind(product.min_stock())
        .bind(product.is_active())
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                role = EXCLUDED.role
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;
        Ok(())
    }
}

fn corrupt(e: DomainError) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") if db_err.constraint() == Some(ORDER_NUMBER_CONSTRAINT) => {
                    StoreError::DuplicateOrderNumber(msg)
                }
                // unique / check violation
                Some("23505") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
