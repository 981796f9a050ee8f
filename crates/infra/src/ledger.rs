//! Stock ledger: the only writer of `products.stock`.
//!
//! Every successful adjustment, in one transaction:
//! 1. locks the product row
//! 2. decides the new level (never below zero, never clamped)
//! 3. writes the new stock
//! 4. appends exactly one history entry
//! 5. enqueues one `StockAdjusted` outbox record
//!
//! The notification worker is signalled only after commit.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use groupbuy_core::{ProductId, UserId};
use groupbuy_events::EventEnvelope;
use groupbuy_inventory::{Product, StockAdjusted, StockAdjustment, StockChange, StockHistoryEntry};

use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::notifications::OutboxSignal;
use crate::store::{StoreTx, StorefrontStore};

pub const DEFAULT_HISTORY_LIMIT_MAX: u32 = 500;

/// Result of one applied adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAdjustment {
    /// Product state after the adjustment.
    pub product: Product,
    pub entry: StockHistoryEntry,
}

/// Apply one adjustment inside an open transaction.
///
/// Nothing is visible until the caller commits `tx`; on error the caller
/// drops (rolls back) it.
pub async fn apply_adjustment(
    tx: &mut dyn StoreTx,
    adjustment: &StockAdjustment,
) -> ServiceResult<AppliedAdjustment> {
    let product_id = adjustment.product_id();
    let mut product = tx
        .product_for_update(product_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product {product_id}")))?;

    let levels = product.plan_adjustment(adjustment.delta())?;
    let at = Utc::now();
    product.apply_adjustment(levels, at)?;
    tx.update_stock(&product).await?;

    let entry = StockHistoryEntry::record(adjustment, levels, at);
    tx.append_history(&entry).await?;

    let event = StockAdjusted::from_entry(&product, &entry);
    let envelope = EventEnvelope::encode(Uuid::now_v7(), &event).map_err(StoreError::from)?;
    tx.enqueue_outbox(&envelope).await?;

    Ok(AppliedAdjustment { product, entry })
}

/// Take the row locks of `product_ids` once each, in ascending id order.
///
/// Transactions touching several products call this before applying their
/// adjustments, so two of them never wait on each other's locks in opposite
/// order. Unknown ids are skipped; `apply_adjustment` reports them.
pub async fn lock_products<I>(tx: &mut dyn StoreTx, product_ids: I) -> ServiceResult<()>
where
    I: IntoIterator<Item = ProductId>,
{
    let ordered: BTreeSet<ProductId> = product_ids.into_iter().collect();
    for id in ordered {
        tx.product_for_update(id).await?;
    }
    Ok(())
}

/// Stock ledger service.
pub struct StockLedger<S: ?Sized> {
    store: Arc<S>,
    signal: OutboxSignal,
    history_limit_max: u32,
}

impl<S: StorefrontStore + ?Sized> StockLedger<S> {
    pub fn new(store: Arc<S>, signal: OutboxSignal) -> Self {
        Self {
            store,
            signal,
            history_limit_max: DEFAULT_HISTORY_LIMIT_MAX,
        }
    }

    pub fn with_history_limit_max(mut self, max: u32) -> Self {
        self.history_limit_max = max.max(1);
        self
    }

    /// Adjust one product's stock by `delta` in its own transaction.
    ///
    /// Not idempotent: calling twice applies twice.
    #[instrument(skip(self, change), fields(change_type = %change.change_type()), err)]
    pub async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        change: StockChange,
        actor: Option<UserId>,
    ) -> ServiceResult<AppliedAdjustment> {
        let adjustment = StockAdjustment::new(product_id, delta, change, actor)?;

        let mut tx = self.store.begin().await?;
        let applied = apply_adjustment(tx.as_mut(), &adjustment).await?;
        tx.commit().await?;

        self.signal.notify();
        info!(
            product_id = %product_id,
            before = applied.entry.before_stock,
            after = applied.entry.after_stock,
            "stock adjusted"
        );
        Ok(applied)
    }

    /// Most recent history entries for a product, newest first.
    ///
    /// Entries survive product deletion, so an unknown product yields an
    /// empty list rather than `NotFound`.
    #[instrument(skip(self), err)]
    pub async fn get_stock_history(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> ServiceResult<Vec<StockHistoryEntry>> {
        if limit == 0 || limit > self.history_limit_max {
            return Err(ServiceError::Validation(format!(
                "history limit must be between 1 and {} (got {limit})",
                self.history_limit_max
            )));
        }
        Ok(self.store.stock_history(product_id, limit).await?)
    }

    /// Products with `stock < min_stock`, lowest stock first.
    #[instrument(skip(self), err)]
    pub async fn get_low_stock_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.low_stock_products().await?)
    }
}
