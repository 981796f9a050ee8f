//! Order transaction orchestrator.
//!
//! `place_order`:
//! 1. validates input
//! 2. looks up the buyer
//! 3. runs the advisory availability pre-check
//! 4. snapshots current prices into order lines
//! 5. in one transaction locks the products (ascending id), inserts the order
//!    and decrements stock per line (request order), retrying with a fresh
//!    order number on collision
//! 6. signals the notification worker after commit

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use groupbuy_core::{OrderId, ProductId, UserId};
use groupbuy_inventory::{ChangeType, StockAdjustment, StockChange, StockRequest, validate_requests};
use groupbuy_sales::{
    CustomerSnapshot, Order, OrderNumberSource, OrderStatus, RandomOrderNumbers, price_lines,
};

use crate::availability::AvailabilityChecker;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::ledger::{AppliedAdjustment, apply_adjustment, lock_products};
use crate::notifications::OutboxSignal;
use crate::store::StorefrontStore;

pub const DEFAULT_ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Input for [`OrderService::place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub customer_phone: String,
    pub customer_note: Option<String>,
    pub admin_note: Option<String>,
    pub items: Vec<StockRequest>,
}

pub struct OrderService<S: ?Sized> {
    store: Arc<S>,
    checker: AvailabilityChecker<S>,
    numbers: Arc<dyn OrderNumberSource>,
    signal: OutboxSignal,
    order_number_attempts: u32,
}

impl<S: StorefrontStore + ?Sized> OrderService<S> {
    pub fn new(store: Arc<S>, signal: OutboxSignal) -> Self {
        Self {
            checker: AvailabilityChecker::new(store.clone()),
            store,
            numbers: Arc::new(RandomOrderNumbers),
            signal,
            order_number_attempts: DEFAULT_ORDER_NUMBER_ATTEMPTS,
        }
    }

    pub fn with_order_numbers(mut self, numbers: Arc<dyn OrderNumberSource>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn with_order_number_attempts(mut self, attempts: u32) -> Self {
        self.order_number_attempts = attempts.max(1);
        self
    }

    #[instrument(
        skip(self, cmd),
        fields(user_id = %cmd.user_id, items = cmd.items.len()),
        err
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> ServiceResult<Order> {
        if cmd.items.is_empty() {
            return Err(ServiceError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        validate_requests(&cmd.items)?;
        if cmd.customer_phone.trim().is_empty() {
            return Err(ServiceError::Validation("customer phone is required".to_string()));
        }

        let user = self
            .store
            .find_user(cmd.user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", cmd.user_id)))?;

        let report = self.checker.check_availability(&cmd.items).await?;
        if !report.all_available {
            return Err(ServiceError::StockUnavailable(report.failures()));
        }

        let mut seen = HashSet::new();
        let distinct: Vec<ProductId> = cmd
            .items
            .iter()
            .map(|i| i.product_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let products = self.store.find_products(&distinct, true).await?;
        if products.len() != distinct.len() {
            return Err(ServiceError::NotFound(
                "one or more products are unavailable".to_string(),
            ));
        }

        let (lines, _total) = price_lines(&cmd.items, &products)?;
        let customer = CustomerSnapshot {
            user_id: user.id,
            name: user.name,
            email: user.email,
            phone: cmd.customer_phone.trim().to_string(),
        };

        for attempt in 1..=self.order_number_attempts {
            let now = Utc::now();
            let order = Order::place(
                OrderId::new(),
                self.numbers.next(now),
                customer.clone(),
                cmd.customer_note.clone(),
                cmd.admin_note.clone(),
                lines.clone(),
                now,
            )?;

            match self.persist_new_order(&order).await {
                Ok(()) => {
                    self.signal.notify();
                    info!(
                        order_id = %order.id_typed(),
                        order_number = %order.order_number(),
                        total = %order.total_amount(),
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(ServiceError::Store(StoreError::DuplicateOrderNumber(_))) => {
                    warn!(
                        order_number = %order.order_number(),
                        attempt,
                        "order number collision, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(ServiceError::OrderNumberExhausted(self.order_number_attempts))
    }

    /// One attempt: order + items + every stock decrement, or nothing.
    async fn persist_new_order(&self, order: &Order) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        lock_products(tx.as_mut(), order.items().iter().map(|i| i.product_id)).await?;
        tx.insert_order(order).await?;

        for item in order.items() {
            let adjustment = StockAdjustment::new(
                item.product_id,
                -item.quantity,
                StockChange::OrderPlaced {
                    order_id: order.id_typed(),
                    order_number: order.order_number().to_string(),
                },
                Some(order.user_id()),
            )?;
            apply_adjustment(tx.as_mut(), &adjustment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Compensating restore of stock for (part of) an order.
    ///
    /// Never called automatically; a cancelled status does not imply it.
    /// Per product, the units restored across all calls never exceed the
    /// units the order consumed.
    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn cancel_order_stock(
        &self,
        order_id: OrderId,
        items: &[StockRequest],
        actor: Option<UserId>,
    ) -> ServiceResult<Vec<AppliedAdjustment>> {
        if items.is_empty() {
            return Err(ServiceError::Validation("nothing to restore".to_string()));
        }
        validate_requests(items)?;

        let mut tx = self.store.begin().await?;
        let order = tx
            .order_for_update(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;

        // Ordered units minus units already restored, per product. The order
        // row lock serializes concurrent restores of the same order.
        let mut restorable: HashMap<ProductId, i64> = HashMap::new();
        for line in order.items() {
            *restorable.entry(line.product_id).or_default() += line.quantity;
        }
        for entry in tx.order_history(order_id).await? {
            if entry.change_type == ChangeType::OrderCancelled {
                if let Some(left) = restorable.get_mut(&entry.product_id) {
                    *left -= entry.quantity;
                }
            }
        }

        for item in items {
            let Some(left) = restorable.get_mut(&item.product_id) else {
                return Err(ServiceError::Validation(format!(
                    "product {} is not part of order {}",
                    item.product_id,
                    order.order_number()
                )));
            };
            if item.quantity > *left {
                return Err(ServiceError::Validation(format!(
                    "cannot restore {} of product {} for order {}: {} left to restore",
                    item.quantity,
                    item.product_id,
                    order.order_number(),
                    (*left).max(0)
                )));
            }
            *left -= item.quantity;
        }

        lock_products(tx.as_mut(), items.iter().map(|i| i.product_id)).await?;

        let mut applied = Vec::with_capacity(items.len());
        for item in items {
            let adjustment = StockAdjustment::new(
                item.product_id,
                item.quantity,
                StockChange::OrderCancelled {
                    order_id,
                    order_number: order.order_number().to_string(),
                },
                actor,
            )?;
            applied.push(apply_adjustment(tx.as_mut(), &adjustment).await?);
        }

        tx.commit().await?;
        self.signal.notify();
        info!(order_number = %order.order_number(), lines = applied.len(), "order stock restored");
        Ok(applied)
    }

    /// Move an order along its lifecycle. Stock is untouched.
    #[instrument(skip(self, admin_note), fields(next = next.as_str()), err)]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
        admin_note: Option<String>,
    ) -> ServiceResult<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .order_for_update(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;

        order.transition(next, admin_note, Utc::now())?;
        tx.update_order_status(&order).await?;
        tx.commit().await?;

        info!(order_number = %order.order_number(), status = next.as_str(), "order status updated");
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn find_order(&self, order_id: OrderId) -> ServiceResult<Order> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))
    }
}
