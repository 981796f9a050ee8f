use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use groupbuy_core::{OrderId, ProductId, UserId};
use groupbuy_events::EventEnvelope;
use groupbuy_inventory::{Product, StockHistoryEntry};
use groupbuy_sales::Order;

use super::{OutboxRecord, Role, StoreError, StoreTx, StorefrontStore, User};

#[derive(Debug, Default, Clone)]
struct State {
    products: HashMap<ProductId, Product>,
    users: HashMap<UserId, User>,
    history: Vec<StockHistoryEntry>,
    orders: HashMap<OrderId, Order>,
    order_numbers: HashMap<String, OrderId>,
    outbox: Vec<OutboxRecord>,
    next_sequence: i64,
}

/// In-memory storefront store.
///
/// Intended for tests/dev. Transactions are serialized store-wide: `begin`
/// takes the store lock and works on a staged copy that replaces the
/// committed state on `commit`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Every outbox record, dispatched or not, in sequence order.
    pub async fn outbox(&self) -> Vec<OutboxRecord> {
        self.state.lock().await.outbox.clone()
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn update_stock(&mut self, product: &Product) -> Result<(), StoreError> {
        if product.stock() < 0 {
            return Err(StoreError::Conflict(format!(
                "stock check violated for product {}",
                product.id_typed()
            )));
        }
        match self.staged.products.get_mut(&product.id_typed()) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!(
                "product {} vanished during update",
                product.id_typed()
            ))),
        }
    }

    async fn append_history(&mut self, entry: &StockHistoryEntry) -> Result<(), StoreError> {
        self.staged.history.push(entry.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let number = order.order_number().as_str().to_string();
        if self.staged.order_numbers.contains_key(&number) {
            return Err(StoreError::DuplicateOrderNumber(number));
        }
        if self.staged.orders.contains_key(&order.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id_typed()
            )));
        }
        self.staged.order_numbers.insert(number, order.id_typed());
        self.staged.orders.insert(order.id_typed(), order.clone());
        Ok(())
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<(), StoreError> {
        match self.staged.orders.get_mut(&order.id_typed()) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!(
                "order {} vanished during update",
                order.id_typed()
            ))),
        }
    }

    async fn enqueue_outbox(
        &mut self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), StoreError> {
        if self
            .staged
            .outbox
            .iter()
            .any(|r| r.envelope.event_id() == envelope.event_id())
        {
            return Err(StoreError::Conflict(format!(
                "outbox event {} already exists",
                envelope.event_id()
            )));
        }
        self.staged.next_sequence += 1;
        let sequence = self.staged.next_sequence;
        self.staged.outbox.push(OutboxRecord {
            sequence,
            envelope: envelope.clone(),
            created_at: Utc::now(),
            dispatched_at: None,
        });
        Ok(())
    }

    async fn order_history(
        &mut self,
        order_id: OrderId,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        Ok(self
            .staged
            .history
            .iter()
            .filter(|e| e.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl StorefrontStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTx { guard, staged }))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<User>, StoreError> {
        let state = self.state.lock().await;
        let mut admins: Vec<User> = state
            .users
            .values()
            .filter(|u| u.role == Role::Admin)
            .cloned()
            .collect();
        admins.sort_by_key(|u| u.id);
        Ok(admins)
    }

    async fn find_products(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        let mut seen = std::collections::HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| state.products.get(id))
            .filter(|p| !active_only || p.is_active())
            .cloned()
            .collect())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn stock_history(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        let state = self.state.lock().await;
        // Appended in commit order, so reverse iteration is newest first.
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|e| e.product_id == product_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn low_stock_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        let mut low: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_low_stock())
            .cloned()
            .collect();
        low.sort_by_key(|p| (p.stock(), p.id_typed()));
        Ok(low)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn pending_outbox(&self, limit: u32) -> Result<Vec<OutboxRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .outbox
            .iter()
            .filter(|r| r.dispatched_at.is_none())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_outbox_dispatched(
        &self,
        event_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        for record in state.outbox.iter_mut() {
            if record.dispatched_at.is_none() && event_ids.contains(&record.envelope.event_id()) {
                record.dispatched_at = Some(at);
            }
        }
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .products
            .insert(product.id_typed(), product.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.state.lock().await.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupbuy_core::Money;

    fn product(stock: i64) -> Product {
        let price = Money::from_minor(1_500).unwrap();
        Product::new(ProductId::new(), "Peaches 2kg", price, stock, 2).unwrap()
    }

    #[tokio::test]
    async fn dropped_transaction_discards_staged_writes() {
        let store = InMemoryStore::new();
        let mut p = product(5);
        store.save_product(&p).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let levels = p.plan_adjustment(-2).unwrap();
            p.apply_adjustment(levels, Utc::now()).unwrap();
            tx.update_stock(&p).await.unwrap();
            // dropped here
        }

        let stored = store.find_product(p.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.stock(), 5);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = InMemoryStore::new();
        let mut p = product(5);
        store.save_product(&p).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let levels = p.plan_adjustment(3).unwrap();
        p.apply_adjustment(levels, Utc::now()).unwrap();
        tx.update_stock(&p).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.find_product(p.id_typed()).await.unwrap().unwrap().stock(), 8);
    }

    #[tokio::test]
    async fn low_stock_products_sort_ascending() {
        let store = InMemoryStore::new();
        for stock in [1, 0, 5, 3] {
            let p = Product::new(ProductId::new(), "Melon", Money::ZERO, stock, 4).unwrap();
            store.save_product(&p).await.unwrap();
        }
        let low: Vec<i64> = store
            .low_stock_products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.stock())
            .collect();
        assert_eq!(low, vec![0, 1, 3]);
    }

    #[tokio::test]
    async fn find_products_filters_inactive_and_duplicates() {
        let store = InMemoryStore::new();
        let on = product(1);
        let off = product(1).with_active(false);
        store.save_product(&on).await.unwrap();
        store.save_product(&off).await.unwrap();

        let ids = [on.id_typed(), on.id_typed(), off.id_typed(), ProductId::new()];
        assert_eq!(store.find_products(&ids, true).await.unwrap().len(), 1);
        assert_eq!(store.find_products(&ids, false).await.unwrap().len(), 2);
    }
}
