//! Postgres-backed tests. Skipped unless `DATABASE_URL` points at a
//! disposable database.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use groupbuy_core::{Money, ProductId, UserId};
use groupbuy_infra::notifications::{NotificationStore, PostgresNotificationStore};
use groupbuy_infra::store::{PostgresStore, Role, StorefrontStore, User};
use groupbuy_infra::{OrderService, PlaceOrder, ServiceError, ServiceSettings, StorefrontServices};
use groupbuy_inventory::{ChangeType, Product, StockChange, StockRequest};
use groupbuy_sales::{OrderNumber, OrderNumberSource};

async fn connect() -> Option<PostgresStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let store = PostgresStore::connect(&url, 5).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

async fn seed_user(store: &PostgresStore, role: Role) -> User {
    let id = UserId::new();
    let user = User {
        id,
        name: format!("pg-user-{id}"),
        email: format!("{id}@pg.example.com"),
        role,
    };
    store.save_user(&user).await.unwrap();
    user
}

async fn seed_product(store: &PostgresStore, stock: i64, min_stock: i64) -> Product {
    let product = Product::new(
        ProductId::new(),
        "Andong apples 5kg",
        Money::from_minor(32_000).unwrap(),
        stock,
        min_stock,
    )
    .unwrap();
    store.save_product(&product).await.unwrap();
    product
}

fn order_for(user: &User, items: Vec<StockRequest>) -> PlaceOrder {
    PlaceOrder {
        user_id: user.id,
        customer_phone: "010-4444-5555".into(),
        customer_note: None,
        admin_note: None,
        items,
    }
}

/// Always hands out the same suffix.
struct FixedNumber(u32);

impl OrderNumberSource for FixedNumber {
    fn next(&self, at: DateTime<Utc>) -> OrderNumber {
        OrderNumber::compose(at, self.0).unwrap()
    }
}

#[tokio::test]
async fn order_placement_persists_order_history_and_outbox() {
    let Some(store) = connect().await else { return };
    let notifications = PostgresNotificationStore::new(store.pool().clone());
    let (services, _trigger) = StorefrontServices::new(
        Arc::new(store),
        Arc::new(notifications),
        ServiceSettings::default(),
    );

    let buyer = seed_user(&services.store, Role::Customer).await;
    let product = seed_product(&services.store, 3, 1).await;

    let order = services
        .orders
        .place_order(order_for(&buyer, vec![StockRequest::new(product.id_typed(), 2)]))
        .await
        .unwrap();

    let stored = services.orders.find_order(order.id_typed()).await.unwrap();
    assert_eq!(stored.order_number(), order.order_number());
    assert_eq!(stored.total_amount().minor_units(), 64_000);
    assert_eq!(stored.items().len(), 1);
    assert_eq!(stored.items()[0].quantity, 2);

    let current = services.store.find_product(product.id_typed()).await.unwrap().unwrap();
    assert_eq!(current.stock(), 1);

    let history = services.ledger.get_stock_history(product.id_typed(), 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, ChangeType::OrderPlaced);
    assert_eq!((history[0].before_stock, history[0].after_stock), (3, 1));
    assert_eq!(history[0].order_id, Some(order.id_typed()));
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_transaction() {
    let Some(store) = connect().await else { return };
    let store = Arc::new(store);
    let ledger = groupbuy_infra::StockLedger::new(
        store.clone(),
        groupbuy_infra::notifications::OutboxSignal::disabled(),
    );
    let product = seed_product(&store, 2, 0).await;

    let err = ledger
        .adjust_stock(
            product.id_typed(),
            -3,
            StockChange::AdminAdjust {
                reason: "write-off".into(),
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock { available: 2, .. }));

    let current = store.find_product(product.id_typed()).await.unwrap().unwrap();
    assert_eq!(current.stock(), 2);
    assert!(store.stock_history(product.id_typed(), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_order_numbers_exhaust_retries() {
    let Some(store) = connect().await else { return };
    let store = Arc::new(store);
    let suffix = (UserId::new().as_uuid().as_u128() % 100_000) as u32;
    let signal = groupbuy_infra::notifications::OutboxSignal::disabled();
    let orders = OrderService::new(store.clone(), signal)
        .with_order_numbers(Arc::new(FixedNumber(suffix)))
        .with_order_number_attempts(2);

    let buyer = seed_user(&store, Role::Customer).await;
    let product = seed_product(&store, 10, 0).await;

    // The suffix is random per run; a leftover row from an earlier run on
    // the same day may already hold it.
    let first = orders
        .place_order(order_for(&buyer, vec![StockRequest::new(product.id_typed(), 1)]))
        .await;
    if first.is_err() {
        return;
    }
    let err = orders
        .place_order(order_for(&buyer, vec![StockRequest::new(product.id_typed(), 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OrderNumberExhausted(2)));

    let current = store.find_product(product.id_typed()).await.unwrap().unwrap();
    assert_eq!(current.stock(), 9);
}

#[tokio::test]
async fn notifications_are_deduplicated_per_event_and_recipient() {
    let Some(store) = connect().await else { return };
    let admin = seed_user(&store, Role::Admin).await;
    let notifications = PostgresNotificationStore::new(store.pool().clone());

    let event_id = uuid::Uuid::now_v7();
    let event = groupbuy_inventory::StockAdjusted {
        history_id: groupbuy_core::StockHistoryId::new(),
        product_id: ProductId::new(),
        product_name: "Jeonju bibimbap kit".into(),
        change_type: ChangeType::AdminAdjust,
        quantity: -4,
        before_stock: 4,
        after_stock: 0,
        min_stock: 2,
        order_id: None,
        occurred_at: Utc::now(),
    };
    let alert = event.alert().unwrap();

    let first = groupbuy_infra::notifications::Notification::for_alert(
        admin.id,
        alert,
        &event,
        event_id,
        Utc::now(),
    );
    let again = groupbuy_infra::notifications::Notification::for_alert(
        admin.id,
        alert,
        &event,
        event_id,
        Utc::now(),
    );

    assert!(notifications.emit(&first).await.unwrap());
    assert!(!notifications.emit(&again).await.unwrap());
}
