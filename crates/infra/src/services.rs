//! Service wiring: one store, one outbox signal, the services on top.

use std::sync::Arc;

use crate::availability::AvailabilityChecker;
use crate::config::StorefrontConfig;
use crate::error::StoreError;
use crate::ledger::StockLedger;
use crate::notifications::{
    InMemoryNotificationStore, NotificationDispatcher, NotificationStore, OutboxSignal,
    OutboxTrigger, PostgresNotificationStore,
};
use crate::orders::OrderService;
use crate::store::{InMemoryStore, PostgresStore, StorefrontStore};

/// Runtime tunables shared by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub order_number_attempts: u32,
    pub history_limit_max: u32,
    pub outbox_batch_size: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            order_number_attempts: crate::orders::DEFAULT_ORDER_NUMBER_ATTEMPTS,
            history_limit_max: crate::ledger::DEFAULT_HISTORY_LIMIT_MAX,
            outbox_batch_size: 100,
        }
    }
}

impl From<&StorefrontConfig> for ServiceSettings {
    fn from(cfg: &StorefrontConfig) -> Self {
        Self {
            order_number_attempts: cfg.order_number_attempts,
            history_limit_max: cfg.history_limit_max,
            outbox_batch_size: cfg.outbox_batch_size,
        }
    }
}

pub struct StorefrontServices<S: ?Sized, N: ?Sized> {
    pub store: Arc<S>,
    pub notifications: Arc<N>,
    pub ledger: StockLedger<S>,
    pub checker: AvailabilityChecker<S>,
    pub orders: OrderService<S>,
    pub dispatcher: Arc<NotificationDispatcher<S, N>>,
}

impl<S, N> StorefrontServices<S, N>
where
    S: StorefrontStore + ?Sized,
    N: NotificationStore + ?Sized,
{
    /// Wire the services. The returned trigger belongs to the notification
    /// worker; drop it to run without one.
    pub fn new(
        store: Arc<S>,
        notifications: Arc<N>,
        settings: ServiceSettings,
    ) -> (Self, OutboxTrigger) {
        let (signal, trigger) = OutboxSignal::channel();
        (Self::with_signal(store, notifications, settings, signal), trigger)
    }

    pub fn with_signal(
        store: Arc<S>,
        notifications: Arc<N>,
        settings: ServiceSettings,
        signal: OutboxSignal,
    ) -> Self {
        let ledger = StockLedger::new(store.clone(), signal.clone())
            .with_history_limit_max(settings.history_limit_max);
        let checker = AvailabilityChecker::new(store.clone());
        let orders = OrderService::new(store.clone(), signal)
            .with_order_number_attempts(settings.order_number_attempts);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            notifications.clone(),
            settings.outbox_batch_size,
        ));

        Self {
            store,
            notifications,
            ledger,
            checker,
            orders,
            dispatcher,
        }
    }
}

pub type InMemoryServices = StorefrontServices<InMemoryStore, InMemoryNotificationStore>;
pub type PostgresServices = StorefrontServices<PostgresStore, PostgresNotificationStore>;

/// In-memory wiring (dev/test).
pub fn build_in_memory_services(settings: ServiceSettings) -> (InMemoryServices, OutboxTrigger) {
    StorefrontServices::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryNotificationStore::new()),
        settings,
    )
}

/// Postgres wiring: connects the pool and applies migrations.
pub async fn build_postgres_services(
    cfg: &StorefrontConfig,
) -> Result<(PostgresServices, OutboxTrigger), StoreError> {
    let store = PostgresStore::connect(&cfg.database_url, cfg.db_max_connections).await?;
    store.migrate().await?;
    let notifications = PostgresNotificationStore::new(store.pool().clone());

    Ok(StorefrontServices::new(
        Arc::new(store),
        Arc::new(notifications),
        ServiceSettings::from(cfg),
    ))
}
