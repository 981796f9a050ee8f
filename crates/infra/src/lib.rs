//! Infrastructure layer: storage, the stock ledger, order placement,
//! the notification outbox and configuration.

pub mod availability;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notifications;
pub mod orders;
pub mod services;
pub mod store;


pub use availability::AvailabilityChecker;
pub use config::{ConfigError, StorefrontConfig};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use ledger::{AppliedAdjustment, StockLedger};
pub use orders::{OrderService, PlaceOrder};
pub use services::{
    InMemoryServices, PostgresServices, ServiceSettings, StorefrontServices,
    build_in_memory_services, build_postgres_services,
};
