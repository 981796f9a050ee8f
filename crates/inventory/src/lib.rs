//! Inventory domain module: products, the stock adjustment decision, the
//! audit trail taxonomy and threshold alerts.
//!
//! This crate contains business rules only (no IO, no storage).

pub mod alert;
pub mod availability;
pub mod history;
pub mod product;

pub use alert::StockAlert;
pub use availability::{
    AvailabilityReport, ItemCheck, StockRequest, UnavailableReason, validate_requests,
};
pub use history::{ChangeType, StockAdjusted, StockAdjustment, StockChange, StockHistoryEntry};
pub use product::{Product, StockLevels};
