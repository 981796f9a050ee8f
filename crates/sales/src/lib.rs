//! Orders domain module.
//!
//! This crate contains business rules for storefront orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod order_number;

pub use order::{
    CustomerSnapshot, Order, OrderItem, OrderParts, OrderStatus, PaymentStatus, PricedLine,
    price_lines,
};
pub use order_number::{OrderNumber, OrderNumberSource, RandomOrderNumbers};
