//! Infrastructure and service-layer error types.

use thiserror::Error;

use groupbuy_core::{DomainError, ProductId};
use groupbuy_events::EnvelopeError;
use groupbuy_inventory::ItemCheck;

/// Errors raised by a storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The generated order number already exists.
    #[error("duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// A write conflicted with an existing row or constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A persisted row could not be mapped back into the domain.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Connection, pool or other driver failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<EnvelopeError> for StoreError {
    fn from(e: EnvelopeError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Errors returned by the storefront services (ledger, checker, orders).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(
        "insufficient stock for product {product_id}: available {available}, requested change {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// The advisory pre-check rejected one or more requested items.
    #[error("{} item(s) unavailable", .0.len())]
    StockUnavailable(Vec<ItemCheck>),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Every generated order number collided with an existing one.
    #[error("could not allocate a unique order number after {0} attempts")]
    OrderNumberExhausted(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::InsufficientStock {
                product_id,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_one_to_one() {
        let pid = ProductId::new();
        match ServiceError::from(DomainError::insufficient_stock(pid, 3, -5)) {
            ServiceError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, pid);
                assert_eq!(available, 3);
                assert_eq!(requested, -5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            ServiceError::from(DomainError::not_found("product x")),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(DomainError::validation("bad")),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn store_errors_are_wrapped_transparently() {
        let err: ServiceError = StoreError::Backend("pool closed".into()).into();
        assert_eq!(err.to_string(), "backend error: pool closed");
    }
}
