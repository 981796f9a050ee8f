//! Advisory stock availability evaluation.
//!
//! This is a best-effort pre-check over an already-loaded snapshot of
//! products. It takes no locks and reserves nothing; the ledger's locked
//! decrement remains the authoritative check.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use groupbuy_core::{DomainError, DomainResult, ProductId};

use crate::product::Product;

/// One requested `(product, quantity)` pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl StockRequest {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Reject non-positive quantities before any I/O.
pub fn validate_requests(items: &[StockRequest]) -> DomainResult<()> {
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for product {} must be positive (got {})",
                item.product_id, item.quantity
            )));
        }
    }
    Ok(())
}

/// Why an item failed the check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    NotFound,
    Inactive,
    InsufficientStock,
}

impl UnavailableReason {
    pub fn message(&self) -> &'static str {
        match self {
            UnavailableReason::NotFound => "product does not exist",
            UnavailableReason::Inactive => "product is not currently on sale",
            UnavailableReason::InsufficientStock => "not enough stock for the requested quantity",
        }
    }
}

impl core::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// Per-item check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCheck {
    pub product_id: ProductId,
    pub available: bool,
    pub reason: Option<UnavailableReason>,
    pub current_stock: Option<i64>,
    pub requested_quantity: Option<i64>,
}

/// Batch check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub all_available: bool,
    pub items: Vec<ItemCheck>,
}

impl AvailabilityReport {
    pub fn failures(&self) -> Vec<ItemCheck> {
        self.items.iter().filter(|c| !c.available).cloned().collect()
    }
}

/// Evaluate each request against the loaded products (order preserved).
///
/// `products` may contain inactive products; missing entries count as
/// "does not exist".
pub fn evaluate<'a, I>(items: &[StockRequest], products: I) -> AvailabilityReport
where
    I: IntoIterator<Item = &'a Product>,
{
    let by_id: HashMap<ProductId, &Product> =
        products.into_iter().map(|p| (p.id_typed(), p)).collect();

    let checks: Vec<ItemCheck> = items
        .iter()
        .map(|req| match by_id.get(&req.product_id) {
            None => ItemCheck {
                product_id: req.product_id,
                available: false,
                reason: Some(UnavailableReason::NotFound),
                current_stock: None,
                requested_quantity: Some(req.quantity),
            },
            Some(p) if !p.is_active() => ItemCheck {
                product_id: req.product_id,
                available: false,
                reason: Some(UnavailableReason::Inactive),
                current_stock: Some(p.stock()),
                requested_quantity: Some(req.quantity),
            },
            Some(p) if p.stock() < req.quantity => ItemCheck {
                product_id: req.product_id,
                available: false,
                reason: Some(UnavailableReason::InsufficientStock),
                current_stock: Some(p.stock()),
                requested_quantity: Some(req.quantity),
            },
            Some(p) => ItemCheck {
                product_id: req.product_id,
                available: true,
                reason: None,
                current_stock: Some(p.stock()),
                requested_quantity: Some(req.quantity),
            },
        })
        .collect();

    AvailabilityReport {
        all_available: checks.iter().all(|c| c.available),
        items: checks,
    }
}
