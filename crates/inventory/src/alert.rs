//! Edge-triggered stock threshold alerts.

use serde::{Deserialize, Serialize};

/// Threshold crossing worth telling administrators about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAlert {
    OutOfStock,
    RestockCompleted,
    LowStock,
}

impl StockAlert {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAlert::OutOfStock => "OUT_OF_STOCK",
            StockAlert::RestockCompleted => "RESTOCK_COMPLETED",
            StockAlert::LowStock => "LOW_STOCK",
        }
    }
}

/// Decide which alert (if any) a single adjustment triggers.
///
/// Rules are checked in order and the first match wins:
/// 1. reaching zero from a positive level -> `OutOfStock`
/// 2. a positive delta leaving exactly zero -> `RestockCompleted`
/// 3. dropping below `min_stock` (while still positive) from at or above it -> `LowStock`
///
/// Only transitions fire; staying below the threshold fires nothing.
pub fn evaluate(before: i64, after: i64, delta: i64, min_stock: i64) -> Option<StockAlert> {
    if after == 0 && before > 0 {
        return Some(StockAlert::OutOfStock);
    }
    if after > 0 && before == 0 && delta > 0 {
        return Some(StockAlert::RestockCompleted);
    }
    if after > 0 && after < min_stock && before >= min_stock {
        return Some(StockAlert::LowStock);
    }
    None
}
