use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use groupbuy_core::{DomainError, DomainResult, OrderId, ProductId, StockHistoryId, UserId};
use groupbuy_events::Event;

use crate::alert::{self, StockAlert};
use crate::product::{Product, StockLevels};

/// Audit taxonomy for stock mutations. Persisted verbatim.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    AdminAdjust,
    Restock,
    OrderPlaced,
    OrderCancelled,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::AdminAdjust => "ADMIN_ADJUST",
            ChangeType::Restock => "RESTOCK",
            ChangeType::OrderPlaced => "ORDER_PLACED",
            ChangeType::OrderCancelled => "ORDER_CANCELLED",
        }
    }
}

impl core::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ChangeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN_ADJUST" => Ok(ChangeType::AdminAdjust),
            "RESTOCK" => Ok(ChangeType::Restock),
            "ORDER_PLACED" => Ok(ChangeType::OrderPlaced),
            "ORDER_CANCELLED" => Ok(ChangeType::OrderCancelled),
            other => Err(DomainError::validation(format!("unknown change type '{other}'"))),
        }
    }
}

/// Why stock is changing. Each variant fixes the change type and what
/// context it must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockChange {
    /// Manual correction by an administrator; the reason is mandatory.
    AdminAdjust { reason: String },
    /// Incoming goods.
    Restock { reason: Option<String> },
    /// Decrement caused by placing an order.
    OrderPlaced {
        order_id: OrderId,
        order_number: String,
    },
    /// Compensating increment after an order is cancelled.
    OrderCancelled {
        order_id: OrderId,
        order_number: String,
    },
}

impl StockChange {
    pub fn change_type(&self) -> ChangeType {
        match self {
            StockChange::AdminAdjust { .. } => ChangeType::AdminAdjust,
            StockChange::Restock { .. } => ChangeType::Restock,
            StockChange::OrderPlaced { .. } => ChangeType::OrderPlaced,
            StockChange::OrderCancelled { .. } => ChangeType::OrderCancelled,
        }
    }

    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            StockChange::OrderPlaced { order_id, .. }
            | StockChange::OrderCancelled { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }

    /// Human-readable reason recorded in the audit trail.
    pub fn reason(&self) -> String {
        match self {
            StockChange::AdminAdjust { reason } => reason.trim().to_string(),
            StockChange::Restock { reason } => reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or("restock")
                .to_string(),
            StockChange::OrderPlaced { order_number, .. } => {
                format!("order {order_number} placed")
            }
            StockChange::OrderCancelled { order_number, .. } => {
                format!("order {order_number} cancelled")
            }
        }
    }

    fn check_delta(&self, delta: i64) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        match self {
            StockChange::AdminAdjust { reason } if reason.trim().is_empty() => Err(
                DomainError::validation("admin adjustments require a reason"),
            ),
            StockChange::Restock { .. } if delta < 0 => {
                Err(DomainError::validation("restock delta must be positive"))
            }
            StockChange::OrderPlaced { .. } if delta > 0 => {
                Err(DomainError::validation("order placement delta must be negative"))
            }
            StockChange::OrderCancelled { .. } if delta < 0 => Err(DomainError::validation(
                "order cancellation delta must be positive",
            )),
            _ => Ok(()),
        }
    }
}

/// A validated request to move stock of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    product_id: ProductId,
    delta: i64,
    change: StockChange,
    actor: Option<UserId>,
}

impl StockAdjustment {
    pub fn new(
        product_id: ProductId,
        delta: i64,
        change: StockChange,
        actor: Option<UserId>,
    ) -> DomainResult<Self> {
        change.check_delta(delta)?;
        Ok(Self {
            product_id,
            delta,
            change,
            actor,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn change(&self) -> &StockChange {
        &self.change
    }

    pub fn actor(&self) -> Option<UserId> {
        self.actor
    }
}

/// Immutable audit record; exactly one per successful adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub id: StockHistoryId,
    pub product_id: ProductId,
    pub change_type: ChangeType,
    /// Signed delta applied.
    pub quantity: i64,
    pub before_stock: i64,
    pub after_stock: i64,
    pub reason: String,
    pub user_id: Option<UserId>,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl StockHistoryEntry {
    pub fn record(adjustment: &StockAdjustment, levels: StockLevels, at: DateTime<Utc>) -> Self {
        Self {
            id: StockHistoryId::new(),
            product_id: adjustment.product_id,
            change_type: adjustment.change.change_type(),
            quantity: levels.delta(),
            before_stock: levels.before,
            after_stock: levels.after,
            reason: adjustment.change.reason(),
            user_id: adjustment.actor,
            order_id: adjustment.change.order_id(),
            created_at: at,
        }
    }
}

/// Event: StockAdjusted.
///
/// Carries everything the threshold evaluation needs so the dispatcher does
/// not have to re-read the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub history_id: StockHistoryId,
    pub product_id: ProductId,
    pub product_name: String,
    pub change_type: ChangeType,
    pub quantity: i64,
    pub before_stock: i64,
    pub after_stock: i64,
    pub min_stock: i64,
    pub order_id: Option<OrderId>,
    pub occurred_at: DateTime<Utc>,
}

impl StockAdjusted {
    pub const EVENT_TYPE: &'static str = "inventory.stock.adjusted";

    pub fn from_entry(product: &Product, entry: &StockHistoryEntry) -> Self {
        Self {
            history_id: entry.id,
            product_id: entry.product_id,
            product_name: product.name().to_string(),
            change_type: entry.change_type,
            quantity: entry.quantity,
            before_stock: entry.before_stock,
            after_stock: entry.after_stock,
            min_stock: product.min_stock(),
            order_id: entry.order_id,
            occurred_at: entry.created_at,
        }
    }

    /// Threshold crossing caused by this adjustment, if any.
    pub fn alert(&self) -> Option<StockAlert> {
        alert::evaluate(self.before_stock, self.after_stock, self.quantity, self.min_stock)
    }
}

impl Event for StockAdjusted {
    const SUBJECT_TYPE: &'static str = "product";

    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn version(&self) -> u32 {
        1
    }

    fn subject_id(&self) -> Uuid {
        *self.product_id.as_uuid()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_change() -> StockChange {
        StockChange::OrderPlaced {
            order_id: OrderId::new(),
            order_number: "25080200001".into(),
        }
    }

    #[test]
    fn change_type_round_trips_through_str() {
        for ct in [
            ChangeType::AdminAdjust,
            ChangeType::Restock,
            ChangeType::OrderPlaced,
            ChangeType::OrderCancelled,
        ] {
            assert_eq!(ct.as_str().parse::<ChangeType>().unwrap(), ct);
            assert_eq!(
                serde_json::to_value(ct).unwrap(),
                serde_json::Value::String(ct.as_str().to_string())
            );
        }
        assert!("SHRINKAGE".parse::<ChangeType>().is_err());
    }

    #[test]
    fn delta_direction_is_checked_per_change_kind() {
        let pid = ProductId::new();
        let restock = StockChange::Restock { reason: None };
        assert!(StockAdjustment::new(pid, -1, restock, None).is_err());
        assert!(StockAdjustment::new(pid, 2, order_change(), None).is_err());
        assert!(
            StockAdjustment::new(
                pid,
                -2,
                StockChange::OrderCancelled {
                    order_id: OrderId::new(),
                    order_number: "x".into()
                },
                None
            )
            .is_err()
        );
        assert!(StockAdjustment::new(pid, -2, order_change(), None).is_ok());
    }

    #[test]
    fn admin_adjust_requires_reason() {
        let pid = ProductId::new();
        let blank = StockChange::AdminAdjust {
            reason: "   ".into(),
        };
        assert!(matches!(
            StockAdjustment::new(pid, 3, blank, None),
            Err(DomainError::Validation(_))
        ));
        let ok = StockChange::AdminAdjust {
            reason: "stock count correction".into(),
        };
        assert!(StockAdjustment::new(pid, -3, ok, None).is_ok());
    }

    #[test]
    fn record_snapshots_levels_and_context() {
        let pid = ProductId::new();
        let actor = UserId::new();
        let change = order_change();
        let order_id = change.order_id();
        let adj = StockAdjustment::new(pid, -2, change, Some(actor)).unwrap();
        let levels = StockLevels { before: 3, after: 1 };
        let entry = StockHistoryEntry::record(&adj, levels, Utc::now());

        assert_eq!(entry.product_id, pid);
        assert_eq!(entry.change_type, ChangeType::OrderPlaced);
        assert_eq!(entry.quantity, -2);
        assert_eq!(entry.before_stock, 3);
        assert_eq!(entry.after_stock, 1);
        assert_eq!(entry.order_id, order_id);
        assert_eq!(entry.user_id, Some(actor));
        assert_eq!(entry.reason, "order 25080200001 placed");
    }

    #[test]
    fn restock_reason_defaults_when_blank() {
        assert_eq!(StockChange::Restock { reason: None }.reason(), "restock");
        assert_eq!(
            StockChange::Restock {
                reason: Some(" ".into())
            }
            .reason(),
            "restock"
        );
    }
}
