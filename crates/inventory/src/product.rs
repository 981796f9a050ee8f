use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use groupbuy_core::{DomainError, DomainResult, Money, ProductId};

/// Stock level snapshot around one adjustment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub before: i64,
    pub after: i64,
}

impl StockLevels {
    pub fn delta(&self) -> i64 {
        self.after - self.before
    }
}

/// A sellable catalog product, as far as the stock ledger is concerned.
///
/// `stock` is never negative: [`Product::new`] rejects it and
/// [`Product::plan_adjustment`] refuses any delta that would cross zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    image: Option<String>,
    price: Money,
    stock: i64,
    min_stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Money,
        stock: i64,
        min_stock: i64,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }

        let now = Utc::now();
        Ok(Self {
            id,
            name,
            image: None,
            price,
            stock,
            min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock < self.min_stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Decide the outcome of applying `delta` to the current stock.
    ///
    /// Pure: does not mutate. Fails with `InsufficientStock` when the result
    /// would be negative; never clamps.
    pub fn plan_adjustment(&self, delta: i64) -> DomainResult<StockLevels> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let after = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock overflow"))?;
        if after < 0 {
            return Err(DomainError::insufficient_stock(self.id, self.stock, delta));
        }

        Ok(StockLevels {
            before: self.stock,
            after,
        })
    }

    /// Apply a planned adjustment. `levels` must come from `plan_adjustment`
    /// on this same state.
    pub fn apply_adjustment(&mut self, levels: StockLevels, at: DateTime<Utc>) -> DomainResult<()> {
        if levels.before != self.stock {
            return Err(DomainError::invariant(format!(
                "stale stock snapshot for product {} (planned from {}, current {})",
                self.id, levels.before, self.stock
            )));
        }
        if levels.after < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.stock = levels.after;
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn product(stock: i64) -> Product {
        Product::new(
            ProductId::new(),
            "Jeju tangerines 5kg",
            Money::from_minor(10_000).unwrap(),
            stock,
            5,
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_negative_stock_and_blank_name() {
        let price = Money::ZERO;
        assert!(Product::new(ProductId::new(), "x", price, -1, 0).is_err());
        assert!(Product::new(ProductId::new(), "x", price, 0, -1).is_err());
        assert!(Product::new(ProductId::new(), "  ", price, 0, 0).is_err());
    }

    #[test]
    fn plan_adjustment_computes_before_and_after() {
        let p = product(3);
        let levels = p.plan_adjustment(-2).unwrap();
        assert_eq!(levels, StockLevels { before: 3, after: 1 });
        assert_eq!(levels.delta(), -2);
        // planning does not mutate
        assert_eq!(p.stock(), 3);
    }

    #[test]
    fn plan_adjustment_rejects_going_negative_without_clamping() {
        let p = product(3);
        match p.plan_adjustment(-5).unwrap_err() {
            DomainError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, p.id_typed());
                assert_eq!(available, 3);
                assert_eq!(requested, -5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn plan_adjustment_allows_reaching_exactly_zero() {
        let p = product(3);
        assert_eq!(p.plan_adjustment(-3).unwrap().after, 0);
    }

    #[test]
    fn zero_delta_is_a_validation_error() {
        assert!(matches!(
            product(3).plan_adjustment(0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn apply_adjustment_rejects_stale_plan() {
        let mut p = product(3);
        let stale = StockLevels { before: 4, after: 2 };
        assert!(matches!(
            p.apply_adjustment(stale, Utc::now()),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(p.stock(), 3);
    }

    #[test]
    fn low_stock_is_strictly_below_minimum() {
        assert!(!product(5).is_low_stock());
        assert!(product(4).is_low_stock());
    }

    proptest! {
        /// Property: no sequence of adjustments ever yields negative stock, and
        /// rejected adjustments leave stock unchanged.
        #[test]
        fn stock_never_negative(
            initial in 0i64..50,
            deltas in proptest::collection::vec(-20i64..20, 0..60)
        ) {
            let mut p = product(initial);
            for delta in deltas {
                let before = p.stock();
                match p.plan_adjustment(delta) {
                    Ok(levels) => {
                        prop_assert_eq!(levels.after - levels.before, delta);
                        p.apply_adjustment(levels, Utc::now()).unwrap();
                    }
                    Err(_) => prop_assert_eq!(p.stock(), before),
                }
                prop_assert!(p.stock() >= 0);
            }
        }
    }
}
