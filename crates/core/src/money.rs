//! Monetary amounts in minor currency units.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Non-negative amount of money in minor currency units (e.g. cents).
///
/// All arithmetic is checked integer arithmetic; amounts never pass through
/// floating point. Presentation layers divide by 100 for display.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::validation(format!(
                "amount cannot be negative (got {minor})"
            )));
        }
        Ok(Self(minor))
    }

    pub fn minor_units(self) -> i64 {
        self.0
    }

    /// `self * quantity`, rejecting non-positive quantities and overflow.
    pub fn times(self, quantity: i64) -> DomainResult<Money> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl ValueObject for Money {}

impl TryFrom<i64> for Money {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Money::from_minor(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            Money::from_minor(-1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn times_multiplies_in_minor_units() {
        let price = Money::from_minor(10_000).unwrap();
        assert_eq!(price.times(2).unwrap().minor_units(), 20_000);
    }

    #[test]
    fn times_rejects_zero_quantity_and_overflow() {
        let price = Money::from_minor(i64::MAX / 2 + 1).unwrap();
        assert!(price.times(0).is_err());
        assert!(price.times(2).is_err());
    }

    #[test]
    fn displays_major_units() {
        assert_eq!(Money::from_minor(10_005).unwrap().to_string(), "100.05");
    }

    #[test]
    fn deserialize_enforces_non_negative() {
        assert!(serde_json::from_str::<Money>("-5").is_err());
        assert_eq!(serde_json::from_str::<Money>("250").unwrap().minor_units(), 250);
    }

    proptest! {
        /// Property: times() agrees with repeated checked addition.
        #[test]
        fn times_matches_repeated_addition(price in 0i64..1_000_000, qty in 1i64..50) {
            let unit = Money::from_minor(price).unwrap();
            let mut acc = Money::ZERO;
            for _ in 0..qty {
                acc = acc.checked_add(unit).unwrap();
            }
            prop_assert_eq!(unit.times(qty).unwrap(), acc);
        }
    }
}
