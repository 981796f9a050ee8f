//! Human-readable order numbers: `YYMMDD` + 5-digit suffix.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use groupbuy_core::{DomainError, DomainResult, ValueObject};

const SUFFIX_SPACE: u32 = 100_000;

/// Order number such as `25080200001`.
///
/// Not unique by construction; the store enforces uniqueness and callers
/// retry with a fresh number on collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn compose(at: DateTime<Utc>, suffix: u32) -> DomainResult<Self> {
        if suffix >= SUFFIX_SPACE {
            return Err(DomainError::validation(format!(
                "order number suffix out of range: {suffix}"
            )));
        }
        Ok(Self(format!("{}{:05}", at.format("%y%m%d"), suffix)))
    }

    pub fn parse(s: impl Into<String>) -> DomainResult<Self> {
        let s = s.into();
        if s.len() != 11 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!("malformed order number '{s}'")));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for OrderNumber {}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OrderNumber::parse(value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

/// Source of candidate order numbers.
pub trait OrderNumberSource: Send + Sync {
    fn next(&self, at: DateTime<Utc>) -> OrderNumber;
}

/// Random 5-digit suffix per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderNumbers;

impl OrderNumberSource for RandomOrderNumbers {
    fn next(&self, at: DateTime<Utc>) -> OrderNumber {
        let suffix = rand::thread_rng().gen_range(0..SUFFIX_SPACE);
        // suffix < SUFFIX_SPACE always holds here
        OrderNumber(format!("{}{:05}", at.format("%y%m%d"), suffix))
    }
}
