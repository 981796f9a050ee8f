//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. `Money` and
/// `OrderNumber` are value objects; `Product` and `Order` are entities.
///
/// ```ignore
/// let a = Money::from_minor(100)?;
/// let b = Money::from_minor(100)?;
/// assert_eq!(a, b); // equal by value, not identity
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
