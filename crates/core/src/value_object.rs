//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values. Two value objects with the same values are equal.

/// Marker trait for value objects.
///
/// - **Value Object**: no identity (an `ItemKey` of material `M-1` in `WH01`
///   is the same key wherever it appears)
/// - **Entity**: has identity (an inventory item keeps its identity while its
///   quantity changes)
///
/// Value objects should be immutable. To "modify" one, build a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
