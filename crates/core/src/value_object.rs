//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; they
/// have no identity of their own. `MemberNumber` is the canonical example in
/// this workspace: two parses of the same input are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
