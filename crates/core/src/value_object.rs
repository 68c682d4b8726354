//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values, e.g. a
/// seal abbreviation or a seal code. Two instances with the same value are the
/// same thing; to "modify" one, build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Abbreviation(String);
///
/// impl ValueObject for Abbreviation {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
