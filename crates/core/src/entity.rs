//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Ordering of identifiers matters here: removal strategies tie-break on
/// identity, so `Id` must be totally ordered.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
