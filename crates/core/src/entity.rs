//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Two entities with the same identifier denote the same thing, even when
/// their other attributes differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Identity comparison (ignores every attribute except the identifier).
    fn same_identity<O>(&self, other: &O) -> bool
    where
        O: Entity<Id = Self::Id>,
    {
        self.id() == other.id()
    }
}
