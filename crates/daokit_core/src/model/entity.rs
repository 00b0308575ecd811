//! Identity contract for persistable entities.

/// Surrogate key assigned by the storage backend.
pub type EntityId = i64;

/// Data holder the DAO layer can persist and look up by identifier.
pub trait Entity {
    /// Stable entity name used in statement ids, query text, and errors.
    fn entity_name() -> &'static str
    where
        Self: Sized;

    fn id(&self) -> Option<EntityId>;

    fn set_id(&mut self, id: EntityId);

    /// Returns a copy carrying the given identifier.
    fn with_id(mut self, id: EntityId) -> Self
    where
        Self: Sized,
    {
        self.set_id(id);
        self
    }
}
