//! The entity contract.

use crate::id::Id;
use crate::value::Value;

/// Contract every persisted entity type fulfills.
///
/// `property` is the structural accessor used wherever the core has to
/// reach into an entity by name at runtime: in-memory sorting and criteria
/// matching. An unknown name returns `None` rather than failing, and the
/// caller decides whether that is an error (criteria matching) or a
/// sort-as-null (sorting).
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {
    /// The store-facing entity name, used as the schema-metadata key.
    fn entity_name() -> &'static str;

    /// The entity's identifier.
    fn id(&self) -> Id<Self>;

    /// Reads the named property, if the entity declares it.
    fn property(&self, name: &str) -> Option<Value>;
}
