//! The store boundary.
//!
//! The core owns no storage. Everything it needs from the underlying
//! store is expressed here as narrow capabilities: a session with a staged
//! unit of work and transactions, per-entity lookup/persist/remove, a
//! criteria-based repository, and — optionally — a query executor. The
//! presence or absence of the query executor is exactly the signal the
//! fetch path uses to choose between full compilation and the flat
//! criteria fallback.

use crate::entity::Entity;
use crate::error::Result;
use crate::id::Id;
use crate::query::{Direction, QueryBuilder};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Flat property→value criteria map, the capability-poor query form.
pub type Criteria = BTreeMap<String, Value>;

/// One sort directive: property name and direction.
pub type SortKey = (String, Direction);

/// Declared type of an entity field, as known to the schema metadata.
///
/// Only [`FieldType::Json`] changes compilation: JSON-typed columns are
/// wrapped so the database compares a normalized top-level JSON value
/// instead of the raw encoded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Boolean column.
    Boolean,
    /// Integer column.
    Integer,
    /// Floating point column.
    Float,
    /// Text column.
    Text,
    /// UUID column.
    Uuid,
    /// JSON document column.
    Json,
    /// Date-time column.
    DateTime,
}

/// Schema metadata consulted by the query compiler.
pub trait SchemaMetadata {
    /// The declared type of `field` on `entity`, if known.
    fn field_type(&self, entity: &str, field: &str) -> Option<FieldType>;

    /// The target entity of the `relation` association on `entity`.
    fn association_target(&self, entity: &str, relation: &str) -> Option<String>;
}

/// Session-level store operations.
pub trait Session {
    /// Durably applies the staged unit of work.
    fn flush(&self) -> Result<()>;

    /// Detaches all tracked entities from the session.
    fn clear(&self);

    /// Invalidates the current session after an unrecovered fault.
    fn close(&self);

    /// Opens a store transaction.
    fn begin_transaction(&self) -> Result<()>;

    /// Commits the open transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls the open transaction back.
    fn rollback(&self) -> Result<()>;
}

/// The full store capability the manager and repositories consume.
///
/// `persist` and `remove` stage changes; nothing is durable until
/// [`Session::flush`].
pub trait Store: Session {
    /// Point lookup by identifier.
    fn find<T: Entity>(&self, id: &Id<T>) -> Result<Option<T>>;

    /// Stages an entity for insertion or update.
    fn persist<T: Entity>(&self, entity: T) -> Result<()>;

    /// Stages an entity for deletion.
    fn remove<T: Entity>(&self, entity: &T) -> Result<()>;

    /// The per-entity-type repository capability.
    fn repository<T: Entity>(&self) -> Arc<dyn ObjectRepository<T>>;
}

/// Criteria-based, per-entity-type read capability.
pub trait ObjectRepository<T> {
    /// All entities of the type.
    fn find_all(&self) -> Result<Vec<T>>;

    /// Entities matching the flat criteria, sorted and paged.
    fn find_by(
        &self,
        criteria: &Criteria,
        sort: &[SortKey],
        take: Option<usize>,
        drop: Option<usize>,
    ) -> Result<Vec<T>>;

    /// Count of entities matching the flat criteria.
    fn count_by(&self, criteria: &Criteria) -> Result<usize>;

    /// The query-executor capability, when this store can execute compiled
    /// queries. `None` routes fetching through the criteria path.
    fn query_executor(&self) -> Option<Arc<dyn QueryExecutor<T>>>;
}

/// Compiled-query execution capability of a capability-rich store.
pub trait QueryExecutor<T> {
    /// Creates an empty query builder rooted at `alias`.
    fn create_query_builder(&self, alias: &str) -> QueryBuilder;

    /// The schema metadata for this store.
    fn metadata(&self) -> &dyn SchemaMetadata;

    /// Executes the query and materializes all results.
    fn fetch(&self, query: &QueryBuilder) -> Result<Vec<T>>;

    /// Executes the query and streams results one at a time.
    ///
    /// A streaming executor may clear its session between iterations to
    /// bound memory; the returned iterator is single-pass.
    fn stream(&self, query: &QueryBuilder) -> Result<Box<dyn Iterator<Item = T>>>;

    /// Executes the query as a count.
    fn count(&self, query: &QueryBuilder) -> Result<usize>;
}
