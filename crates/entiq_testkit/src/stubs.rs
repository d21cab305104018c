//! Recording store stubs for call-count assertions.

use entiq_core::{
    Criteria, Entity, Id, ObjectRepository, QueryBuilder, QueryExecutor, Result, SchemaMetadata,
    Session, SortKey, Store,
};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::fixtures::MapMetadata;

/// One recorded `find_by` invocation.
#[derive(Debug, Clone)]
pub struct FindByCall {
    /// The criteria map.
    pub criteria: Criteria,
    /// The sort directives.
    pub sort: Vec<SortKey>,
    /// The limit.
    pub take: Option<usize>,
    /// The offset.
    pub drop: Option<usize>,
}

/// Criteria-only repository stub returning canned entities and recording
/// every `find_by` call.
pub struct RecordingRepository<T> {
    entities: Vec<T>,
    calls: Mutex<Vec<FindByCall>>,
}

impl<T: Entity> RecordingRepository<T> {
    /// Creates a stub answering every query with `entities`.
    pub fn new(entities: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            entities,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// All recorded `find_by` calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<FindByCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded `find_by` calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Entity> ObjectRepository<T> for RecordingRepository<T> {
    fn find_all(&self) -> Result<Vec<T>> {
        Ok(self.entities.clone())
    }

    fn find_by(
        &self,
        criteria: &Criteria,
        sort: &[SortKey],
        take: Option<usize>,
        drop: Option<usize>,
    ) -> Result<Vec<T>> {
        self.calls.lock().push(FindByCall {
            criteria: criteria.clone(),
            sort: sort.to_vec(),
            take,
            drop,
        });
        Ok(self.entities.clone())
    }

    fn count_by(&self, _criteria: &Criteria) -> Result<usize> {
        Ok(self.entities.len())
    }

    fn query_executor(&self) -> Option<Arc<dyn QueryExecutor<T>>> {
        None
    }
}

/// Query executor stub returning canned entities and recording every
/// executed query.
pub struct RecordingExecutor<T> {
    entity: String,
    entities: Vec<T>,
    metadata: MapMetadata,
    queries: Mutex<Vec<QueryBuilder>>,
}

impl<T: Entity> RecordingExecutor<T> {
    /// Creates an executor stub for the given root entity name.
    pub fn new(entity: &str, entities: Vec<T>, metadata: MapMetadata) -> Arc<Self> {
        Arc::new(Self {
            entity: entity.to_owned(),
            entities,
            metadata,
            queries: Mutex::new(Vec::new()),
        })
    }

    /// All executed queries, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<QueryBuilder> {
        self.queries.lock().clone()
    }

    /// Number of executed queries.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

impl<T: Entity> QueryExecutor<T> for RecordingExecutor<T> {
    fn create_query_builder(&self, alias: &str) -> QueryBuilder {
        QueryBuilder::new(self.entity.clone(), alias)
    }

    fn metadata(&self) -> &dyn SchemaMetadata {
        &self.metadata
    }

    fn fetch(&self, query: &QueryBuilder) -> Result<Vec<T>> {
        self.queries.lock().push(query.clone());
        Ok(self.entities.clone())
    }

    fn stream(&self, query: &QueryBuilder) -> Result<Box<dyn Iterator<Item = T>>> {
        self.queries.lock().push(query.clone());
        Ok(Box::new(self.entities.clone().into_iter()))
    }

    fn count(&self, query: &QueryBuilder) -> Result<usize> {
        self.queries.lock().push(query.clone());
        Ok(self.entities.len())
    }
}

/// Repository stub exposing a [`RecordingExecutor`] as its query
/// capability, to drive the compiled-query fetch path.
pub struct ExecutorRepository<T> {
    executor: Arc<RecordingExecutor<T>>,
}

impl<T: Entity> ExecutorRepository<T> {
    /// Wraps an executor stub.
    pub fn new(executor: Arc<RecordingExecutor<T>>) -> Arc<Self> {
        Arc::new(Self { executor })
    }
}

impl<T: Entity> ObjectRepository<T> for ExecutorRepository<T> {
    fn find_all(&self) -> Result<Vec<T>> {
        Ok(self.executor.entities.clone())
    }

    fn find_by(
        &self,
        _criteria: &Criteria,
        _sort: &[SortKey],
        _take: Option<usize>,
        _drop: Option<usize>,
    ) -> Result<Vec<T>> {
        Ok(self.executor.entities.clone())
    }

    fn count_by(&self, _criteria: &Criteria) -> Result<usize> {
        Ok(self.executor.entities.len())
    }

    fn query_executor(&self) -> Option<Arc<dyn QueryExecutor<T>>> {
        Some(self.executor.clone())
    }
}

/// Session call counters of a [`StubStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCalls {
    /// `flush` invocations.
    pub flush: usize,
    /// `clear` invocations.
    pub clear: usize,
    /// `close` invocations.
    pub close: usize,
    /// `begin_transaction` invocations.
    pub begin: usize,
    /// `commit` invocations.
    pub commit: usize,
    /// `rollback` invocations.
    pub rollback: usize,
    /// `persist` invocations.
    pub persisted: usize,
    /// `remove` invocations.
    pub removed: usize,
}

/// Store stub: registered per-type repositories plus session counters.
///
/// Register a [`RecordingRepository`] or [`ExecutorRepository`] per entity
/// type, hand the store to a `Manager`, and assert on what reached it.
#[derive(Default)]
pub struct StubStore {
    repositories: Mutex<HashMap<TypeId, Box<dyn Any>>>,
    calls: Mutex<SessionCalls>,
}

impl StubStore {
    /// Creates an empty stub store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the repository answering for entity type `T`.
    pub fn register<T: Entity>(&self, repository: Arc<dyn ObjectRepository<T>>) {
        self.repositories
            .lock()
            .insert(TypeId::of::<T>(), Box::new(repository));
    }

    /// The session call counters so far.
    #[must_use]
    pub fn session_calls(&self) -> SessionCalls {
        *self.calls.lock()
    }
}

impl Session for StubStore {
    fn flush(&self) -> Result<()> {
        self.calls.lock().flush += 1;
        Ok(())
    }

    fn clear(&self) {
        self.calls.lock().clear += 1;
    }

    fn close(&self) {
        self.calls.lock().close += 1;
    }

    fn begin_transaction(&self) -> Result<()> {
        self.calls.lock().begin += 1;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.calls.lock().commit += 1;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.calls.lock().rollback += 1;
        Ok(())
    }
}

impl Store for StubStore {
    fn find<T: Entity>(&self, _id: &Id<T>) -> Result<Option<T>> {
        Ok(None)
    }

    fn persist<T: Entity>(&self, _entity: T) -> Result<()> {
        self.calls.lock().persisted += 1;
        Ok(())
    }

    fn remove<T: Entity>(&self, _entity: &T) -> Result<()> {
        self.calls.lock().removed += 1;
        Ok(())
    }

    fn repository<T: Entity>(&self) -> Arc<dyn ObjectRepository<T>> {
        self.repositories
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn ObjectRepository<T>>>())
            .cloned()
            .expect("no repository registered for entity type")
    }
}
