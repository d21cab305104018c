//! Per-entity-type gateway.

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::id::Id;
use crate::manager::MutationGate;
use crate::matching::Matching;
use crate::specification::{Specification, ToQueryBuilder};
use crate::store::{Criteria, Store};
use std::marker::PhantomData;
use std::sync::Arc;

/// Gateway to entities of one type.
///
/// Repositories are cheap handles minted by a
/// [`Manager`](crate::manager::Manager); they share the manager's mutation
/// flag through a non-owning read capability, so a repository created
/// before a mutation context opens still observes it.
///
/// Absence is modeled as `Option`: a missing entity is a `None`, never an
/// error, and never a partially-constructed entity.
pub struct Repository<T, S> {
    store: Arc<S>,
    mutation: MutationGate,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity, S: Store> Repository<T, S> {
    pub(crate) fn new(store: Arc<S>, mutation: MutationGate) -> Self {
        Self {
            store,
            mutation,
            _marker: PhantomData,
        }
    }

    /// Point lookup by identifier.
    pub fn get(&self, id: &Id<T>) -> Result<Option<T>> {
        self.store.find(id)
    }

    /// Existence check by identifier.
    pub fn contains(&self, id: &Id<T>) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Stages `entity` for insertion.
    ///
    /// Fails with [`Error::MutationOutsideOfContext`] unless called inside
    /// an open `mutate`/`transaction` block.
    pub fn add(&self, entity: T) -> Result<()> {
        if !self.mutation.active() {
            return Err(Error::MutationOutsideOfContext);
        }

        tracing::trace!(entity = T::entity_name(), id = %entity.id(), "staging insertion");
        self.store.persist(entity)
    }

    /// Stages `entity` for deletion.
    ///
    /// Fails with [`Error::MutationOutsideOfContext`] unless called inside
    /// an open `mutate`/`transaction` block.
    pub fn remove(&self, entity: &T) -> Result<()> {
        if !self.mutation.active() {
            return Err(Error::MutationOutsideOfContext);
        }

        tracing::trace!(entity = T::entity_name(), id = %entity.id(), "staging deletion");
        self.store.remove(entity)
    }

    /// A builder over all entities of the type. No store access happens
    /// until the builder's `fetch`.
    pub fn all(&self) -> Matching<T> {
        Matching::all(self.store.repository::<T>())
    }

    /// A builder over entities matching `specification`. No store access
    /// happens until the builder's `fetch`.
    pub fn matching(&self, specification: Specification) -> Matching<T> {
        Matching::of(self.store.repository::<T>(), specification)
    }

    /// Counts entities, optionally restricted by a specification.
    ///
    /// Without a specification this is the store's native count. With one,
    /// the capability-rich path compiles a COUNT query; otherwise the
    /// entities are fetched and measured — slow, but correct.
    pub fn count(&self, specification: Option<&Specification>) -> Result<usize> {
        let repository = self.store.repository::<T>();
        match specification {
            None => repository.count_by(&Criteria::new()),
            Some(specification) => match repository.query_executor() {
                Some(executor) => {
                    let query = executor.create_query_builder("entity");
                    let entity = query.entity().to_owned();
                    let query = ToQueryBuilder::new(&entity, executor.metadata())
                        .compile(query, specification)?;
                    executor.count(&query.into_count())
                }
                None => self.matching(specification.clone()).fetch()?.size(),
            },
        }
    }
}
