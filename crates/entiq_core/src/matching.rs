//! Fetch-intent builder.

use crate::entity::Entity;
use crate::error::Result;
use crate::query::Direction;
use crate::sequence::Sequence;
use crate::specification::{Specification, ToQueryBuilder};
use crate::store::{ObjectRepository, SortKey};
use std::sync::Arc;

/// Immutable builder accumulating a specification plus paging and sorting
/// intent before producing a [`Sequence`].
///
/// Every configuration method returns a new builder. Nothing touches the
/// store until [`Matching::fetch`], where the execution strategy is chosen
/// once: a store exposing a query executor gets full compilation (joins,
/// OR, negation, JSON); a criteria-only store gets the flat criteria path.
/// The same API works against either backend — only the supported
/// specification subset differs.
pub struct Matching<T> {
    repository: Arc<dyn ObjectRepository<T>>,
    specification: Option<Specification>,
    sort: Vec<SortKey>,
    to_drop: usize,
    to_take: Option<usize>,
    lazy: bool,
}

impl<T> Clone for Matching<T> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            specification: self.specification.clone(),
            sort: self.sort.clone(),
            to_drop: self.to_drop,
            to_take: self.to_take,
            lazy: self.lazy,
        }
    }
}

impl<T: Entity> Matching<T> {
    pub(crate) fn of(
        repository: Arc<dyn ObjectRepository<T>>,
        specification: Specification,
    ) -> Self {
        Self {
            repository,
            specification: Some(specification),
            sort: Vec::new(),
            to_drop: 0,
            to_take: None,
            lazy: false,
        }
    }

    pub(crate) fn all(repository: Arc<dyn ObjectRepository<T>>) -> Self {
        Self {
            repository,
            specification: None,
            sort: Vec::new(),
            to_drop: 0,
            to_take: None,
            lazy: false,
        }
    }

    /// Skips `size` more leading results; drops compose additively.
    #[must_use]
    pub fn drop(&self, size: usize) -> Self {
        let mut matching = self.clone();
        matching.to_drop += size;
        matching
    }

    /// Limits the result count; the most recent take wins.
    #[must_use]
    pub fn take(&self, size: usize) -> Self {
        let mut matching = self.clone();
        matching.to_take = Some(size);
        matching
    }

    /// Appends a sort key; earlier keys stay primary.
    #[must_use]
    pub fn sort(&self, property: impl Into<String>, direction: Direction) -> Self {
        let mut matching = self.clone();
        matching.sort.push((property.into(), direction));
        matching
    }

    /// Switches the fetch to a streaming, single-pass source.
    #[must_use]
    pub fn lazy(&self) -> Self {
        let mut matching = self.clone();
        matching.lazy = true;
        matching
    }

    /// Applies an arbitrary transform to the builder itself — the escape
    /// hatch for conditional configuration.
    #[must_use]
    pub fn map(self, transform: impl FnOnce(Self) -> Self) -> Self {
        transform(self)
    }

    /// Produces the sequence for the accumulated intent.
    ///
    /// Compilation failures (a specification the chosen path cannot
    /// express) surface here for the compiled path and at first demand for
    /// the criteria path; store faults surface at first demand.
    pub fn fetch(&self) -> Result<Sequence<T>> {
        let sequence = match (self.repository.query_executor(), &self.specification) {
            (Some(executor), specification) => {
                let query = executor.create_query_builder("entity");
                let query = match specification {
                    Some(specification) => {
                        let entity = query.entity().to_owned();
                        ToQueryBuilder::new(&entity, executor.metadata())
                            .compile(query, specification)?
                    }
                    None => query,
                };
                Sequence::defer_query(executor, query, self.lazy)
            }
            (None, Some(specification)) => Sequence::defer_find_by(
                self.repository.clone(),
                specification.clone(),
                self.lazy,
            ),
            (None, None) => Sequence::of(self.repository.find_all()?),
        };

        let mut sequence = sequence;
        for (property, direction) in &self.sort {
            sequence = sequence.sort(property, *direction);
        }
        sequence = sequence.drop(self.to_drop);
        if let Some(size) = self.to_take {
            sequence = sequence.take(size);
        }

        Ok(sequence)
    }
}
