//! Lazy, immutable result sequences.
//!
//! A [`Sequence`] is an ordered collection of entities with value
//! semantics: every operation returns a new sequence and the receiver is
//! never mutated, so sequences are safe to share. A sequence is backed by
//! one of three variants — an in-memory backing, or one of two deferred
//! backings that accumulate fetch intent (sort, additive drop, last-write
//! take) and hit the store exactly once, on the first operation that needs
//! actual data. After that single execution the materialized backing
//! answers everything.

mod concrete;
mod defer_find_by;
mod defer_query;

pub(crate) use concrete::Concrete;
pub(crate) use defer_find_by::DeferFindBy;
pub(crate) use defer_query::DeferQuery;

use crate::entity::Entity;
use crate::error::Result;
use crate::query::{Direction, QueryBuilder};
use crate::specification::Specification;
use crate::store::{ObjectRepository, QueryExecutor};
use std::cmp::Ordering;
use std::sync::Arc;

enum Inner<T> {
    Concrete(Concrete<T>),
    FindBy(DeferFindBy<T>),
    Query(DeferQuery<T>),
}

impl<T> Clone for Inner<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Concrete(concrete) => Self::Concrete(concrete.clone()),
            Self::FindBy(defer) => Self::FindBy(defer.clone()),
            Self::Query(defer) => Self::Query(defer.clone()),
        }
    }
}

/// An immutable, possibly lazily-executed ordered collection of entities.
pub struct Sequence<T> {
    inner: Inner<T>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Sequence<T> {
    /// Builds an eager in-memory sequence.
    #[must_use]
    pub fn of(elements: Vec<T>) -> Self {
        Self {
            inner: Inner::Concrete(Concrete::new(elements)),
        }
    }

    /// Builds a generator-backed sequence, drained on first demand.
    #[must_use]
    pub fn deferred(elements: Box<dyn Iterator<Item = T>>) -> Self {
        Self {
            inner: Inner::Concrete(Concrete::deferred(elements)),
        }
    }

    pub(crate) fn defer_find_by(
        repository: Arc<dyn ObjectRepository<T>>,
        specification: Specification,
        lazy: bool,
    ) -> Self {
        Self {
            inner: Inner::FindBy(DeferFindBy::new(repository, specification, lazy)),
        }
    }

    pub(crate) fn defer_query(
        executor: Arc<dyn QueryExecutor<T>>,
        query: QueryBuilder,
        lazy: bool,
    ) -> Self {
        Self {
            inner: Inner::Query(DeferQuery::new(executor, query, lazy)),
        }
    }

    fn concrete(concrete: Concrete<T>) -> Self {
        Self {
            inner: Inner::Concrete(concrete),
        }
    }

    /// Forces execution of a deferred backing.
    fn force(&self) -> Result<Concrete<T>> {
        match &self.inner {
            Inner::Concrete(concrete) => Ok(concrete.clone()),
            Inner::FindBy(defer) => defer.execute(),
            Inner::Query(defer) => defer.execute(),
        }
    }

    /// Number of elements; forces execution.
    pub fn size(&self) -> Result<usize> {
        Ok(self.force()?.size())
    }

    /// `true` when there are no elements; forces execution.
    pub fn empty(&self) -> Result<bool> {
        Ok(self.force()?.is_empty())
    }

    /// A new sequence skipping the first `size` elements.
    ///
    /// While unexecuted, drops compose additively and are pushed down to
    /// the store as the result offset; once executed, the materialized
    /// backing is sliced in memory.
    #[must_use]
    pub fn drop(&self, size: usize) -> Self {
        match &self.inner {
            Inner::Concrete(concrete) => Self::concrete(concrete.drop_first(size)),
            Inner::FindBy(defer) => match defer.executed() {
                Some(concrete) => Self::concrete(concrete.drop_first(size)),
                None => Self {
                    inner: Inner::FindBy(defer.with_drop(size)),
                },
            },
            Inner::Query(defer) => match defer.executed() {
                Some(concrete) => Self::concrete(concrete.drop_first(size)),
                None => Self {
                    inner: Inner::Query(defer.with_drop(size)),
                },
            },
        }
    }

    /// A new sequence limited to the first `size` elements.
    ///
    /// While unexecuted, the most recent take wins and is pushed down to
    /// the store as the result limit; once executed, the materialized
    /// backing is sliced in memory.
    #[must_use]
    pub fn take(&self, size: usize) -> Self {
        match &self.inner {
            Inner::Concrete(concrete) => Self::concrete(concrete.take_first(size)),
            Inner::FindBy(defer) => match defer.executed() {
                Some(concrete) => Self::concrete(concrete.take_first(size)),
                None => Self {
                    inner: Inner::FindBy(defer.with_take(size)),
                },
            },
            Inner::Query(defer) => match defer.executed() {
                Some(concrete) => Self::concrete(concrete.take_first(size)),
                None => Self {
                    inner: Inner::Query(defer.with_take(size)),
                },
            },
        }
    }

    /// A new sequence sorted by `property`.
    ///
    /// While unexecuted, sort keys append to a multi-key order pushed down
    /// to the store; once executed, the materialized backing is sorted in
    /// memory through the entity property accessor (elements without the
    /// property sort as null).
    #[must_use]
    pub fn sort(&self, property: &str, direction: Direction) -> Self
    where
        T: Entity,
    {
        match &self.inner {
            Inner::Concrete(concrete) => Self::concrete(concrete.sort(property, direction)),
            Inner::FindBy(defer) => match defer.executed() {
                Some(concrete) => Self::concrete(concrete.sort(property, direction)),
                None => Self {
                    inner: Inner::FindBy(defer.with_sort(property, direction)),
                },
            },
            Inner::Query(defer) => match defer.executed() {
                Some(concrete) => Self::concrete(concrete.sort(property, direction)),
                None => Self {
                    inner: Inner::Query(defer.with_sort(property, direction)),
                },
            },
        }
    }

    /// A new sequence sorted by an explicit comparator; forces execution.
    ///
    /// This is the typed alternative to the name-based [`Sequence::sort`]
    /// for orderings a store cannot compute.
    pub fn sort_by(&self, compare: impl Fn(&T, &T) -> Ordering) -> Result<Self> {
        Ok(Self::concrete(self.force()?.sort_by(compare)))
    }

    /// A new sequence keeping only matching elements; forces execution.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Result<Self> {
        Ok(Self::concrete(self.force()?.filter(predicate)))
    }

    /// A new sequence of transformed elements; forces execution.
    pub fn map<V: Clone + 'static>(&self, transform: impl Fn(&T) -> V) -> Result<Sequence<V>> {
        Ok(Sequence::concrete(self.force()?.map(transform)))
    }

    /// Visits every element in order; forces execution.
    pub fn foreach(&self, visitor: impl FnMut(&T)) -> Result<()> {
        self.force()?.foreach(visitor);
        Ok(())
    }

    /// Membership test by element equality; forces execution.
    pub fn contains(&self, element: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        Ok(self.force()?.contains(element))
    }

    /// A new sequence with `other`'s elements strictly after this one's;
    /// forces execution of both.
    pub fn append(&self, other: &Sequence<T>) -> Result<Self> {
        let tail = other.force()?.to_vec();
        Ok(Self::concrete(self.force()?.concat(&tail)))
    }

    /// A new sequence with `element` appended at the end; forces execution.
    pub fn add(&self, element: T) -> Result<Self> {
        Ok(Self::concrete(self.force()?.add(element)))
    }

    /// Strict left-to-right fold; forces execution.
    pub fn reduce<C>(&self, initial: C, combiner: impl FnMut(C, &T) -> C) -> Result<C> {
        Ok(self.force()?.reduce(initial, combiner))
    }

    /// A new empty sequence of the same element type.
    #[must_use]
    pub fn clear(&self) -> Self {
        Self::concrete(Concrete::empty())
    }

    /// `true` when both sequences yield equal elements in the same order;
    /// forces execution of both.
    pub fn equals(&self, other: &Sequence<T>) -> Result<bool>
    where
        T: PartialEq,
    {
        let tail = other.force()?.to_vec();
        Ok(self.force()?.equals(&tail))
    }

    /// The first element matching the predicate; forces execution.
    ///
    /// Fails with [`crate::Error::NoElementMatchingPredicateFound`] when
    /// nothing matches — an expected control-flow signal.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<T> {
        self.force()?.find(predicate)
    }

    /// All elements, in order; forces execution.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        Ok(self.force()?.to_vec())
    }
}
