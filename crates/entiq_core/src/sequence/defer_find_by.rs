//! Deferred criteria-path sequence.

use crate::error::Result;
use crate::query::Direction;
use crate::sequence::concrete::Concrete;
use crate::specification::{to_criteria, Specification};
use crate::store::{ObjectRepository, SortKey};
use parking_lot::Mutex;
use std::sync::Arc;

/// Accumulates fetch intent against a criteria-only repository and executes
/// `find_by` exactly once, on first demand.
///
/// All fields but the memo cell are immutable; configuration returns a new
/// instance with a fresh cell. Once the cell is filled, configuration
/// delegates to the materialized backing instead of re-accumulating, so a
/// stale intent can never re-issue the store call.
pub(crate) struct DeferFindBy<T> {
    repository: Arc<dyn ObjectRepository<T>>,
    specification: Specification,
    sort: Vec<SortKey>,
    to_drop: usize,
    to_take: Option<usize>,
    lazy: bool,
    fetched: Arc<Mutex<Option<Concrete<T>>>>,
}

impl<T> Clone for DeferFindBy<T> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            specification: self.specification.clone(),
            sort: self.sort.clone(),
            to_drop: self.to_drop,
            to_take: self.to_take,
            lazy: self.lazy,
            fetched: self.fetched.clone(),
        }
    }
}

impl<T: Clone + 'static> DeferFindBy<T> {
    pub(crate) fn new(
        repository: Arc<dyn ObjectRepository<T>>,
        specification: Specification,
        lazy: bool,
    ) -> Self {
        Self {
            repository,
            specification,
            sort: Vec::new(),
            to_drop: 0,
            to_take: None,
            lazy,
            fetched: Arc::new(Mutex::new(None)),
        }
    }

    /// The memoized backing, if the store call already happened.
    pub(crate) fn executed(&self) -> Option<Concrete<T>> {
        self.fetched.lock().clone()
    }

    /// Executes the accumulated intent exactly once and memoizes.
    ///
    /// A failed store call leaves the memo empty, so a later demand
    /// retries.
    pub(crate) fn execute(&self) -> Result<Concrete<T>> {
        let mut fetched = self.fetched.lock();
        if let Some(concrete) = &*fetched {
            return Ok(concrete.clone());
        }

        let criteria = to_criteria(&self.specification)?;
        tracing::debug!(
            drop = self.to_drop,
            take = ?self.to_take,
            "executing deferred find_by"
        );
        let entities = self.repository.find_by(
            &criteria,
            &self.sort,
            self.to_take,
            (self.to_drop != 0).then_some(self.to_drop),
        )?;

        let concrete = if self.lazy {
            Concrete::deferred(Box::new(entities.into_iter()))
        } else {
            Concrete::new(entities)
        };
        *fetched = Some(concrete.clone());

        Ok(concrete)
    }

    /// Additive drop; fresh memo.
    pub(crate) fn with_drop(&self, size: usize) -> Self {
        Self {
            repository: self.repository.clone(),
            specification: self.specification.clone(),
            sort: self.sort.clone(),
            to_drop: self.to_drop + size,
            to_take: self.to_take,
            lazy: self.lazy,
            fetched: Arc::new(Mutex::new(None)),
        }
    }

    /// Last-write-wins take; fresh memo.
    pub(crate) fn with_take(&self, size: usize) -> Self {
        Self {
            repository: self.repository.clone(),
            specification: self.specification.clone(),
            sort: self.sort.clone(),
            to_drop: self.to_drop,
            to_take: Some(size),
            lazy: self.lazy,
            fetched: Arc::new(Mutex::new(None)),
        }
    }

    /// Appends a sort key; fresh memo.
    pub(crate) fn with_sort(&self, property: &str, direction: Direction) -> Self {
        let mut sort = self.sort.clone();
        sort.push((property.to_owned(), direction));
        Self {
            repository: self.repository.clone(),
            specification: self.specification.clone(),
            sort,
            to_drop: self.to_drop,
            to_take: self.to_take,
            lazy: self.lazy,
            fetched: Arc::new(Mutex::new(None)),
        }
    }
}
