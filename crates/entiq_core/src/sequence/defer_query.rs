//! Deferred compiled-query sequence.

use crate::error::Result;
use crate::query::{Direction, QueryBuilder};
use crate::sequence::concrete::Concrete;
use crate::store::{QueryExecutor, SortKey};
use parking_lot::Mutex;
use std::sync::Arc;

/// Accumulates fetch intent on top of a compiled query and executes it
/// exactly once, on first demand.
///
/// Sort keys are qualified with the query's root alias when accumulated,
/// since they are appended to the query's ORDER BY clause verbatim. The
/// memo cell follows the same fill-once discipline as the criteria path.
pub(crate) struct DeferQuery<T> {
    executor: Arc<dyn QueryExecutor<T>>,
    query: QueryBuilder,
    sort: Vec<SortKey>,
    to_drop: usize,
    to_take: Option<usize>,
    lazy: bool,
    fetched: Arc<Mutex<Option<Concrete<T>>>>,
}

impl<T> Clone for DeferQuery<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            query: self.query.clone(),
            sort: self.sort.clone(),
            to_drop: self.to_drop,
            to_take: self.to_take,
            lazy: self.lazy,
            fetched: self.fetched.clone(),
        }
    }
}

impl<T: Clone + 'static> DeferQuery<T> {
    pub(crate) fn new(
        executor: Arc<dyn QueryExecutor<T>>,
        query: QueryBuilder,
        lazy: bool,
    ) -> Self {
        Self {
            executor,
            query,
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
    pub(crate) fn execute(&self) -> Result<Concrete<T>> {
        let mut fetched = self.fetched.lock();
        if let Some(concrete) = &*fetched {
            return Ok(concrete.clone());
        }

        let mut query = self.query.clone();
        for (property, direction) in &self.sort {
            query.add_order_by(property.clone(), *direction);
        }
        if self.to_drop != 0 {
            query.set_first_result(self.to_drop);
        }
        if let Some(limit) = self.to_take {
            query.set_max_results(limit);
        }

        tracing::debug!(query = %query, lazy = self.lazy, "executing deferred query");
        let concrete = if self.lazy {
            Concrete::deferred(self.executor.stream(&query)?)
        } else {
            Concrete::new(self.executor.fetch(&query)?)
        };
        *fetched = Some(concrete.clone());

        Ok(concrete)
    }

    /// Additive drop; fresh memo.
    pub(crate) fn with_drop(&self, size: usize) -> Self {
        Self {
            executor: self.executor.clone(),
            query: self.query.clone(),
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
            executor: self.executor.clone(),
            query: self.query.clone(),
            sort: self.sort.clone(),
            to_drop: self.to_drop,
            to_take: Some(size),
            lazy: self.lazy,
            fetched: Arc::new(Mutex::new(None)),
        }
    }

    /// Appends a sort key qualified with the root alias; fresh memo.
    pub(crate) fn with_sort(&self, property: &str, direction: Direction) -> Self {
        let mut sort = self.sort.clone();
        sort.push((format!("{}.{property}", self.query.alias()), direction));
        Self {
            executor: self.executor.clone(),
            query: self.query.clone(),
            sort,
            to_drop: self.to_drop,
            to_take: self.to_take,
            lazy: self.lazy,
            fetched: Arc::new(Mutex::new(None)),
        }
    }
}
