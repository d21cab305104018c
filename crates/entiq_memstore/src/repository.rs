//! Criteria-based repository over the in-memory store.

use entiq_core::{
    Criteria, Direction, Entity, Error, ObjectRepository, QueryExecutor, Result, SortKey, Value,
};
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::store::StoreInner;

/// Read capability for one entity type.
///
/// Criteria are matched through the entity property accessor; an unknown
/// criteria key is a store fault, matching what a relational mapper would
/// do with an unrecognized field. Sorting is multi-key with the first key
/// primary; an unknown sort property orders as null.
pub struct MemoryRepository<T> {
    inner: Arc<StoreInner>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> MemoryRepository<T> {
    pub(crate) fn new(inner: Arc<StoreInner>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    fn committed(&self) -> Vec<T> {
        self.inner
            .state
            .read()
            .buckets
            .bucket::<T>()
            .map(|bucket| bucket.entities.values().cloned().collect())
            .unwrap_or_default()
    }

    fn matches(entity: &T, criteria: &Criteria) -> Result<bool> {
        for (property, expected) in criteria {
            let actual = entity.property(property).ok_or_else(|| {
                Error::store(format!(
                    "unrecognized field '{property}' on entity '{}'",
                    T::entity_name()
                ))
            })?;
            if actual != *expected {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn compare(entity: &T, other: &T, sort: &[SortKey]) -> Ordering {
        for (property, direction) in sort {
            let left = entity.property(property).unwrap_or(Value::Null);
            let right = other.property(property).unwrap_or(Value::Null);
            let ordering = match direction {
                Direction::Ascending => left.compare(&right),
                Direction::Descending => left.compare(&right).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl<T: Entity> ObjectRepository<T> for MemoryRepository<T> {
    fn find_all(&self) -> Result<Vec<T>> {
        Ok(self.committed())
    }

    fn find_by(
        &self,
        criteria: &Criteria,
        sort: &[SortKey],
        take: Option<usize>,
        drop: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut matched = Vec::new();
        for entity in self.committed() {
            if Self::matches(&entity, criteria)? {
                matched.push(entity);
            }
        }

        matched.sort_by(|a, b| Self::compare(a, b, sort));

        let offset = drop.unwrap_or(0);
        let limited: Vec<T> = match take {
            Some(limit) => matched.into_iter().skip(offset).take(limit).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };

        tracing::trace!(
            entity = T::entity_name(),
            results = limited.len(),
            "answered criteria query"
        );
        Ok(limited)
    }

    fn count_by(&self, criteria: &Criteria) -> Result<usize> {
        let mut count = 0;
        for entity in self.committed() {
            if Self::matches(&entity, criteria)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn query_executor(&self) -> Option<Arc<dyn QueryExecutor<T>>> {
        None
    }
}
