//! Materialized sequence backing.

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::query::Direction;
use crate::value::Value;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::Arc;

enum State<T> {
    /// Generator-backed source, drained once on first demand.
    Pending(Box<dyn Iterator<Item = T>>),
    /// Materialized elements.
    Ready(Arc<Vec<T>>),
}

/// In-memory sequence backing.
///
/// A `Concrete` is either eagerly materialized or backed by a single-pass
/// iterator that is drained exactly once, on first demand, into a memoized
/// vector. Every operation returns a new instance; the receiver is never
/// mutated. Clones share the backing, so draining happens once across all
/// clones of the same instance.
pub(crate) struct Concrete<T> {
    cell: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Concrete<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone> Concrete<T> {
    pub(crate) fn new(elements: Vec<T>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(State::Ready(Arc::new(elements)))),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn deferred(elements: Box<dyn Iterator<Item = T>>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(State::Pending(elements))),
        }
    }

    /// Materializes the backing, draining a pending generator exactly once.
    fn force(&self) -> Arc<Vec<T>> {
        let mut cell = self.cell.lock();
        let previous = std::mem::replace(&mut *cell, State::Ready(Arc::new(Vec::new())));
        let ready = match previous {
            State::Pending(elements) => Arc::new(elements.collect::<Vec<T>>()),
            State::Ready(elements) => elements,
        };
        *cell = State::Ready(ready.clone());
        ready
    }

    pub(crate) fn size(&self) -> usize {
        self.force().len()
    }

    pub(crate) fn drop_first(&self, size: usize) -> Self {
        Self::new(self.force().iter().skip(size).cloned().collect())
    }

    pub(crate) fn take_first(&self, size: usize) -> Self {
        Self::new(self.force().iter().take(size).cloned().collect())
    }

    pub(crate) fn filter(&self, predicate: impl Fn(&T) -> bool) -> Self {
        Self::new(
            self.force()
                .iter()
                .filter(|element| predicate(element))
                .cloned()
                .collect(),
        )
    }

    pub(crate) fn map<V: Clone>(&self, transform: impl Fn(&T) -> V) -> Concrete<V> {
        Concrete::new(self.force().iter().map(transform).collect())
    }

    pub(crate) fn foreach(&self, mut visitor: impl FnMut(&T)) {
        for element in self.force().iter() {
            visitor(element);
        }
    }

    pub(crate) fn contains(&self, element: &T) -> bool
    where
        T: PartialEq,
    {
        self.force().contains(element)
    }

    pub(crate) fn add(&self, element: T) -> Self {
        let mut elements = self.force().as_ref().clone();
        elements.push(element);
        Self::new(elements)
    }

    pub(crate) fn concat(&self, tail: &[T]) -> Self {
        let mut elements = self.force().as_ref().clone();
        elements.extend_from_slice(tail);
        Self::new(elements)
    }

    /// Sorts by the named property through the entity accessor.
    ///
    /// Elements without the property sort as null.
    pub(crate) fn sort(&self, property: &str, direction: Direction) -> Self
    where
        T: Entity,
    {
        self.sort_by(|a, b| {
            let left = a.property(property).unwrap_or(Value::Null);
            let right = b.property(property).unwrap_or(Value::Null);
            match direction {
                Direction::Ascending => left.compare(&right),
                Direction::Descending => left.compare(&right).reverse(),
            }
        })
    }

    pub(crate) fn sort_by(&self, compare: impl Fn(&T, &T) -> Ordering) -> Self {
        let mut elements = self.force().as_ref().clone();
        elements.sort_by(|a, b| compare(a, b));
        Self::new(elements)
    }

    pub(crate) fn reduce<C>(&self, initial: C, mut combiner: impl FnMut(C, &T) -> C) -> C {
        let mut accumulated = initial;
        for element in self.force().iter() {
            accumulated = combiner(accumulated, element);
        }
        accumulated
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.force().is_empty()
    }

    pub(crate) fn equals(&self, other: &[T]) -> bool
    where
        T: PartialEq,
    {
        self.force().as_slice() == other
    }

    pub(crate) fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<T> {
        self.force()
            .iter()
            .find(|element| predicate(element))
            .cloned()
            .ok_or(Error::NoElementMatchingPredicateFound)
    }

    pub(crate) fn to_vec(&self) -> Vec<T> {
        self.force().as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn deferred_source_is_drained_once() {
        let pulls = Rc::new(Cell::new(0u32));
        let counter = pulls.clone();
        let concrete = Concrete::deferred(Box::new((0..3).inspect(move |_| {
            counter.set(counter.get() + 1);
        })));

        assert_eq!(concrete.size(), 3);
        assert_eq!(concrete.size(), 3);
        assert_eq!(concrete.to_vec(), vec![0, 1, 2]);
        assert_eq!(pulls.get(), 3);
    }

    #[test]
    fn clones_share_the_drained_backing() {
        let pulls = Rc::new(Cell::new(0u32));
        let counter = pulls.clone();
        let concrete = Concrete::deferred(Box::new((0..3).inspect(move |_| {
            counter.set(counter.get() + 1);
        })));
        let clone = concrete.clone();

        assert_eq!(concrete.size(), 3);
        assert_eq!(clone.size(), 3);
        assert_eq!(pulls.get(), 3);
    }

    #[test]
    fn operations_do_not_mutate_the_receiver() {
        let concrete = Concrete::new(vec![1, 2, 3]);
        let _dropped = concrete.drop_first(2);
        let _added = concrete.add(4);
        assert_eq!(concrete.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn drop_and_take_slice_from_the_front() {
        let concrete = Concrete::new(vec![1, 2, 3, 4]);
        assert_eq!(concrete.drop_first(2).to_vec(), vec![3, 4]);
        assert_eq!(concrete.take_first(2).to_vec(), vec![1, 2]);
        assert_eq!(concrete.drop_first(10).to_vec(), Vec::<i32>::new());
    }

    #[test]
    fn reduce_folds_left_to_right() {
        let concrete = Concrete::new(vec!["a", "b", "c"]);
        let joined = concrete.reduce(String::new(), |mut acc, s| {
            acc.push_str(s);
            acc
        });
        assert_eq!(joined, "abc");
    }

    #[test]
    fn find_misses_with_the_sequence_contract_error() {
        let concrete = Concrete::new(vec![1, 2, 3]);
        assert!(matches!(
            concrete.find(|n| *n > 10),
            Err(Error::NoElementMatchingPredicateFound)
        ));
        assert_eq!(concrete.find(|n| *n > 1).unwrap(), 2);
    }
}
