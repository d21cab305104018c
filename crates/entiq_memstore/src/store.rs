//! The in-memory store.

use entiq_core::{Entity, Error, Id, ObjectRepository, Result, Session, Store};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::repository::MemoryRepository;

/// One typed bucket of committed entities, keyed by id string.
pub(crate) struct Bucket<T> {
    pub(crate) entities: BTreeMap<String, T>,
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }
}

/// Type-erased bucket storage.
trait AnyBucket: Any + Send + Sync {
    fn clone_box(&self) -> Box<dyn AnyBucket>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Entity> AnyBucket for Bucket<T> {
    fn clone_box(&self) -> Box<dyn AnyBucket> {
        Box::new(Self {
            entities: self.entities.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All committed entities, one bucket per entity type.
pub(crate) struct Buckets {
    map: HashMap<TypeId, Box<dyn AnyBucket>>,
}

impl Buckets {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub(crate) fn bucket<T: Entity>(&self) -> Option<&Bucket<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|bucket| bucket.as_any().downcast_ref::<Bucket<T>>())
    }

    fn bucket_mut<T: Entity>(&mut self) -> &mut Bucket<T> {
        let entry = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Bucket::<T>::default()));
        // the entry for this TypeId always holds a Bucket<T>
        entry
            .as_any_mut()
            .downcast_mut::<Bucket<T>>()
            .expect("bucket type mismatch")
    }
}

impl Clone for Buckets {
    fn clone(&self) -> Self {
        Self {
            map: self
                .map
                .iter()
                .map(|(type_id, bucket)| (*type_id, bucket.clone_box()))
                .collect(),
        }
    }
}

/// A staged write, applied to the committed buckets on flush.
trait PendingOp: Send + Sync {
    fn apply(&self, buckets: &mut Buckets);
}

struct PendingPersist<T> {
    entity: T,
}

impl<T: Entity> PendingOp for PendingPersist<T> {
    fn apply(&self, buckets: &mut Buckets) {
        buckets
            .bucket_mut::<T>()
            .entities
            .insert(self.entity.id().as_str().to_owned(), self.entity.clone());
    }
}

struct PendingRemove<T> {
    id: String,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> PendingOp for PendingRemove<T> {
    fn apply(&self, buckets: &mut Buckets) {
        buckets.bucket_mut::<T>().entities.remove(&self.id);
    }
}

pub(crate) struct State {
    pub(crate) buckets: Buckets,
    staged: Vec<Box<dyn PendingOp>>,
    tx_snapshot: Option<Buckets>,
}

pub(crate) struct StoreInner {
    pub(crate) state: RwLock<State>,
}

/// In-memory store with a staged unit of work and snapshot transactions.
///
/// `find` sees committed state only; staged writes become visible on
/// [`Session::flush`]. `close` discards the pending unit of work and
/// re-arms the session — a real driver would invalidate the connection,
/// but this store favors staying usable so a manager is never left wedged
/// after a failed mutation.
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(State {
                    buckets: Buckets::new(),
                    staged: Vec::new(),
                    tx_snapshot: None,
                }),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemoryStore {
    fn flush(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        let staged = std::mem::take(&mut state.staged);
        let applied = staged.len();
        for op in staged {
            op.apply(&mut state.buckets);
        }
        tracing::debug!(applied, "flushed unit of work");
        Ok(())
    }

    fn clear(&self) {
        self.inner.state.write().staged.clear();
    }

    fn close(&self) {
        let mut state = self.inner.state.write();
        state.staged.clear();
        state.tx_snapshot = None;
        tracing::debug!("session discarded");
    }

    fn begin_transaction(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        if state.tx_snapshot.is_some() {
            return Err(Error::store("transaction already open"));
        }
        state.tx_snapshot = Some(state.buckets.clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        state
            .tx_snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| Error::store("no open transaction"))
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        let snapshot = state
            .tx_snapshot
            .take()
            .ok_or_else(|| Error::store("no open transaction"))?;
        state.buckets = snapshot;
        state.staged.clear();
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

impl Store for MemoryStore {
    fn find<T: Entity>(&self, id: &Id<T>) -> Result<Option<T>> {
        Ok(self
            .inner
            .state
            .read()
            .buckets
            .bucket::<T>()
            .and_then(|bucket| bucket.entities.get(id.as_str()).cloned()))
    }

    fn persist<T: Entity>(&self, entity: T) -> Result<()> {
        self.inner
            .state
            .write()
            .staged
            .push(Box::new(PendingPersist { entity }));
        Ok(())
    }

    fn remove<T: Entity>(&self, entity: &T) -> Result<()> {
        self.inner.state.write().staged.push(Box::new(PendingRemove::<T> {
            id: entity.id().as_str().to_owned(),
            _marker: std::marker::PhantomData,
        }));
        Ok(())
    }

    fn repository<T: Entity>(&self) -> Arc<dyn ObjectRepository<T>> {
        Arc::new(MemoryRepository::<T>::new(self.inner.clone()))
    }
}
