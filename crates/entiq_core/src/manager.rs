//! Mutation-context state machine.

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Gateway to a store, gating every write behind an explicit mutation
/// context.
///
/// A manager owns the single piece of shared mutable state in the core: a
/// process-wide (per manager instance) `mutating` flag. The flag is raised
/// while a [`Manager::mutate`] or [`Manager::transaction`] callback runs
/// and reset on every exit path — success, modeled failure or panic — by a
/// guard, never by per-branch resets. Repositories observe the same flag
/// through a shared handle, so one created before a context opens still
/// respects it.
///
/// Contexts never nest; concurrent use of one manager from several threads
/// is out of contract (use one manager per worker).
pub struct Manager<S> {
    store: Arc<S>,
    mutating: Arc<AtomicBool>,
}

impl<S> Clone for Manager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mutating: self.mutating.clone(),
        }
    }
}

impl<S: Store> Manager<S> {
    /// Creates a manager over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            mutating: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mints a repository for entities of type `T`.
    pub fn repository<T: Entity>(&self) -> Repository<T, S> {
        Repository::new(
            self.store.clone(),
            MutationGate {
                flag: self.mutating.clone(),
            },
        )
    }

    /// Runs `unit` inside a mutation context.
    ///
    /// The callback reports through its own error channel: on `Ok` the
    /// staged unit of work is flushed; on `Err` the session is closed and
    /// the value is handed back unchanged as `Ok(Err(..))`. The outer
    /// `Result` carries protocol violations
    /// ([`Error::NestedMutationNotSupported`]) and store faults, which
    /// close the session and are re-raised unchanged. A panic in the
    /// callback closes the session, resets the flag and resumes unwinding.
    pub fn mutate<V, E>(
        &self,
        unit: impl FnOnce(&Self) -> std::result::Result<V, E>,
    ) -> Result<std::result::Result<V, E>> {
        let _guard = self.enter(UnwindAction::Close)?;
        tracing::debug!("mutation context opened");

        match unit(self) {
            Ok(value) => {
                if let Err(fault) = self.store.flush() {
                    self.store.close();
                    return Err(fault);
                }
                tracing::debug!("mutation context flushed");
                Ok(Ok(value))
            }
            Err(error) => {
                tracing::debug!("mutation context failed, closing session");
                self.store.close();
                Ok(Err(error))
            }
        }
    }

    /// Runs `unit` inside a mutation context wrapped in a store
    /// transaction.
    ///
    /// The callback also receives a [`Flush`] capability for interim
    /// flush-and-clear; entities flushed inside the open transaction
    /// remain rollback-able. On `Ok` the unit of work is flushed and the
    /// transaction committed; on `Err` or panic it is rolled back. The
    /// channel split is the same as [`Manager::mutate`].
    pub fn transaction<V, E>(
        &self,
        unit: impl FnOnce(&Self, &Flush<'_, S>) -> std::result::Result<V, E>,
    ) -> Result<std::result::Result<V, E>> {
        let _guard = self.enter(UnwindAction::Rollback)?;
        self.store.begin_transaction()?;
        tracing::debug!("transaction opened");

        let flush = Flush {
            store: &*self.store,
        };
        match unit(self, &flush) {
            Ok(value) => match self.store.flush().and_then(|()| self.store.commit()) {
                Ok(()) => {
                    tracing::debug!("transaction committed");
                    Ok(Ok(value))
                }
                Err(fault) => {
                    let _ = self.store.rollback();
                    Err(fault)
                }
            },
            Err(error) => {
                tracing::debug!("transaction failed, rolling back");
                self.store.rollback()?;
                Ok(Err(error))
            }
        }
    }

    fn enter(&self, on_unwind: UnwindAction) -> Result<ContextGuard<'_, S>> {
        if self
            .mutating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::NestedMutationNotSupported);
        }

        Ok(ContextGuard {
            flag: &self.mutating,
            store: &*self.store,
            on_unwind,
        })
    }
}

/// Interim flush capability handed to [`Manager::transaction`] callbacks.
pub struct Flush<'a, S> {
    store: &'a S,
}

impl<S: Store> Flush<'_, S> {
    /// Flushes the staged unit of work and clears the session.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()?;
        self.store.clear();
        Ok(())
    }
}

/// Read-only view of a manager's mutation flag.
///
/// The manager owns the flag; repositories hold this non-owning handle so
/// the flag can never go stale when a repository outlives a single
/// mutation block.
#[derive(Clone)]
pub struct MutationGate {
    flag: Arc<AtomicBool>,
}

impl MutationGate {
    /// `true` while a mutation context is open.
    #[must_use]
    pub fn active(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

enum UnwindAction {
    Close,
    Rollback,
}

/// Resets the mutation flag on every exit path; on unwind, also puts the
/// session back into a safe state before the panic resumes.
struct ContextGuard<'a, S: Store> {
    flag: &'a AtomicBool,
    store: &'a S,
    on_unwind: UnwindAction,
}

impl<S: Store> Drop for ContextGuard<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            match self.on_unwind {
                UnwindAction::Close => self.store.close(),
                UnwindAction::Rollback => {
                    let _ = self.store.rollback();
                }
            }
        }
        self.flag.store(false, Ordering::SeqCst);
    }
}
