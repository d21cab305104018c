//! # entiq memstore
//!
//! In-memory implementation of the entiq store capability.
//!
//! [`MemoryStore`] keeps entities in typed buckets behind a session with a
//! staged unit of work: `persist`/`remove` stage changes that become
//! visible on `flush`, and `begin_transaction`/`commit`/`rollback` snapshot
//! and restore the committed state. It is a capability-poor store — its
//! repositories answer criteria queries and expose no query executor — so
//! fetching routes through the flat criteria path.
//!
//! The crate exists for integration tests and for applications that want
//! the repository discipline without a relational backend.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod repository;
mod store;

pub use repository::MemoryRepository;
pub use store::MemoryStore;
