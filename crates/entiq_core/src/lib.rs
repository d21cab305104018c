//! # entiq core
//!
//! Specification-driven persistence over a relational store.
//!
//! Application code describes *what* entities to fetch as composable
//! [`Specification`]s; the core decides *how*: it compiles them to the
//! store's native query form (or a flat criteria map for stores without a
//! query capability), defers execution behind an immutable [`Sequence`]
//! that hits the store exactly once, and gates every write behind an
//! explicit mutation context owned by the [`Manager`].
//!
//! ```rust,ignore
//! let manager = Manager::new(store);
//! let users = manager.repository::<User>();
//!
//! let admins = users
//!     .matching(Comparator::new("role", Sign::Equality, "admin").into())
//!     .sort("username", Direction::Ascending)
//!     .take(10)
//!     .fetch()?;
//!
//! manager.mutate(|_| users.add(User::new("alice")))?;
//! ```
//!
//! The store itself is out of scope: everything the core needs from it is
//! expressed as the narrow capabilities in [`store`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod entity;
pub mod error;
pub mod id;
pub mod manager;
pub mod matching;
pub mod query;
pub mod repository;
pub mod sequence;
pub mod specification;
pub mod store;
pub mod value;

pub use entity::Entity;
pub use error::{Error, Result};
pub use id::Id;
pub use manager::{Flush, Manager, MutationGate};
pub use matching::Matching;
pub use query::{CompOp, Direction, Expr, Join, QueryBuilder, Selection};
pub use repository::Repository;
pub use sequence::Sequence;
pub use specification::{
    to_criteria, Child, Comparator, Composite, Operator, Sign, Specification, ToQueryBuilder,
};
pub use store::{
    Criteria, FieldType, ObjectRepository, QueryExecutor, SchemaMetadata, Session, SortKey, Store,
};
pub use value::Value;
