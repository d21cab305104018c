//! Query-builder value types.
//!
//! The query builder is the store-native query form the specification
//! compiler emits: a declarative description of selection, joins,
//! condition, bound parameters, ordering and paging. It carries no
//! execution logic — a capability-rich store executes it.

mod builder;
mod expr;

pub use builder::{Direction, Join, QueryBuilder, Selection};
pub use expr::{CompOp, Expr};
