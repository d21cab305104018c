//! Specification algebra.
//!
//! A specification is a composable predicate describing which entities
//! match a query. The tree is pure data: composition (`and`/`or`/`not`)
//! always builds new nodes and performs no validation — each compiler
//! validates the subset it accepts when it consumes the tree.

mod to_array;
mod to_query_builder;

pub use to_array::to_criteria;
pub use to_query_builder::ToQueryBuilder;

use crate::value::Value;
use std::fmt;

/// Comparison sign of a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// `=`, with a null value special-cased to an `IS NULL` test.
    Equality,
    /// `<>`.
    Inequality,
    /// `<`.
    LessThan,
    /// `>`.
    MoreThan,
    /// `<=`.
    LessThanOrEqual,
    /// `>=`.
    MoreThanOrEqual,
    /// `IS NULL`; the comparator value is ignored.
    IsNull,
    /// `IS NOT NULL`; the comparator value is ignored.
    IsNotNull,
    /// `LIKE 'value%'`.
    StartsWith,
    /// `LIKE '%value'`.
    EndsWith,
    /// `LIKE '%value%'`.
    Contains,
    /// `IN (values)`.
    In,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equality => "equality",
            Self::Inequality => "inequality",
            Self::LessThan => "less than",
            Self::MoreThan => "more than",
            Self::LessThanOrEqual => "less than or equal",
            Self::MoreThanOrEqual => "more than or equal",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::Contains => "contains",
            Self::In => "in",
        };
        write!(f, "{name}")
    }
}

/// Boolean operator of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

/// Leaf predicate: property, sign, value.
///
/// `property` may be a plain field name or a `relation.field` path
/// referencing a joined entity's field.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparator {
    property: String,
    sign: Sign,
    value: Value,
}

impl Comparator {
    /// Builds a leaf predicate.
    pub fn new(property: impl Into<String>, sign: Sign, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            sign,
            value: value.into(),
        }
    }

    /// The property path.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// The comparison sign.
    #[must_use]
    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// The compared value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Conjunction with another specification.
    #[must_use]
    pub fn and(self, other: impl Into<Specification>) -> Specification {
        Specification::from(self).and(other)
    }

    /// Disjunction with another specification.
    #[must_use]
    pub fn or(self, other: impl Into<Specification>) -> Specification {
        Specification::from(self).or(other)
    }

    /// Negation.
    #[must_use]
    pub fn not(self) -> Specification {
        Specification::from(self).not()
    }
}

/// Binary boolean combination of two specifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    left: Specification,
    right: Specification,
    operator: Operator,
}

impl Composite {
    /// The left operand.
    #[must_use]
    pub fn left(&self) -> &Specification {
        &self.left
    }

    /// The right operand.
    #[must_use]
    pub fn right(&self) -> &Specification {
        &self.right
    }

    /// The boolean operator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }
}

/// Join-planning specialization.
///
/// `left` identifies a relation, join field and join value; the compiler
/// plans a dedicated join alias from that triple and compiles `right`
/// against the joined alias. This is what lets a caller express "a child
/// entity matching both X and Y" without it degenerating into "any child
/// matches X, and any child matches Y": each `Child` clause pins its own
/// alias, and identical triples share one.
///
/// Under the criteria compiler a `Child` degrades to a plain AND composite.
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    left: Comparator,
    right: Specification,
}

impl Child {
    /// Builds a child-join specification.
    pub fn new(left: Comparator, right: impl Into<Specification>) -> Specification {
        Specification::Child(Box::new(Self {
            left,
            right: right.into(),
        }))
    }

    /// The join-planning comparator.
    #[must_use]
    pub fn left(&self) -> &Comparator {
        &self.left
    }

    /// The condition applied to the joined alias.
    #[must_use]
    pub fn right(&self) -> &Specification {
        &self.right
    }
}

/// A composable predicate over entities.
///
/// The set of variants is closed; compilers match exhaustively, so adding
/// a node type is a compile-time event for every consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Specification {
    /// Leaf predicate.
    Comparator(Comparator),
    /// JSON-containment flavored leaf; compiled as `json_contains`
    /// regardless of the declared sign.
    JsonArray(Comparator),
    /// AND/OR combination.
    Composite(Box<Composite>),
    /// Negation.
    Not(Box<Specification>),
    /// Join-planning specialization.
    Child(Box<Child>),
}

impl Specification {
    /// Conjunction. Builds a new node; operands are never mutated.
    #[must_use]
    pub fn and(self, other: impl Into<Specification>) -> Self {
        Self::Composite(Box::new(Composite {
            left: self,
            right: other.into(),
            operator: Operator::And,
        }))
    }

    /// Disjunction. Builds a new node; operands are never mutated.
    #[must_use]
    pub fn or(self, other: impl Into<Specification>) -> Self {
        Self::Composite(Box::new(Composite {
            left: self,
            right: other.into(),
            operator: Operator::Or,
        }))
    }

    /// Negation. Builds a new node.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Builds a JSON-containment leaf: the value must be contained in the
    /// JSON document stored in `property`.
    pub fn json_contains(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::JsonArray(Comparator::new(property, Sign::Contains, value))
    }
}

impl From<Comparator> for Specification {
    fn from(comparator: Comparator) -> Self {
        Self::Comparator(comparator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username(value: &str) -> Comparator {
        Comparator::new("username", Sign::Equality, value)
    }

    #[test]
    fn and_builds_a_composite() {
        let spec = username("alice").and(username("bob"));
        match spec {
            Specification::Composite(composite) => {
                assert_eq!(composite.operator(), Operator::And);
                assert_eq!(
                    composite.left(),
                    &Specification::from(username("alice"))
                );
                assert_eq!(
                    composite.right(),
                    &Specification::from(username("bob"))
                );
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn or_builds_a_composite() {
        let spec = username("alice").or(username("bob"));
        match spec {
            Specification::Composite(composite) => {
                assert_eq!(composite.operator(), Operator::Or)
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn not_wraps_the_inner_specification() {
        let spec = username("alice").not();
        match spec {
            Specification::Not(inner) => {
                assert_eq!(*inner, Specification::from(username("alice")))
            }
            other => panic!("expected negation, got {other:?}"),
        }
    }

    #[test]
    fn composition_does_not_mutate_operands() {
        let leaf = username("alice");
        let _composed = leaf.clone().and(username("bob"));
        assert_eq!(leaf, username("alice"));
    }

    #[test]
    fn json_contains_fixes_the_sign() {
        match Specification::json_contains("roles", "admin") {
            Specification::JsonArray(comparator) => {
                assert_eq!(comparator.sign(), Sign::Contains);
                assert_eq!(comparator.property(), "roles");
            }
            other => panic!("expected json array, got {other:?}"),
        }
    }

    #[test]
    fn child_composes_like_any_specification() {
        let child = Child::new(
            Comparator::new("children.username", Sign::Equality, "bob"),
            Comparator::new("children.kind", Sign::Equality, 5),
        );
        let spec = child.clone().and(child);
        assert!(matches!(spec, Specification::Composite(_)));
    }
}
