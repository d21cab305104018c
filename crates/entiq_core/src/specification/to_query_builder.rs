//! Full specification compiler.
//!
//! Walks a specification tree in a single depth-first pass and emits the
//! store-native query form: LEFT JOINs for relation and child predicates,
//! a WHERE expression, and positionally bound parameters. Values are never
//! inlined into the query text.

use crate::error::{Error, Result};
use crate::query::{CompOp, Expr, QueryBuilder};
use crate::specification::{Comparator, Operator, Sign, Specification};
use crate::store::{FieldType, SchemaMetadata};
use crate::value::Value;

/// Compiles specifications against a target entity's schema.
pub struct ToQueryBuilder<'a> {
    entity: &'a str,
    metadata: &'a dyn SchemaMetadata,
}

impl<'a> ToQueryBuilder<'a> {
    /// Creates a compiler for the given root entity.
    pub fn new(entity: &'a str, metadata: &'a dyn SchemaMetadata) -> Self {
        Self { entity, metadata }
    }

    /// Compiles `specification` into `query`.
    ///
    /// Emission order: plain relation joins (first-discovery order,
    /// deduplicated by relation name), then child joins with their ON
    /// conditions (planning order; their parameters are numbered after the
    /// WHERE parameters, from the same counter), then the WHERE clause.
    pub fn compile(
        &self,
        query: QueryBuilder,
        specification: &Specification,
    ) -> Result<QueryBuilder> {
        let root_alias = query.alias().to_owned();
        let mut visitor = Visitor {
            entity: self.entity,
            metadata: self.metadata,
            root_alias: root_alias.clone(),
            qb: query,
            relations: Vec::new(),
            children: Vec::new(),
        };

        let expression = visitor.visit(specification, &Scope::Root)?;
        let Visitor {
            mut qb,
            relations,
            children,
            ..
        } = visitor;

        let mut joined: Vec<String> = Vec::new();
        for relation in relations {
            if !joined.contains(&relation) {
                qb.left_join(format!("{root_alias}.{relation}"), relation.clone());
                joined.push(relation);
            }
        }

        for (key, alias) in children {
            let position = qb.add_parameter(key.value);
            qb.left_join_with(
                format!("{root_alias}.{}", key.relation),
                alias.clone(),
                format!("{alias}.{} = ?{position}", key.field),
            );
        }

        qb.set_condition(expression);
        tracing::trace!(query = %qb, "compiled specification");

        Ok(qb)
    }
}

/// Where property paths of the node under visit resolve to.
enum Scope<'s> {
    /// Dotted paths join their relation against the root alias.
    Root,
    /// Dotted paths resolve to a pinned child-join alias.
    Joined(&'s str),
}

/// Join key of a child specification: identical keys share one alias.
#[derive(PartialEq)]
struct JoinKey {
    relation: String,
    field: String,
    value: Value,
}

struct Visitor<'a> {
    entity: &'a str,
    metadata: &'a dyn SchemaMetadata,
    root_alias: String,
    qb: QueryBuilder,
    relations: Vec<String>,
    children: Vec<(JoinKey, String)>,
}

impl Visitor<'_> {
    fn visit(&mut self, specification: &Specification, scope: &Scope<'_>) -> Result<Expr> {
        match specification {
            Specification::Child(child) => {
                let alias = self.plan_join(child.left())?;
                self.visit(child.right(), &Scope::Joined(alias.as_str()))
            }
            Specification::Comparator(comparator) => self.expression(comparator, scope, false),
            Specification::JsonArray(comparator) => self.expression(comparator, scope, true),
            Specification::Not(inner) => Ok(self.visit(inner, scope)?.negate()),
            Specification::Composite(composite) => {
                let left = self.visit(composite.left(), scope)?;
                let right = self.visit(composite.right(), scope)?;
                Ok(match composite.operator() {
                    Operator::And => left.and(right),
                    Operator::Or => left.or(right),
                })
            }
        }
    }

    fn expression(
        &mut self,
        comparator: &Comparator,
        scope: &Scope<'_>,
        json_array: bool,
    ) -> Result<Expr> {
        let (property, field, relation) = match comparator.property().split_once('.') {
            Some((relation, field)) => {
                let alias = match scope {
                    Scope::Root => {
                        self.relations.push(relation.to_owned());
                        relation.to_owned()
                    }
                    Scope::Joined(alias) => (*alias).to_owned(),
                };
                (
                    format!("{alias}.{field}"),
                    field.to_owned(),
                    Some(relation.to_owned()),
                )
            }
            None => (
                format!("{}.{}", self.root_alias, comparator.property()),
                comparator.property().to_owned(),
                None,
            ),
        };

        if json_array {
            return Ok(self.match_json(&property, comparator));
        }

        let property = self.decode_json(property, &field, relation.as_deref());

        // Backslash, underscore and percentage are pattern characters in a
        // LIKE condition; they are escaped first so the comparator value
        // matches literally, then the wildcards are added around it.
        Ok(match comparator.sign() {
            Sign::Equality if comparator.value().is_null() => Expr::IsNull(property),
            Sign::Equality => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::comparison(property, CompOp::Eq, placeholder)
            }
            Sign::Inequality => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::comparison(property, CompOp::Neq, placeholder)
            }
            Sign::LessThan => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::comparison(property, CompOp::Lt, placeholder)
            }
            Sign::MoreThan => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::comparison(property, CompOp::Gt, placeholder)
            }
            Sign::LessThanOrEqual => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::comparison(property, CompOp::Lte, placeholder)
            }
            Sign::MoreThanOrEqual => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::comparison(property, CompOp::Gte, placeholder)
            }
            Sign::IsNull => Expr::IsNull(property),
            Sign::IsNotNull => Expr::IsNotNull(property),
            Sign::StartsWith => {
                let pattern = format!("{}%", escape_like(&like_operand(comparator.value())));
                let placeholder = self.placeholder(Value::Str(pattern));
                Expr::like(property, placeholder)
            }
            Sign::EndsWith => {
                let pattern = format!("%{}", escape_like(&like_operand(comparator.value())));
                let placeholder = self.placeholder(Value::Str(pattern));
                Expr::like(property, placeholder)
            }
            Sign::Contains => {
                let pattern = format!("%{}%", escape_like(&like_operand(comparator.value())));
                let placeholder = self.placeholder(Value::Str(pattern));
                Expr::like(property, placeholder)
            }
            Sign::In => {
                let placeholder = self.placeholder(comparator.value().clone());
                Expr::in_values(property, placeholder)
            }
        })
    }

    /// Binds the next positional parameter and returns its placeholder.
    fn placeholder(&mut self, value: Value) -> String {
        let position = self.qb.add_parameter(value);
        format!("?{position}")
    }

    /// Wraps JSON-typed columns so the database reads a normalized
    /// top-level JSON value instead of the raw encoded column.
    fn decode_json(&self, property: String, field: &str, relation: Option<&str>) -> String {
        if self.field_type(field, relation) == Some(FieldType::Json) {
            format!("json_value({property}, '$')")
        } else {
            property
        }
    }

    fn field_type(&self, field: &str, relation: Option<&str>) -> Option<FieldType> {
        match relation {
            Some(relation) => {
                let target = self.metadata.association_target(self.entity, relation)?;
                self.metadata.field_type(&target, field)
            }
            None => self.metadata.field_type(self.entity, field),
        }
    }

    fn match_json(&mut self, property: &str, comparator: &Comparator) -> Expr {
        // json_contains expects the searched value to be json encoded,
        // otherwise the value will never be found
        let encoded = comparator.value().to_json().to_string();
        let placeholder = self.placeholder(Value::Str(encoded));

        Expr::eq(format!("json_contains({property}, {placeholder}, '$')"), "1")
    }

    fn plan_join(&mut self, comparator: &Comparator) -> Result<String> {
        let (relation, field) = comparator.property().split_once('.').ok_or_else(|| {
            Error::specification_not_supported(format!(
                "child join key '{}' has no relation path",
                comparator.property()
            ))
        })?;

        let key = JoinKey {
            relation: relation.to_owned(),
            field: field.to_owned(),
            value: comparator.value().clone(),
        };

        if let Some((_, alias)) = self.children.iter().find(|(existing, _)| *existing == key) {
            return Ok(alias.clone());
        }

        let alias = format!("{relation}{}", self.children.len());
        self.children.push((key, alias.clone()));

        Ok(alias)
    }
}

fn like_operand(value: &Value) -> String {
    match value {
        Value::Str(value) => value.clone(),
        other => other.to_string(),
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('_', "\\_")
        .replace('%', "\\%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::Child;

    struct TestMetadata;

    impl SchemaMetadata for TestMetadata {
        fn field_type(&self, entity: &str, field: &str) -> Option<FieldType> {
            match (entity, field) {
                ("user", "username") => Some(FieldType::Text),
                ("user", "registerIndex") => Some(FieldType::Integer),
                ("user", "roles") => Some(FieldType::Json),
                _ => None,
            }
        }

        fn association_target(&self, entity: &str, relation: &str) -> Option<String> {
            match (entity, relation) {
                ("user", "children") => Some("user".to_owned()),
                _ => None,
            }
        }
    }

    fn compile(specification: &Specification) -> QueryBuilder {
        ToQueryBuilder::new("user", &TestMetadata)
            .compile(QueryBuilder::new("user", "entity"), specification)
            .unwrap()
    }

    fn comparator(property: &str, sign: Sign, value: impl Into<Value>) -> Specification {
        Comparator::new(property, sign, value).into()
    }

    #[test]
    fn equality() {
        let qb = compile(&comparator("username", Sign::Equality, "alice"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username = ?1"
        );
        assert_eq!(qb.parameters(), &[Value::from("alice")]);
    }

    #[test]
    fn equality_with_null_value_becomes_is_null() {
        let qb = compile(&comparator("username", Sign::Equality, Value::Null));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username IS NULL"
        );
        assert!(qb.parameters().is_empty());
    }

    #[test]
    fn inequality() {
        let qb = compile(&comparator("username", Sign::Inequality, "alice"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username <> ?1"
        );
    }

    #[test]
    fn less_than() {
        let qb = compile(&comparator("registerIndex", Sign::LessThan, 42));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.registerIndex < ?1"
        );
        assert_eq!(qb.parameter(1), Some(&Value::from(42)));
    }

    #[test]
    fn more_than() {
        let qb = compile(&comparator("registerIndex", Sign::MoreThan, 42));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.registerIndex > ?1"
        );
    }

    #[test]
    fn less_than_or_equal() {
        let qb = compile(&comparator("registerIndex", Sign::LessThanOrEqual, 42));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.registerIndex <= ?1"
        );
    }

    #[test]
    fn more_than_or_equal() {
        let qb = compile(&comparator("registerIndex", Sign::MoreThanOrEqual, 42));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.registerIndex >= ?1"
        );
    }

    #[test]
    fn is_null() {
        let qb = compile(&comparator("username", Sign::IsNull, Value::Null));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username IS NULL"
        );
        assert!(qb.parameters().is_empty());
    }

    #[test]
    fn is_not_null() {
        let qb = compile(&comparator("username", Sign::IsNotNull, Value::Null));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username IS NOT NULL"
        );
    }

    #[test]
    fn starts_with() {
        let qb = compile(&comparator("username", Sign::StartsWith, "j"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username LIKE ?1"
        );
        assert_eq!(qb.parameter(1), Some(&Value::from("j%")));
    }

    #[test]
    fn starts_with_escapes_pattern_characters() {
        let qb = compile(&comparator("username", Sign::StartsWith, "10%_\\"));
        assert_eq!(qb.parameter(1), Some(&Value::from("10\\%\\_\\\\%")));
    }

    #[test]
    fn ends_with() {
        let qb = compile(&comparator("username", Sign::EndsWith, "n"));
        assert_eq!(qb.parameter(1), Some(&Value::from("%n")));
    }

    #[test]
    fn contains() {
        let qb = compile(&comparator("username", Sign::Contains, "oh"));
        assert_eq!(qb.parameter(1), Some(&Value::from("%oh%")));
    }

    #[test]
    fn in_membership() {
        let values = Value::List(vec![Value::from("alice"), Value::from("bob")]);
        let qb = compile(&comparator("username", Sign::In, values.clone()));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username IN (?1)"
        );
        assert_eq!(qb.parameter(1), Some(&values));
    }

    #[test]
    fn negation() {
        let qb = compile(&Comparator::new("username", Sign::Equality, "alice").not());
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE NOT(entity.username = ?1)"
        );
    }

    #[test]
    fn conjunction_numbers_parameters_left_to_right() {
        let spec = Comparator::new("username", Sign::Equality, "alice")
            .and(comparator("registerIndex", Sign::Inequality, 2));
        let qb = compile(&spec);
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             WHERE entity.username = ?1 AND entity.registerIndex <> ?2"
        );
        assert_eq!(qb.parameter(1), Some(&Value::from("alice")));
        assert_eq!(qb.parameter(2), Some(&Value::from(2)));
    }

    #[test]
    fn disjunction() {
        let spec = Comparator::new("username", Sign::Equality, "alice")
            .or(comparator("username", Sign::Equality, "bob"));
        let qb = compile(&spec);
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             WHERE entity.username = ?1 OR entity.username = ?2"
        );
    }

    #[test]
    fn nested_composite_is_parenthesized() {
        let spec = Comparator::new("username", Sign::Equality, "alice").and(
            Comparator::new("registerIndex", Sign::Inequality, 1)
                .or(comparator("registerIndex", Sign::Inequality, 2)),
        );
        let qb = compile(&spec);
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity WHERE entity.username = ?1 \
             AND (entity.registerIndex <> ?2 OR entity.registerIndex <> ?3)"
        );
    }

    #[test]
    fn dotted_property_joins_the_relation() {
        let qb = compile(&comparator("children.username", Sign::Equality, "bob"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             LEFT JOIN entity.children children \
             WHERE children.username = ?1"
        );
    }

    #[test]
    fn relation_joins_are_deduplicated() {
        let spec = Comparator::new("children.username", Sign::Equality, "bob")
            .and(comparator("children.registerIndex", Sign::MoreThan, 3));
        let qb = compile(&spec);
        assert_eq!(qb.joins().len(), 1);
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             LEFT JOIN entity.children children \
             WHERE children.username = ?1 AND children.registerIndex > ?2"
        );
    }

    #[test]
    fn child_pins_its_own_join_alias() {
        let spec = Child::new(
            Comparator::new("children.username", Sign::Equality, "bob"),
            comparator("children.registerIndex", Sign::Equality, 5),
        );
        let qb = compile(&spec);
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             LEFT JOIN entity.children children0 WITH children0.username = ?2 \
             WHERE children0.registerIndex = ?1"
        );
        // the ON parameter is numbered after the WHERE parameters
        assert_eq!(qb.parameter(1), Some(&Value::from(5)));
        assert_eq!(qb.parameter(2), Some(&Value::from("bob")));
    }

    #[test]
    fn identical_child_join_keys_share_one_alias() {
        let first = Child::new(
            Comparator::new("children.username", Sign::Equality, "bob"),
            comparator("children.registerIndex", Sign::Equality, 5),
        );
        let second = Child::new(
            Comparator::new("children.username", Sign::Equality, "bob"),
            comparator("children.registerIndex", Sign::Equality, 6),
        );
        let qb = compile(&first.and(second));
        assert_eq!(qb.joins().len(), 1);
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             LEFT JOIN entity.children children0 WITH children0.username = ?3 \
             WHERE children0.registerIndex = ?1 AND children0.registerIndex = ?2"
        );
    }

    #[test]
    fn distinct_child_join_keys_get_distinct_aliases() {
        let first = Child::new(
            Comparator::new("children.username", Sign::Equality, "bob"),
            comparator("children.registerIndex", Sign::Equality, 5),
        );
        let second = Child::new(
            Comparator::new("children.username", Sign::Equality, "jane"),
            comparator("children.registerIndex", Sign::Equality, 6),
        );
        let qb = compile(&first.and(second));
        assert_eq!(qb.joins().len(), 2);
        assert_eq!(qb.joins()[0].alias(), "children0");
        assert_eq!(qb.joins()[1].alias(), "children1");
    }

    #[test]
    fn json_typed_column_is_wrapped() {
        let qb = compile(&comparator("roles", Sign::Equality, "admin"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             WHERE json_value(entity.roles, '$') = ?1"
        );
    }

    #[test]
    fn json_typed_column_is_wrapped_through_a_relation() {
        let qb = compile(&comparator("children.roles", Sign::Equality, "admin"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             LEFT JOIN entity.children children \
             WHERE json_value(children.roles, '$') = ?1"
        );
    }

    #[test]
    fn json_containment_binds_the_encoded_value() {
        let qb = compile(&Specification::json_contains("roles", "admin"));
        assert_eq!(
            qb.to_string(),
            "SELECT entity FROM user entity \
             WHERE json_contains(entity.roles, ?1, '$') = 1"
        );
        assert_eq!(qb.parameter(1), Some(&Value::from("\"admin\"")));
    }

    #[test]
    fn child_without_a_relation_path_is_rejected() {
        let spec = Child::new(
            Comparator::new("username", Sign::Equality, "bob"),
            comparator("registerIndex", Sign::Equality, 5),
        );
        let compiled = ToQueryBuilder::new("user", &TestMetadata)
            .compile(QueryBuilder::new("user", "entity"), &spec);
        assert!(matches!(
            compiled,
            Err(Error::SpecificationNotSupported { .. })
        ));
    }
}
