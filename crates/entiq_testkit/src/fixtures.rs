//! Entity fixtures and schema metadata helpers.

use entiq_core::{Entity, FieldType, Id, SchemaMetadata, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Test user entity with a JSON-typed `roles` field.
///
/// The store-facing property names follow the mapped column names
/// (`registerIndex`, not `register_index`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: Id<User>,
    /// Login name.
    pub username: String,
    /// Registration order, used by sorting tests.
    pub register_index: i64,
    /// Role names, mapped as a JSON document column.
    pub roles: Vec<String>,
}

impl User {
    /// Creates a user with a fresh random id and no roles.
    #[must_use]
    pub fn new(username: &str, register_index: i64) -> Self {
        Self {
            id: Id::new(),
            username: username.to_owned(),
            register_index,
            roles: Vec::new(),
        }
    }

    /// Replaces the roles.
    #[must_use]
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|role| (*role).to_owned()).collect();
        self
    }
}

impl Entity for User {
    fn entity_name() -> &'static str {
        "user"
    }

    fn id(&self) -> Id<Self> {
        self.id.clone()
    }

    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::from(self.id.as_str())),
            "username" => Some(Value::from(self.username.clone())),
            "registerIndex" => Some(Value::from(self.register_index)),
            "roles" => Some(Value::Json(serde_json::json!(self.roles))),
            _ => None,
        }
    }
}

/// Map-backed schema metadata, built fluently.
///
/// ```rust
/// use entiq_core::FieldType;
/// use entiq_testkit::fixtures::MapMetadata;
///
/// let metadata = MapMetadata::new()
///     .field("user", "username", FieldType::Text)
///     .association("user", "children", "user");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapMetadata {
    fields: HashMap<(String, String), FieldType>,
    associations: HashMap<(String, String), String>,
}

impl MapMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field type.
    #[must_use]
    pub fn field(mut self, entity: &str, field: &str, field_type: FieldType) -> Self {
        self.fields
            .insert((entity.to_owned(), field.to_owned()), field_type);
        self
    }

    /// Declares an association target.
    #[must_use]
    pub fn association(mut self, entity: &str, relation: &str, target: &str) -> Self {
        self.associations
            .insert((entity.to_owned(), relation.to_owned()), target.to_owned());
        self
    }
}

impl SchemaMetadata for MapMetadata {
    fn field_type(&self, entity: &str, field: &str) -> Option<FieldType> {
        self.fields
            .get(&(entity.to_owned(), field.to_owned()))
            .copied()
    }

    fn association_target(&self, entity: &str, relation: &str) -> Option<String> {
        self.associations
            .get(&(entity.to_owned(), relation.to_owned()))
            .cloned()
    }
}

/// The metadata matching the [`User`] fixture: `roles` is a JSON column and
/// `children` is a self-referencing association.
#[must_use]
pub fn user_metadata() -> MapMetadata {
    MapMetadata::new()
        .field("user", "id", FieldType::Uuid)
        .field("user", "username", FieldType::Text)
        .field("user", "registerIndex", FieldType::Integer)
        .field("user", "roles", FieldType::Json)
        .association("user", "children", "user")
}
