//! Collection catalog.
//!
//! The catalog is the single source of truth for which fields a collection
//! declares, which of them hold composite values (stored as JSON text by the
//! relational backend) and which hold booleans (stored as 0/1). The lists are
//! explicit configuration, checked by [`Catalog::validate`] before any
//! adapter uses them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::db::{DbError, DbResult};

/// Fields every collection carries implicitly.
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Storage type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub field: String,
    #[serde(default)]
    pub unique: bool,
}

/// A foreign record reachable from a local field holding its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub field: String,
    pub collection: String,
}

/// Declared shape of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub composite_fields: Vec<String>,
    #[serde(default)]
    pub boolean_fields: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            composite_fields: Vec::new(),
            boolean_fields: Vec::new(),
            indexes: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, ty: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            ty,
        });
        self
    }

    pub fn text(self, name: &str) -> Self {
        self.column(name, ColumnType::Text)
    }

    pub fn integer(self, name: &str) -> Self {
        self.column(name, ColumnType::Integer)
    }

    pub fn real(self, name: &str) -> Self {
        self.column(name, ColumnType::Real)
    }

    pub fn composites(mut self, fields: &[&str]) -> Self {
        self.composite_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn booleans(mut self, fields: &[&str]) -> Self {
        self.boolean_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn index(mut self, field: &str) -> Self {
        self.indexes.push(Index {
            field: field.to_string(),
            unique: false,
        });
        self
    }

    pub fn unique(mut self, field: &str) -> Self {
        self.indexes.push(Index {
            field: field.to_string(),
            unique: true,
        });
        self
    }

    pub fn relation(mut self, name: &str, field: &str, collection: &str) -> Self {
        self.relations.push(Relation {
            name: name.to_string(),
            field: field.to_string(),
            collection: collection.to_string(),
        });
        self
    }

    pub fn column_type(&self, field: &str) -> Option<ColumnType> {
        if RESERVED_FIELDS.contains(&field) {
            return Some(ColumnType::Text);
        }
        self.columns.iter().find(|c| c.name == field).map(|c| c.ty)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.column_type(field).is_some()
    }

    pub fn is_composite(&self, field: &str) -> bool {
        self.composite_fields.iter().any(|f| f == field)
    }

    pub fn is_boolean(&self, field: &str) -> bool {
        self.boolean_fields.iter().any(|f| f == field)
    }

    pub fn relation_named(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Check that a field may be used in a filter or sort.
    pub(crate) fn check_query_field(&self, field: &str) -> DbResult<()> {
        if !is_identifier(field) || !self.has_field(field) {
            return Err(DbError::translation(format!(
                "unknown field '{}' in collection '{}'",
                field, self.name
            )));
        }
        Ok(())
    }

    /// Check that a value may be written to a non-reserved field.
    ///
    /// Booleans only go to declared boolean fields, nested objects or
    /// sequences only go to declared composite fields, and scalars must
    /// match the declared column type. SQLite would otherwise coerce a
    /// mismatched scalar to the column affinity while SurrealDB keeps it.
    pub(crate) fn check_write(&self, field: &str, value: &Value) -> DbResult<()> {
        let Some(ty) = self.column_type(field) else {
            return Err(DbError::invalid(
                format!("unknown field '{}' in collection '{}'", field, self.name),
                "declare the field in the collection catalog",
            ));
        };
        let ok = match value {
            Value::Null => true,
            Value::Bool(_) => self.is_boolean(field),
            _ if self.is_boolean(field) => false,
            Value::Array(_) | Value::Object(_) => self.is_composite(field),
            Value::String(_) => ty == ColumnType::Text,
            Value::Number(n) => match ty {
                ColumnType::Integer => n.is_i64() || n.is_u64(),
                ColumnType::Real => true,
                ColumnType::Text => false,
            },
        };
        if !ok {
            return Err(DbError::invalid(
                format!(
                    "field '{}' in collection '{}' ({}) cannot hold {}",
                    field,
                    self.name,
                    ty.sql().to_ascii_lowercase(),
                    kind_of(value)
                ),
                "match the declared column type, or list the field under composite_fields or boolean_fields",
            ));
        }
        Ok(())
    }

    fn validate(&self, catalog: &Catalog) -> DbResult<()> {
        let fail = |message: String| Err(DbError::Schema { message });

        if !is_identifier(&self.name) {
            return fail(format!("invalid collection name '{}'", self.name));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if !is_identifier(&column.name) {
                return fail(format!("invalid column '{}.{}'", self.name, column.name));
            }
            if RESERVED_FIELDS.contains(&column.name.as_str()) {
                return fail(format!(
                    "column '{}.{}' is reserved",
                    self.name, column.name
                ));
            }
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return fail(format!("duplicate column '{}.{}'", self.name, column.name));
            }
        }
        for field in &self.composite_fields {
            if self.column_type(field) != Some(ColumnType::Text)
                || RESERVED_FIELDS.contains(&field.as_str())
            {
                return fail(format!(
                    "composite field '{}.{}' must be a declared text column",
                    self.name, field
                ));
            }
            if self.is_boolean(field) {
                return fail(format!(
                    "field '{}.{}' is listed as both composite and boolean",
                    self.name, field
                ));
            }
        }
        for field in &self.boolean_fields {
            if self.column_type(field) != Some(ColumnType::Integer) {
                return fail(format!(
                    "boolean field '{}.{}' must be a declared integer column",
                    self.name, field
                ));
            }
        }
        for index in &self.indexes {
            if !self.has_field(&index.field) {
                return fail(format!(
                    "index on undeclared field '{}.{}'",
                    self.name, index.field
                ));
            }
        }
        for relation in &self.relations {
            if !self.has_field(&relation.field) {
                return fail(format!(
                    "relation '{}' uses undeclared field '{}.{}'",
                    relation.name, self.name, relation.field
                ));
            }
            if self.has_field(&relation.name) {
                return fail(format!(
                    "relation '{}' shadows a column of '{}'",
                    relation.name, self.name
                ));
            }
            if catalog.get(&relation.collection).is_none() {
                return fail(format!(
                    "relation '{}' targets unknown collection '{}'",
                    relation.name, relation.collection
                ));
            }
        }
        Ok(())
    }
}

/// The set of collections known to the storage layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    collections: BTreeMap<String, CollectionSchema>,
}

impl Catalog {
    pub fn new(schemas: impl IntoIterator<Item = CollectionSchema>) -> Self {
        Self {
            collections: schemas.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    pub fn from_yaml(yaml: &str) -> DbResult<Self> {
        let schemas: Vec<CollectionSchema> =
            serde_yaml::from_str(yaml).map_err(|e| DbError::Schema {
                message: format!("Failed to parse catalog: {}", e),
            })?;
        Ok(Self::new(schemas))
    }

    /// Collections backing the dealership site.
    pub fn builtin() -> Self {
        Self::new([
            CollectionSchema::new("users")
                .text("email")
                .text("passwordHash")
                .text("name")
                .text("role")
                .text("phone")
                .integer("isActive")
                .integer("emailVerified")
                .text("preferences")
                .composites(&["preferences"])
                .booleans(&["isActive", "emailVerified"])
                .unique("email"),
            CollectionSchema::new("sessions")
                .text("userId")
                .text("token")
                .text("expiresAt")
                .text("userAgent")
                .text("ipAddress")
                .integer("revoked")
                .booleans(&["revoked"])
                .unique("token")
                .index("userId")
                .relation("user", "userId", "users"),
            CollectionSchema::new("inquiries")
                .text("name")
                .text("email")
                .text("phone")
                .text("message")
                .text("carId")
                .text("status")
                .text("source")
                .text("preferredContact")
                .integer("contacted")
                .text("metadata")
                .composites(&["metadata"])
                .booleans(&["contacted"])
                .index("email")
                .index("status")
                .index("carId")
                .relation("car", "carId", "cars"),
            CollectionSchema::new("cars")
                .text("make")
                .text("model")
                .integer("year")
                .integer("price")
                .integer("mileage")
                .text("slug")
                .text("category")
                .text("status")
                .text("description")
                .text("fuelType")
                .text("transmission")
                .text("color")
                .text("images")
                .text("features")
                .text("specs")
                .integer("featured")
                .integer("available")
                .composites(&["images", "features", "specs"])
                .booleans(&["featured", "available"])
                .unique("slug")
                .index("category")
                .index("status"),
            CollectionSchema::new("testimonials")
                .text("name")
                .text("content")
                .integer("rating")
                .text("vehicle")
                .text("carId")
                .text("avatar")
                .integer("approved")
                .integer("featured")
                .booleans(&["approved", "featured"])
                .index("carId")
                .relation("car", "carId", "cars"),
            CollectionSchema::new("accessories")
                .text("name")
                .text("slug")
                .text("category")
                .text("description")
                .integer("price")
                .text("compatibleModels")
                .text("images")
                .integer("inStock")
                .composites(&["compatibleModels", "images"])
                .booleans(&["inStock"])
                .unique("slug")
                .index("category"),
            CollectionSchema::new("services")
                .text("name")
                .text("slug")
                .text("category")
                .text("description")
                .integer("priceFrom")
                .integer("durationMinutes")
                .text("highlights")
                .integer("active")
                .composites(&["highlights"])
                .booleans(&["active"])
                .unique("slug")
                .index("category"),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.get(name)
    }

    /// Look up a collection, failing for names outside the catalog.
    pub fn collection(&self, name: &str) -> DbResult<&CollectionSchema> {
        self.get(name).ok_or_else(|| {
            DbError::invalid(
                format!("unknown collection '{}'", name),
                "use one of the collections declared in the catalog",
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionSchema> {
        self.collections.values()
    }

    /// Check every collection's declared field lists for consistency.
    pub fn validate(&self) -> DbResult<()> {
        if self.collections.is_empty() {
            return Err(DbError::Schema {
                message: "catalog declares no collections".to_string(),
            });
        }
        for (key, schema) in &self.collections {
            if key != &schema.name {
                return Err(DbError::Schema {
                    message: format!("catalog key '{}' names collection '{}'", key, schema.name),
                });
            }
            schema.validate(self)?;
        }
        Ok(())
    }
}

/// Plain ASCII identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
