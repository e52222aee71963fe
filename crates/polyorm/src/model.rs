//! Model metadata: tables, fields, keys, indexes and sequences.
//!
//! A [`ModelDefinition`] is computed once per data type and shared read-only by every
//! statement that targets it. Types expose theirs through the [`Model`] trait:
//!
//! ```ignore
//! use polyorm::model::{FieldDefinition, Model, ModelDefinition};
//! use polyorm::types::DbType;
//! use polyorm::Value;
//! use std::sync::LazyLock;
//!
//! struct User { id: i64, name: String }
//!
//! static USER: LazyLock<ModelDefinition> = LazyLock::new(|| {
//!     ModelDefinition::new("User")
//!         .field(FieldDefinition::new("id", DbType::Int64).primary_key().auto_increment())
//!         .field(FieldDefinition::new("name", DbType::String).length(100))
//! });
//!
//! impl Model for User {
//!     fn model_definition() -> &'static ModelDefinition { &USER }
//!     fn field_value(&self, field: &str) -> Option<Value> {
//!         match field {
//!             "id" => Some(self.id.into()),
//!             "name" => Some(self.name.as_str().into()),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::validate_identifier;
use crate::types::DbType;
use crate::value::Value;
use std::collections::HashSet;

/// Default clause of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Rendered as a dialect literal (`'text'`, `42`, `true`).
    Literal(Value),
    /// Inserted verbatim, e.g. `now()` or `CURRENT_TIMESTAMP`.
    Expression(String),
}

/// One column of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    /// Physical column name when it differs from `name`; bypasses the naming strategy.
    pub alias: Option<String>,
    pub db_type: DbType,
    pub nullable: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<DefaultValue>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub is_indexed: bool,
    pub is_unique: bool,
    pub sequence: Option<String>,
}

impl FieldDefinition {
    /// A non-null column with no key flags.
    pub fn new(name: impl Into<String>, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            db_type,
            nullable: false,
            length: None,
            precision: None,
            scale: None,
            default: None,
            is_primary_key: false,
            is_auto_increment: false,
            is_indexed: false,
            is_unique: false,
            sequence: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_indexed = true;
        self.is_unique = true;
        self
    }

    pub fn sequence(mut self, name: impl Into<String>) -> Self {
        self.sequence = Some(name.into());
        self
    }

    /// Whether the field is written by INSERT/UPDATE.
    pub fn is_writable(&self) -> bool {
        !self.is_auto_increment
    }
}

/// A composite index declared on the model.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Explicit index name; generated from the table and columns when absent.
    pub name: Option<String>,
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Metadata of one table-backed type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    /// Logical model name, mapped through the naming strategy.
    pub name: String,
    /// Physical table name when it differs from `name`.
    pub alias: Option<String>,
    pub schema: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub indexes: Vec<IndexDefinition>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            schema: None,
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn is_in_schema(&self) -> bool {
        self.schema.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Look up a field by logical name, then by column alias.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.alias.as_deref() == Some(name)))
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_primary_key)
    }

    pub fn auto_increment_field(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.is_auto_increment)
    }

    /// Distinct sequence names in field order.
    pub fn sequences(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .filter_map(|f| f.sequence.as_deref())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Check structural invariants.
    ///
    /// - at least one field, unique field names, quotable identifiers
    /// - at most one auto-increment field, and it must be the sole primary key
    /// - composite indexes reference declared fields
    pub fn validate(&self) -> OrmResult<()> {
        validate_identifier(&self.name)?;
        if let Some(alias) = &self.alias {
            validate_identifier(alias)?;
        }
        if self.fields.is_empty() {
            return Err(OrmError::validation(format!(
                "Model '{}' declares no fields",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for f in &self.fields {
            validate_identifier(&f.name)?;
            if let Some(alias) = &f.alias {
                validate_identifier(alias)?;
            }
            if !names.insert(f.name.as_str()) {
                return Err(OrmError::validation(format!(
                    "Duplicate field '{}' in model '{}'",
                    f.name, self.name
                )));
            }
        }

        let auto: Vec<&FieldDefinition> = self.fields.iter().filter(|f| f.is_auto_increment).collect();
        if auto.len() > 1 {
            return Err(OrmError::validation(format!(
                "Model '{}' declares {} auto-increment fields, at most one is allowed",
                self.name,
                auto.len()
            )));
        }
        if let Some(f) = auto.iter().find(|f| !f.is_primary_key) {
            return Err(OrmError::validation(format!(
                "Auto-increment field '{}' must be the primary key",
                f.name
            )));
        }
        if let Some(f) = auto.first() {
            if self.primary_keys().count() > 1 {
                return Err(OrmError::validation(format!(
                    "Auto-increment field '{}' must be the only primary key of model '{}'",
                    f.name, self.name
                )));
            }
        }

        for index in &self.indexes {
            if index.fields.is_empty() {
                return Err(OrmError::validation("Index must list at least one field"));
            }
            if let Some(missing) = index.fields.iter().find(|n| self.get_field(n).is_none()) {
                return Err(OrmError::validation(format!(
                    "Index references unknown field '{missing}'"
                )));
            }
        }
        Ok(())
    }
}

/// A type whose instances map to rows of one table.
pub trait Model {
    fn model_definition() -> &'static ModelDefinition;

    /// Value of a field by logical name; `None` for unknown fields.
    fn field_value(&self, field: &str) -> Option<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> ModelDefinition {
        ModelDefinition::new("Order")
            .schema("sales")
            .field(FieldDefinition::new("id", DbType::Int64).primary_key().auto_increment())
            .field(FieldDefinition::new("number", DbType::String).length(20).alias("order_no"))
            .field(FieldDefinition::new("ref", DbType::Int64).sequence("order_ref_seq"))
            .field(FieldDefinition::new("batch", DbType::Int64).sequence("order_ref_seq"))
    }

    #[test]
    fn valid_model() {
        let def = order();
        def.validate().unwrap();
        assert!(def.is_in_schema());
        assert_eq!(def.auto_increment_field().map(|f| f.name.as_str()), Some("id"));
        assert_eq!(def.sequences(), vec!["order_ref_seq"]);
        assert_eq!(def.get_field("order_no").map(|f| f.name.as_str()), Some("number"));
    }

    #[test]
    fn auto_increment_must_be_primary_key() {
        let def = ModelDefinition::new("T").field(FieldDefinition::new("n", DbType::Int32).auto_increment());
        assert!(def.validate().is_err());
    }

    #[test]
    fn at_most_one_auto_increment() {
        let def = ModelDefinition::new("T")
            .field(FieldDefinition::new("a", DbType::Int32).primary_key().auto_increment())
            .field(FieldDefinition::new("b", DbType::Int32).primary_key().auto_increment());
        assert!(def.validate().is_err());
    }

    #[test]
    fn duplicate_fields_and_bad_indexes() {
        let dup = ModelDefinition::new("T")
            .field(FieldDefinition::new("a", DbType::Int32))
            .field(FieldDefinition::new("a", DbType::Int32));
        assert!(dup.validate().is_err());

        let idx = ModelDefinition::new("T")
            .field(FieldDefinition::new("a", DbType::Int32))
            .index(IndexDefinition::new(["missing"]));
        assert!(idx.validate().is_err());
    }
}
