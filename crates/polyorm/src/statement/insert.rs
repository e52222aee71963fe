//! INSERT statement builder.

use super::{BuilderCore, StatementModel, TableRef, writable_values};
use crate::dialect::DialectProvider;
use crate::error::{OrmError, OrmResult};
use crate::fragment::SqlCommand;
use crate::model::{Model, ModelDefinition};
use crate::value::Value;

/// A compiled single-row INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertModel {
    pub table: TableRef,
    /// Physical, unquoted column names.
    pub columns: Vec<String>,
    pub values: Vec<Value>,
    /// Physical name of the model's auto-increment column, if any.
    pub identity: Option<String>,
}

/// INSERT builder.
///
/// Auto-increment fields are never written; render with
/// [`DialectProvider::render_insert_with_identity`] to read the generated key back.
#[derive(Debug)]
pub struct InsertStatement<'a> {
    core: BuilderCore<'a>,
    /// (field, value) in declaration order.
    values: Vec<(String, Value)>,
    only: Option<Vec<String>>,
}

impl<'a> InsertStatement<'a> {
    fn with_core(core: BuilderCore<'a>) -> Self {
        Self {
            core,
            values: Vec::new(),
            only: None,
        }
    }

    pub fn of<M: Model>(provider: &'a dyn DialectProvider) -> Self {
        Self::from_model(provider, M::model_definition())
    }

    pub fn from_model(provider: &'a dyn DialectProvider, def: &'a ModelDefinition) -> Self {
        Self::with_core(BuilderCore::for_model(provider, def))
    }

    pub fn from_table(provider: &'a dyn DialectProvider, table: &str, schema: Option<&str>) -> Self {
        Self::with_core(BuilderCore::for_table(provider, table, schema))
    }

    /// Bind every writable field of `obj`.
    pub fn values<M: Model>(mut self, obj: &M) -> Self {
        if let Some(def) = self.core.check_model::<M>() {
            if let Some(values) = self.core.record(writable_values(def, obj)) {
                self.values = values;
            }
        }
        self
    }

    /// Set one column explicitly (overwrites a previously bound value).
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(def) = self.core.model {
            match def.get_field(field) {
                Some(f) if f.is_auto_increment => {
                    self.core.record::<()>(Err(OrmError::validation(format!(
                        "Field '{field}' is auto-increment and cannot be inserted"
                    ))));
                    return self;
                }
                Some(f) => {
                    let name = f.name.clone();
                    upsert(&mut self.values, name, value);
                    return self;
                }
                None => {
                    self.core.record::<()>(Err(OrmError::validation(format!(
                        "Unknown field '{}' on model '{}'",
                        field, def.name
                    ))));
                    return self;
                }
            }
        }
        upsert(&mut self.values, field.to_string(), value);
        self
    }

    /// Restrict the written columns to an allow-list of fields.
    pub fn only(mut self, fields: &[&str]) -> Self {
        self.only = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn build(mut self) -> OrmResult<InsertModel> {
        if let (Some(only), Some(def)) = (&self.only, self.core.model) {
            if let Some(unknown) = only.iter().find(|f| def.get_field(f).is_none()) {
                let err = OrmError::validation(format!(
                    "Unknown field '{}' on model '{}'",
                    unknown, def.name
                ));
                self.core.record::<()>(Err(err));
            }
        }
        self.core.finish()?;

        let identity = match self.core.model.and_then(|d| d.auto_increment_field()) {
            Some(f) => Some(self.core.column_name(&f.name)?),
            None => None,
        };
        let mut columns = Vec::with_capacity(self.values.len());
        let mut values = Vec::with_capacity(self.values.len());
        for (field, value) in self.values {
            if let Some(only) = &self.only {
                let allowed = only.iter().any(|o| {
                    *o == field
                        || self
                            .core
                            .model
                            .and_then(|d| d.get_field(o))
                            .is_some_and(|f| f.name == field)
                });
                if !allowed {
                    continue;
                }
            }
            columns.push(self.core.column_name(&field)?);
            values.push(value);
        }

        Ok(InsertModel {
            table: self.core.table,
            columns,
            values,
            identity,
        })
    }

    pub fn render(self) -> OrmResult<SqlCommand> {
        let provider = self.core.provider;
        let model = self.build()?;
        provider.render_insert(&model)
    }

    pub fn into_model(self) -> OrmResult<StatementModel> {
        self.build().map(StatementModel::Insert)
    }
}

fn upsert(values: &mut Vec<(String, Value)>, field: String, value: Value) {
    match values.iter_mut().find(|(f, _)| *f == field) {
        Some(slot) => slot.1 = value,
        None => values.push((field, value)),
    }
}
