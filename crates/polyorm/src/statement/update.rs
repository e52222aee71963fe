//! UPDATE statement builder.

use super::{BuilderCore, StatementModel, TableRef, writable_values};
use crate::dialect::DialectProvider;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::fragment::{SqlCommand, SqlFragment};
use crate::model::{Model, ModelDefinition};
use crate::value::Value;

/// A compiled UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateModel {
    pub table: TableRef,
    /// (physical column, value expression) pairs.
    pub set: Vec<(String, SqlFragment)>,
    pub filter: Option<SqlFragment>,
}

/// UPDATE builder.
///
/// Requires a filter, an instance (primary-key filter) or an explicit
/// [`allow_all`](UpdateStatement::allow_all); an empty SET list is rejected.
#[derive(Debug)]
pub struct UpdateStatement<'a> {
    core: BuilderCore<'a>,
    /// (field, value) in insertion order.
    set: Vec<(String, SqlFragment)>,
    only: Option<Vec<String>>,
    allow_all: bool,
}

impl<'a> UpdateStatement<'a> {
    fn with_core(core: BuilderCore<'a>) -> Self {
        Self {
            core,
            set: Vec::new(),
            only: None,
            allow_all: false,
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

    /// Write every non-key writable field of `obj` and target it by primary key.
    pub fn values<M: Model>(mut self, obj: &M) -> Self {
        let Some(def) = self.core.check_model::<M>() else {
            return self;
        };
        let Some(values) = self.core.record(writable_values(def, obj)) else {
            return self;
        };
        for (field, value) in values {
            let is_key = def.get_field(&field).is_some_and(|f| f.is_primary_key);
            if !is_key {
                put(&mut self.set, field, SqlFragment::param(value));
            }
        }
        if let Some(filter) = self.core.record(self.core.primary_key_filter(def, obj)) {
            self.core.filters.push(filter);
        }
        self
    }

    /// Set a field to a value.
    pub fn set(self, field: &str, value: impl Into<Value>) -> Self {
        self.set_fragment(field, Ok(SqlFragment::param(value.into())))
    }

    /// Set a field to an expression, e.g. `visits = visits + 1`.
    pub fn set_expr(self, field: &str, expr: &Expr) -> Self {
        let compiled = self.core.visitor().scalar(expr);
        self.set_fragment(field, compiled)
    }

    fn set_fragment(mut self, field: &str, fragment: OrmResult<SqlFragment>) -> Self {
        let checked = match self.core.model {
            Some(def) => match def.get_field(field) {
                Some(f) if f.is_auto_increment => Err(OrmError::validation(format!(
                    "Field '{field}' is auto-increment and cannot be updated"
                ))),
                Some(f) => Ok(f.name.clone()),
                None => Err(OrmError::validation(format!(
                    "Unknown field '{}' on model '{}'",
                    field, def.name
                ))),
            },
            None => Ok(field.to_string()),
        };
        if let Some((name, fragment)) = self.core.record(checked.and_then(|n| fragment.map(|f| (n, f)))) {
            put(&mut self.set, name, fragment);
        }
        self
    }

    /// Restrict the SET list to an allow-list of fields.
    pub fn only(mut self, fields: &[&str]) -> Self {
        self.only = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Add a WHERE condition (AND-combined).
    pub fn filter(mut self, expr: &Expr) -> Self {
        self.core.add_filter(expr);
        self
    }

    pub fn filter_str(mut self, predicate: &str) -> Self {
        self.core.add_filter_str(predicate);
        self
    }

    /// Allow an UPDATE without any filter.
    pub fn allow_all(mut self) -> Self {
        self.allow_all = true;
        self
    }

    pub fn build(mut self) -> OrmResult<UpdateModel> {
        self.core.finish()?;

        let mut set = Vec::with_capacity(self.set.len());
        for (field, fragment) in self.set {
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
            set.push((self.core.column_name(&field)?, fragment));
        }

        if set.is_empty() {
            return Err(OrmError::validation("UPDATE requires at least one SET column"));
        }
        let filter = self.core.combined_filter();
        if filter.is_none() && !self.allow_all {
            return Err(OrmError::validation(
                "UPDATE without a filter; call allow_all() to update every row",
            ));
        }

        Ok(UpdateModel {
            table: self.core.table,
            set,
            filter,
        })
    }

    pub fn render(self) -> OrmResult<SqlCommand> {
        let provider = self.core.provider;
        let model = self.build()?;
        provider.render_update(&model)
    }

    pub fn into_model(self) -> OrmResult<StatementModel> {
        self.build().map(StatementModel::Update)
    }
}

fn put(set: &mut Vec<(String, SqlFragment)>, field: String, fragment: SqlFragment) {
    match set.iter_mut().find(|(f, _)| *f == field) {
        Some(slot) => slot.1 = fragment,
        None => set.push((field, fragment)),
    }
}
