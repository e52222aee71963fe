//! DELETE statement builder.

use super::{BuilderCore, StatementModel, TableRef};
use crate::dialect::DialectProvider;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::fragment::{SqlCommand, SqlFragment};
use crate::model::{Model, ModelDefinition};

/// A compiled DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteModel {
    pub table: TableRef,
    pub filter: Option<SqlFragment>,
}

/// DELETE builder. Deleting every row needs an explicit [`allow_all`](DeleteStatement::allow_all).
#[derive(Debug)]
pub struct DeleteStatement<'a> {
    core: BuilderCore<'a>,
    allow_all: bool,
}

impl<'a> DeleteStatement<'a> {
    pub fn of<M: Model>(provider: &'a dyn DialectProvider) -> Self {
        Self::from_model(provider, M::model_definition())
    }

    pub fn from_model(provider: &'a dyn DialectProvider, def: &'a ModelDefinition) -> Self {
        Self {
            core: BuilderCore::for_model(provider, def),
            allow_all: false,
        }
    }

    pub fn from_table(provider: &'a dyn DialectProvider, table: &str, schema: Option<&str>) -> Self {
        Self {
            core: BuilderCore::for_table(provider, table, schema),
            allow_all: false,
        }
    }

    /// Target one instance by its primary key.
    pub fn instance<M: Model>(mut self, obj: &M) -> Self {
        if let Some(def) = self.core.check_model::<M>() {
            if let Some(filter) = self.core.record(self.core.primary_key_filter(def, obj)) {
                self.core.filters.push(filter);
            }
        }
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

    /// Allow a DELETE without any filter.
    pub fn allow_all(mut self) -> Self {
        self.allow_all = true;
        self
    }

    pub fn build(mut self) -> OrmResult<DeleteModel> {
        self.core.finish()?;
        let filter = self.core.combined_filter();
        if filter.is_none() && !self.allow_all {
            return Err(OrmError::validation(
                "DELETE without a filter; call allow_all() to delete every row",
            ));
        }
        Ok(DeleteModel {
            table: self.core.table,
            filter,
        })
    }

    pub fn render(self) -> OrmResult<SqlCommand> {
        let provider = self.core.provider;
        let model = self.build()?;
        provider.render_delete(&model)
    }

    pub fn into_model(self) -> OrmResult<StatementModel> {
        self.build().map(StatementModel::Delete)
    }
}
