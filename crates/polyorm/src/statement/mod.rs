//! Statement models and their builders.
//!
//! Builders compile expressions eagerly against one [`DialectProvider`] and record the
//! first error; `build()` returns that error instead of a model, so no SQL is ever
//! rendered from a partially compiled statement. Filters and joins are additive, every
//! other setter overwrites its previous value.
//!
//! ```ignore
//! use polyorm::expr::col;
//! use polyorm::statement::SelectStatement;
//!
//! let cmd = SelectStatement::of::<User>(&provider)
//!     .filter(&col("age").gt(18).and(col("active").eq(true)))
//!     .limit(10)
//!     .render()?;
//! ```

mod create_table;
mod delete;
mod insert;
mod select;
mod update;

#[cfg(test)]
mod tests;

pub use create_table::{CreateTable, CreateTableModel, IndexModel};
pub use delete::{DeleteModel, DeleteStatement};
pub use insert::{InsertModel, InsertStatement};
pub use select::{Join, JoinKind, OrderBy, SelectModel, SelectStatement};
pub use update::{UpdateModel, UpdateStatement};

use crate::dialect::DialectProvider;
use crate::error::{OrmError, OrmResult, StatementKind};
use crate::expr::{Expr, ExprVisitor, Operator};
use crate::fragment::SqlFragment;
use crate::model::{Model, ModelDefinition};
use crate::value::Value;

/// Physical table name plus optional schema, both unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub schema: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>, schema: Option<&str>) -> Self {
        Self {
            name: name.into(),
            schema: schema.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    pub(crate) fn for_model(provider: &dyn DialectProvider, def: &ModelDefinition) -> Self {
        Self::new(provider.model_table_name(def), def.schema.as_deref())
    }

    pub(crate) fn for_table(provider: &dyn DialectProvider, table: &str, schema: Option<&str>) -> Self {
        Self::new(provider.naming().table_name(table), schema)
    }
}

/// A statement ready to be rendered by a dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementModel {
    Select(SelectModel),
    Insert(InsertModel),
    Update(UpdateModel),
    Delete(DeleteModel),
    CreateTable(CreateTableModel),
}

impl StatementModel {
    pub fn kind(&self) -> StatementKind {
        match self {
            StatementModel::Select(_) => StatementKind::Select,
            StatementModel::Insert(_) => StatementKind::Insert,
            StatementModel::Update(_) => StatementKind::Update,
            StatementModel::Delete(_) => StatementKind::Delete,
            StatementModel::CreateTable(_) => StatementKind::CreateTable,
        }
    }

    pub fn table(&self) -> &TableRef {
        match self {
            StatementModel::Select(m) => &m.table,
            StatementModel::Insert(m) => &m.table,
            StatementModel::Update(m) => &m.table,
            StatementModel::Delete(m) => &m.table,
            StatementModel::CreateTable(m) => &m.table,
        }
    }
}

/// Shared builder state: the target, the compile context and the first error.
#[derive(Debug)]
struct BuilderCore<'a> {
    provider: &'a dyn DialectProvider,
    model: Option<&'a ModelDefinition>,
    table: TableRef,
    filters: Vec<SqlFragment>,
    error: Option<OrmError>,
}

impl<'a> BuilderCore<'a> {
    fn for_model(provider: &'a dyn DialectProvider, def: &'a ModelDefinition) -> Self {
        let error = def.validate().err();
        Self {
            provider,
            model: Some(def),
            table: TableRef::for_model(provider, def),
            filters: Vec::new(),
            error,
        }
    }

    fn for_table(provider: &'a dyn DialectProvider, table: &str, schema: Option<&str>) -> Self {
        let error = crate::ident::validate_identifier(table).err();
        Self {
            provider,
            model: None,
            table: TableRef::for_table(provider, table, schema),
            filters: Vec::new(),
            error,
        }
    }

    fn visitor(&self) -> ExprVisitor<'a> {
        ExprVisitor::new(self.provider, self.model)
    }

    /// Keep the first error, drop later ones.
    fn record<T>(&mut self, result: OrmResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
                None
            }
        }
    }

    fn add_filter(&mut self, expr: &Expr) {
        if let Some(f) = self.record(self.visitor().predicate(expr)) {
            self.filters.push(group(expr, f));
        }
    }

    fn add_filter_str(&mut self, predicate: &str) {
        if let Some(expr) = self.record(Expr::parse(predicate)) {
            self.add_filter(&expr);
        }
    }

    /// Physical, unquoted column name of a field (or of a raw column without a model).
    fn column_name(&self, field: &str) -> OrmResult<String> {
        match self.model {
            Some(def) => {
                let f = def.get_field(field).ok_or_else(|| {
                    OrmError::validation(format!("Unknown field '{}' on model '{}'", field, def.name))
                })?;
                Ok(self.provider.field_column_name(f))
            }
            None => Ok(self.provider.naming().column_name(field)),
        }
    }

    /// `pk1 = ? AND pk2 = ?` from an instance's primary key values.
    fn primary_key_filter<M: Model>(&self, def: &ModelDefinition, obj: &M) -> OrmResult<SqlFragment> {
        let mut parts = Vec::new();
        for pk in def.primary_keys() {
            let value = obj.field_value(&pk.name).ok_or_else(|| missing_value(def, &pk.name))?;
            let mut f = SqlFragment::text(self.provider.quote_identifier(&self.provider.field_column_name(pk)));
            f.push_str(" = ");
            f.push_param(value);
            parts.push(f);
        }
        if parts.is_empty() {
            return Err(OrmError::validation(format!(
                "Model '{}' has no primary key",
                def.name
            )));
        }
        Ok(SqlFragment::join(parts, " AND "))
    }

    fn combined_filter(&self) -> Option<SqlFragment> {
        and_all(self.filters.clone())
    }

    fn check_model<M: Model>(&mut self) -> Option<&'a ModelDefinition> {
        let expected = M::model_definition();
        match self.model {
            Some(def) if std::ptr::eq(def, expected) || def == expected => Some(def),
            Some(def) => {
                let err = OrmError::validation(format!(
                    "Value of model '{}' bound to a statement for '{}'",
                    expected.name, def.name
                ));
                self.record::<()>(Err(err));
                None
            }
            None => {
                let err = OrmError::validation("Binding a model instance requires a model-backed statement");
                self.record::<()>(Err(err));
                None
            }
        }
    }

    fn finish(&mut self) -> OrmResult<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn missing_value(def: &ModelDefinition, field: &str) -> OrmError {
    OrmError::validation(format!(
        "Model '{}' returned no value for field '{}'",
        def.name, field
    ))
}

/// Every writable field value of an instance, in declaration order.
fn writable_values<M: Model>(def: &ModelDefinition, obj: &M) -> OrmResult<Vec<(String, Value)>> {
    def.fields
        .iter()
        .filter(|f| f.is_writable())
        .map(|f| {
            obj.field_value(&f.name)
                .map(|v| (f.name.clone(), v))
                .ok_or_else(|| missing_value(def, &f.name))
        })
        .collect()
}

/// Parenthesize a top-level OR so it can be AND-combined with other filters.
fn group(expr: &Expr, fragment: SqlFragment) -> SqlFragment {
    match expr {
        Expr::Binary {
            op: Operator::OrElse | Operator::Or,
            ..
        } => fragment.wrap_parens(),
        _ => fragment,
    }
}

fn and_all(filters: Vec<SqlFragment>) -> Option<SqlFragment> {
    if filters.is_empty() {
        None
    } else {
        Some(SqlFragment::join(filters, " AND "))
    }
}
