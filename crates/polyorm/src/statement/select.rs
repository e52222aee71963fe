//! SELECT statement builder.

use super::{BuilderCore, StatementModel, TableRef, group};
use crate::dialect::DialectProvider;
use crate::error::OrmResult;
use crate::expr::{Expr, col};
use crate::fragment::{SqlCommand, SqlFragment};
use crate::model::{Model, ModelDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: SqlFragment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: SqlFragment,
    pub descending: bool,
}

/// A compiled SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectModel {
    pub table: TableRef,
    pub distinct: bool,
    /// Projection; empty means `*`.
    pub columns: Vec<SqlFragment>,
    pub joins: Vec<Join>,
    pub filter: Option<SqlFragment>,
    pub group_by: Vec<SqlFragment>,
    pub having: Option<SqlFragment>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// SELECT builder.
#[derive(Debug)]
pub struct SelectStatement<'a> {
    core: BuilderCore<'a>,
    distinct: bool,
    columns: Vec<SqlFragment>,
    joins: Vec<Join>,
    group_by: Vec<SqlFragment>,
    having: Vec<SqlFragment>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'a> SelectStatement<'a> {
    fn with_core(core: BuilderCore<'a>) -> Self {
        Self {
            core,
            distinct: false,
            columns: Vec::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Select from the table of model `M`.
    pub fn of<M: Model>(provider: &'a dyn DialectProvider) -> Self {
        Self::from_model(provider, M::model_definition())
    }

    pub fn from_model(provider: &'a dyn DialectProvider, def: &'a ModelDefinition) -> Self {
        Self::with_core(BuilderCore::for_model(provider, def))
    }

    /// Select from a table by name, without model metadata.
    pub fn from_table(provider: &'a dyn DialectProvider, table: &str, schema: Option<&str>) -> Self {
        Self::with_core(BuilderCore::for_table(provider, table, schema))
    }

    // ==================== projection ====================

    /// Replace the projection with the given expressions.
    pub fn select(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        let visitor = self.core.visitor();
        let compiled: OrmResult<Vec<SqlFragment>> = exprs.into_iter().map(|e| visitor.scalar(&e)).collect();
        if let Some(columns) = self.core.record(compiled) {
            self.columns = columns;
        }
        self
    }

    /// Replace the projection with plain fields.
    pub fn columns(self, fields: &[&str]) -> Self {
        self.select(fields.iter().map(|f| col(*f)))
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== filters ====================

    /// Add a WHERE condition (AND-combined with earlier ones).
    pub fn filter(mut self, expr: &Expr) -> Self {
        self.core.add_filter(expr);
        self
    }

    /// Add a WHERE condition written in the predicate mini-language.
    pub fn filter_str(mut self, predicate: &str) -> Self {
        self.core.add_filter_str(predicate);
        self
    }

    // ==================== joins ====================

    pub fn join(mut self, kind: JoinKind, table: &str, schema: Option<&str>, on: &Expr) -> Self {
        if let Some(fragment) = self.core.record(self.core.visitor().predicate(on)) {
            self.joins.push(Join {
                kind,
                table: TableRef::for_table(self.core.provider, table, schema),
                on: fragment,
            });
        }
        self
    }

    pub fn inner_join(self, table: &str, on: &Expr) -> Self {
        self.join(JoinKind::Inner, table, None, on)
    }

    pub fn left_join(self, table: &str, on: &Expr) -> Self {
        self.join(JoinKind::Left, table, None, on)
    }

    // ==================== grouping / ordering ====================

    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        let visitor = self.core.visitor();
        let compiled: OrmResult<Vec<SqlFragment>> = exprs.into_iter().map(|e| visitor.scalar(&e)).collect();
        if let Some(group_by) = self.core.record(compiled) {
            self.group_by = group_by;
        }
        self
    }

    /// Add a HAVING condition (AND-combined).
    pub fn having(mut self, expr: &Expr) -> Self {
        if let Some(f) = self.core.record(self.core.visitor().predicate(expr)) {
            self.having.push(group(expr, f));
        }
        self
    }

    pub fn order_by(self, expr: Expr) -> Self {
        self.push_order(expr, false)
    }

    pub fn order_by_desc(self, expr: Expr) -> Self {
        self.push_order(expr, true)
    }

    fn push_order(mut self, expr: Expr, descending: bool) -> Self {
        if let Some(f) = self.core.record(self.core.visitor().scalar(&expr)) {
            self.order_by.push(OrderBy { expr: f, descending });
        }
        self
    }

    // ==================== paging ====================

    /// Maximum number of rows; `0` is legal and yields no rows.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    // ==================== build ====================

    pub fn build(mut self) -> OrmResult<SelectModel> {
        self.core.finish()?;
        let filter = self.core.combined_filter();
        Ok(SelectModel {
            table: self.core.table,
            distinct: self.distinct,
            columns: self.columns,
            joins: self.joins,
            filter,
            group_by: self.group_by,
            having: super::and_all(self.having),
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        })
    }

    /// Build and render with the builder's provider.
    pub fn render(self) -> OrmResult<SqlCommand> {
        let provider = self.core.provider;
        let model = self.build()?;
        provider.render_select(&model)
    }

    pub fn into_model(self) -> OrmResult<StatementModel> {
        self.build().map(StatementModel::Select)
    }
}
