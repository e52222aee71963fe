//! CREATE TABLE derived from model metadata.

use super::{BuilderCore, StatementModel, TableRef};
use crate::dialect::{CreateTableScript, DialectProvider};
use crate::error::OrmResult;
use crate::model::{FieldDefinition, Model, ModelDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexModel {
    pub name: String,
    /// Physical, unquoted column names.
    pub columns: Vec<String>,
    pub unique: bool,
}

/// A compiled CREATE TABLE with its secondary indexes and sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableModel {
    pub table: TableRef,
    pub columns: Vec<FieldDefinition>,
    /// Table-level key constraint; empty when the key is an inline auto-increment column.
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexModel>,
    pub sequences: Vec<String>,
}

/// CREATE TABLE builder.
#[derive(Debug)]
pub struct CreateTable<'a> {
    core: BuilderCore<'a>,
    def: &'a ModelDefinition,
}

impl<'a> CreateTable<'a> {
    pub fn of<M: Model>(provider: &'a dyn DialectProvider) -> Self {
        Self::from_model(provider, M::model_definition())
    }

    pub fn from_model(provider: &'a dyn DialectProvider, def: &'a ModelDefinition) -> Self {
        Self {
            core: BuilderCore::for_model(provider, def),
            def,
        }
    }

    pub fn build(mut self) -> OrmResult<CreateTableModel> {
        self.core.finish()?;
        let provider = self.core.provider;
        let def = self.def;
        let table = self.core.table;

        let has_inline_key = def.primary_keys().any(|f| f.is_auto_increment);
        let primary_key = if has_inline_key {
            Vec::new()
        } else {
            def.primary_keys().map(|f| provider.field_column_name(f)).collect()
        };

        let mut indexes = Vec::new();
        for f in def.fields.iter().filter(|f| f.is_indexed && !f.is_primary_key) {
            let column = provider.field_column_name(f);
            indexes.push(IndexModel {
                name: index_name(&table.name, std::slice::from_ref(&column), f.is_unique),
                columns: vec![column],
                unique: f.is_unique,
            });
        }
        for index in &def.indexes {
            let columns: Vec<String> = index
                .fields
                .iter()
                .filter_map(|n| def.get_field(n))
                .map(|f| provider.field_column_name(f))
                .collect();
            let name = match &index.name {
                Some(n) => n.clone(),
                None => index_name(&table.name, &columns, index.unique),
            };
            indexes.push(IndexModel {
                name,
                columns,
                unique: index.unique,
            });
        }

        Ok(CreateTableModel {
            table,
            columns: def.fields.clone(),
            primary_key,
            indexes,
            sequences: def.sequences().into_iter().map(str::to_string).collect(),
        })
    }

    pub fn render(self) -> OrmResult<CreateTableScript> {
        let provider = self.core.provider;
        let model = self.build()?;
        provider.render_create_table(&model)
    }

    pub fn into_model(self) -> OrmResult<StatementModel> {
        self.build().map(StatementModel::CreateTable)
    }
}

/// `idx_<table>_<columns>` or `uidx_<table>_<columns>`.
fn index_name(table: &str, columns: &[String], unique: bool) -> String {
    let prefix = if unique { "uidx" } else { "idx" };
    format!("{prefix}_{table}_{}", columns.join("_"))
}
