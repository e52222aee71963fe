//! Schema introspection: read table and column metadata back from the catalog.
//!
//! Nothing is cached; every call re-queries, so results always reflect the
//! current catalog. When no schema is given the connection's current schema
//! is used.

use crate::client::Executor;
use crate::dialect::DialectProvider;
use crate::error::OrmResult;
use crate::types::DbType;
use crate::value::FromValue;
use serde::Serialize;

/// A table (or view) found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub name: String,
    pub schema: String,
}

/// A column found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Catalog type name as reported by the backend, e.g. `character varying`.
    pub definition: String,
    pub primary_key: bool,
    pub nullable: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default_value: Option<String>,
    /// Reverse mapping of `definition`; [`DbType::Object`] when unknown.
    pub db_type: DbType,
}

/// Reads catalog metadata through an [`Executor`].
pub struct SchemaIntrospector<'a, E: Executor> {
    executor: &'a E,
    provider: &'a dyn DialectProvider,
}

impl<'a, E: Executor> SchemaIntrospector<'a, E> {
    pub fn new(executor: &'a E, provider: &'a dyn DialectProvider) -> Self {
        Self { executor, provider }
    }

    /// Whether a base table exists. A missing catalog row is `false`, not an error.
    pub async fn table_exists(&self, table: &str, schema: Option<&str>) -> OrmResult<bool> {
        tracing::debug!(target: "polyorm.introspect", table, schema, "checking table");
        let command = self.provider.table_exists_command(table, schema);
        count_positive(self.executor.scalar(&command).await?)
    }

    pub async fn sequence_exists(&self, name: &str, schema: Option<&str>) -> OrmResult<bool> {
        tracing::debug!(target: "polyorm.introspect", sequence = name, schema, "checking sequence");
        let command = self.provider.sequence_exists_command(name, schema);
        count_positive(self.executor.scalar(&command).await?)
    }

    /// Tables of a schema, optionally including views.
    pub async fn tables(
        &self,
        schema: Option<&str>,
        include_views: bool,
    ) -> OrmResult<Vec<TableDefinition>> {
        tracing::debug!(target: "polyorm.introspect", schema, include_views, "listing tables");
        let command = self.provider.tables_command(schema, include_views);
        self.executor
            .query(&command)
            .await?
            .iter()
            .map(|row| self.provider.map_table_row(row))
            .collect()
    }

    /// Columns of a table in ordinal order, annotated with primary-key membership.
    pub async fn columns(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> OrmResult<Vec<ColumnDefinition>> {
        tracing::debug!(target: "polyorm.introspect", table, schema, "listing columns");
        let keys = self.primary_keys(table, schema).await?;
        let command = self.provider.columns_command(table, schema);
        self.executor
            .query(&command)
            .await?
            .iter()
            .map(|row| self.provider.map_column_row(row, &keys))
            .collect()
    }

    /// Primary-key column names of a table; empty when it has none or does not exist.
    pub async fn primary_keys(&self, table: &str, schema: Option<&str>) -> OrmResult<Vec<String>> {
        let command = self.provider.primary_keys_command(table, schema);
        self.executor
            .query(&command)
            .await?
            .iter()
            .map(|row| row.try_get::<String>("column_name"))
            .collect()
    }
}

fn count_positive(value: Option<crate::value::Value>) -> OrmResult<bool> {
    match value {
        Some(v) => Ok(Option::<i64>::from_value(&v)?.unwrap_or(0) > 0),
        None => Ok(false),
    }
}
