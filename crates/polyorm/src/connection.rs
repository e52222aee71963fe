//! Model-level operations on top of an [`Executor`].
//!
//! [`OrmConnection`] renders statements with its provider and sends them
//! through the executor, one round trip per statement and without retries.
//! Execution faults come back as [`OrmError::OperationFailed`] carrying the
//! statement kind and target table.

use crate::client::Executor;
use crate::config::ConnectionConfig;
use crate::dialect::DialectProvider;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::fragment::SqlCommand;
use crate::introspect::{ColumnDefinition, SchemaIntrospector, TableDefinition};
use crate::model::{Model, ModelDefinition};
use crate::row::{FromRow, Row};
use crate::statement::{
    CreateTable, DeleteStatement, InsertStatement, SelectStatement, TableRef, UpdateStatement,
};
use crate::value::{FromValue, Value};
use std::sync::Arc;
use std::time::Duration;

/// Logged SQL is cut to this many bytes.
const MAX_LOGGED_SQL: usize = 200;

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Applies the connection timeout, logs each command and adds statement context to faults.
struct Logged<'c, E> {
    executor: &'c E,
    timeout: Option<Duration>,
}

impl<E: Executor> Logged<'_, E> {
    fn prepare(&self, command: &SqlCommand) -> SqlCommand {
        let mut command = command.clone();
        if command.timeout.is_none() {
            command.timeout = self.timeout;
        }
        tracing::debug!(
            target: "polyorm.sql",
            kind = %command.kind,
            table = %command.table,
            param_count = command.params.len(),
            sql = %truncate_sql_bytes(&command.sql, MAX_LOGGED_SQL),
            "executing statement"
        );
        command
    }

    fn fail(command: &SqlCommand, error: OrmError) -> OrmError {
        tracing::warn!(
            target: "polyorm.sql",
            kind = %command.kind,
            table = %command.table,
            error = %error,
            "statement failed"
        );
        OrmError::operation_failed(command.kind, command.table.clone(), error)
    }
}

impl<E: Executor> Executor for Logged<'_, E> {
    async fn query(&self, command: &SqlCommand) -> OrmResult<Vec<Row>> {
        let command = self.prepare(command);
        self.executor
            .query(&command)
            .await
            .map_err(|e| Self::fail(&command, e))
    }

    async fn execute(&self, command: &SqlCommand) -> OrmResult<u64> {
        let command = self.prepare(command);
        self.executor
            .execute(&command)
            .await
            .map_err(|e| Self::fail(&command, e))
    }
}

/// A database session bound to one dialect.
pub struct OrmConnection<E> {
    executor: E,
    provider: Arc<dyn DialectProvider>,
    config: ConnectionConfig,
}

impl<E: Executor> OrmConnection<E> {
    pub fn new(executor: E, provider: Arc<dyn DialectProvider>) -> Self {
        Self {
            executor,
            provider,
            config: ConnectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &dyn DialectProvider {
        self.provider.as_ref()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    fn logged(&self) -> Logged<'_, E> {
        Logged {
            executor: &self.executor,
            timeout: self.config.command_timeout,
        }
    }

    fn table_of(&self, def: &ModelDefinition) -> TableRef {
        TableRef::for_model(self.provider(), def)
    }

    /// Run a rendered command and return the affected row count.
    pub async fn execute(&self, command: &SqlCommand) -> OrmResult<u64> {
        self.logged().execute(command).await
    }

    /// Run a rendered command and return its rows.
    pub async fn query(&self, command: &SqlCommand) -> OrmResult<Vec<Row>> {
        self.logged().query(command).await
    }

    async fn fetch<M: FromRow>(&self, command: &SqlCommand) -> OrmResult<Vec<M>> {
        self.query(command).await?.iter().map(M::from_row).collect()
    }

    // ==================== reads ====================

    /// Rows of `M` matching an optional filter.
    pub async fn select<M: Model + FromRow>(&self, filter: Option<&Expr>) -> OrmResult<Vec<M>> {
        self.select_with(|q| match filter {
            Some(f) => q.filter(f),
            None => q,
        })
        .await
    }

    /// Rows of `M` from a SELECT shaped by `build` (ordering, paging, joins...).
    pub async fn select_with<M, F>(&self, build: F) -> OrmResult<Vec<M>>
    where
        M: Model + FromRow,
        F: for<'s> FnOnce(SelectStatement<'s>) -> SelectStatement<'s>,
    {
        let command = build(SelectStatement::of::<M>(self.provider())).render()?;
        self.fetch(&command).await
    }

    /// Rows of a table known only by name.
    pub async fn select_table(
        &self,
        table: &str,
        schema: Option<&str>,
        filter: Option<&Expr>,
    ) -> OrmResult<Vec<Row>> {
        let mut q = SelectStatement::from_table(self.provider(), table, schema);
        if let Some(f) = filter {
            q = q.filter(f);
        }
        self.query(&q.render()?).await
    }

    /// First matching row; [`OrmError::NotFound`] when there is none.
    pub async fn first<M: Model + FromRow>(&self, filter: Option<&Expr>) -> OrmResult<M> {
        self.first_or_default(filter).await?.ok_or_else(|| {
            OrmError::not_found(format!("No '{}' row matched", M::model_definition().name))
        })
    }

    pub async fn first_or_default<M: Model + FromRow>(
        &self,
        filter: Option<&Expr>,
    ) -> OrmResult<Option<M>> {
        let rows: Vec<M> = self
            .select_with(|q| {
                let q = q.limit(1);
                match filter {
                    Some(f) => q.filter(f),
                    None => q,
                }
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Single value of a projection such as `max(age)`; an empty result decodes as NULL.
    pub async fn scalar<M: Model, T: FromValue>(
        &self,
        projection: Expr,
        filter: Option<&Expr>,
    ) -> OrmResult<T> {
        let mut q = SelectStatement::of::<M>(self.provider()).select([projection]);
        if let Some(f) = filter {
            q = q.filter(f);
        }
        let value = self.logged().scalar(&q.render()?).await?;
        T::from_value(&value.unwrap_or(Value::Null))
    }

    pub async fn count<M: Model>(&self, filter: Option<&Expr>) -> OrmResult<u64> {
        let mut q = SelectStatement::of::<M>(self.provider());
        if let Some(f) = filter {
            q = q.filter(f);
        }
        self.run_count(q).await
    }

    pub async fn count_table(
        &self,
        table: &str,
        schema: Option<&str>,
        filter: Option<&Expr>,
    ) -> OrmResult<u64> {
        let mut q = SelectStatement::from_table(self.provider(), table, schema);
        if let Some(f) = filter {
            q = q.filter(f);
        }
        self.run_count(q).await
    }

    async fn run_count(&self, q: SelectStatement<'_>) -> OrmResult<u64> {
        let command = self.provider().render_count(&q.build()?)?;
        let value = self.logged().scalar(&command).await?;
        let count = i64::from_value(&value.unwrap_or(Value::I64(0)))?;
        u64::try_from(count).map_err(|e| OrmError::decode("count", e.to_string()))
    }

    // ==================== writes ====================

    pub async fn insert<M: Model>(&self, obj: &M) -> OrmResult<u64> {
        let command = InsertStatement::of::<M>(self.provider()).values(obj).render()?;
        self.execute(&command).await
    }

    /// One INSERT per object; returns the total affected rows.
    pub async fn insert_all<M: Model>(&self, objs: &[M]) -> OrmResult<u64> {
        let mut total = 0;
        for obj in objs {
            total += self.insert(obj).await?;
        }
        Ok(total)
    }

    /// Insert only the listed fields of `obj`.
    pub async fn insert_only<M: Model>(&self, obj: &M, fields: &[&str]) -> OrmResult<u64> {
        let command = InsertStatement::of::<M>(self.provider())
            .values(obj)
            .only(fields)
            .render()?;
        self.execute(&command).await
    }

    /// Insert and read back the key generated by the backend in the same round trip.
    pub async fn insert_returning_id<M: Model>(&self, obj: &M) -> OrmResult<Option<Value>> {
        let model = InsertStatement::of::<M>(self.provider()).values(obj).build()?;
        let command = self.provider().render_insert_with_identity(&model)?;
        let id = self.logged().scalar(&command).await?;
        Ok(id.filter(|v| !v.is_null()))
    }

    /// Write every non-key field of `obj`, targeted by its primary key.
    pub async fn update<M: Model>(&self, obj: &M) -> OrmResult<u64> {
        let command = UpdateStatement::of::<M>(self.provider()).values(obj).render()?;
        self.execute(&command).await
    }

    pub async fn update_only<M: Model>(&self, obj: &M, fields: &[&str]) -> OrmResult<u64> {
        let command = UpdateStatement::of::<M>(self.provider())
            .values(obj)
            .only(fields)
            .render()?;
        self.execute(&command).await
    }

    /// Set columns on every row matching `filter`; `None` updates the whole table.
    pub async fn update_all<M: Model>(
        &self,
        values: &[(&str, Value)],
        filter: Option<&Expr>,
    ) -> OrmResult<u64> {
        let mut q = UpdateStatement::of::<M>(self.provider());
        for (field, value) in values {
            q = q.set(field, value.clone());
        }
        q = match filter {
            Some(f) => q.filter(f),
            None => q.allow_all(),
        };
        self.execute(&q.render()?).await
    }

    /// Delete `obj` by primary key.
    pub async fn delete<M: Model>(&self, obj: &M) -> OrmResult<u64> {
        let command = DeleteStatement::of::<M>(self.provider()).instance(obj).render()?;
        self.execute(&command).await
    }

    /// Delete rows matching `filter`; `None` empties the table.
    pub async fn delete_all<M: Model>(&self, filter: Option<&Expr>) -> OrmResult<u64> {
        let q = DeleteStatement::of::<M>(self.provider());
        let q = match filter {
            Some(f) => q.filter(f),
            None => q.allow_all(),
        };
        self.execute(&q.render()?).await
    }

    // ==================== schema ====================

    /// Create the table of `M` with its indexes and missing sequences.
    ///
    /// Fails with [`OrmError::TableAlreadyExists`] when the table exists and
    /// `drop_if_exists` is false; otherwise an existing table is dropped first.
    pub async fn create_table<M: Model>(&self, drop_if_exists: bool) -> OrmResult<()> {
        let def = M::model_definition();
        let table = self.table_of(def);
        if self.table_exists(&table.name, table.schema.as_deref()).await? {
            if !drop_if_exists {
                return Err(OrmError::TableAlreadyExists(self.provider().quote_table(&table)));
            }
            self.execute(&self.provider().drop_table_command(&table, false))
                .await?;
        }
        self.create(def, &table).await
    }

    /// Create the table unless it exists; returns whether it was created.
    pub async fn create_table_if_not_exists<M: Model>(&self) -> OrmResult<bool> {
        let def = M::model_definition();
        let table = self.table_of(def);
        if self.table_exists(&table.name, table.schema.as_deref()).await? {
            return Ok(false);
        }
        self.create(def, &table).await?;
        Ok(true)
    }

    async fn create(&self, def: &ModelDefinition, table: &TableRef) -> OrmResult<()> {
        let script = CreateTable::from_model(self.provider(), def).render()?;
        self.execute(&script.table).await?;
        for index in &script.indexes {
            self.execute(index).await?;
        }
        for (name, command) in &script.sequences {
            if !self.sequence_exists(name, table.schema.as_deref()).await? {
                self.execute(command).await?;
            }
        }
        tracing::debug!(target: "polyorm.sql", table = %table.name, "table created");
        Ok(())
    }

    /// Drop the table of `M`; [`OrmError::TableMissing`] when it does not exist.
    pub async fn drop_table<M: Model>(&self) -> OrmResult<()> {
        let table = self.table_of(M::model_definition());
        if !self.table_exists(&table.name, table.schema.as_deref()).await? {
            return Err(OrmError::TableMissing(self.provider().quote_table(&table)));
        }
        self.execute(&self.provider().drop_table_command(&table, false))
            .await?;
        Ok(())
    }

    pub async fn drop_table_if_exists<M: Model>(&self) -> OrmResult<()> {
        let table = self.table_of(M::model_definition());
        self.execute(&self.provider().drop_table_command(&table, true))
            .await?;
        Ok(())
    }

    pub async fn create_schema(&self, schema: &str) -> OrmResult<()> {
        self.execute(&self.provider().create_schema_command(schema, false))
            .await?;
        Ok(())
    }

    pub async fn create_schema_if_not_exists(&self, schema: &str) -> OrmResult<()> {
        self.execute(&self.provider().create_schema_command(schema, true))
            .await?;
        Ok(())
    }

    // ==================== introspection ====================

    pub async fn table_exists(&self, table: &str, schema: Option<&str>) -> OrmResult<bool> {
        let logged = self.logged();
        SchemaIntrospector::new(&logged, self.provider())
            .table_exists(table, schema)
            .await
    }

    pub async fn sequence_exists(&self, name: &str, schema: Option<&str>) -> OrmResult<bool> {
        let logged = self.logged();
        SchemaIntrospector::new(&logged, self.provider())
            .sequence_exists(name, schema)
            .await
    }

    pub async fn tables(
        &self,
        schema: Option<&str>,
        include_views: bool,
    ) -> OrmResult<Vec<TableDefinition>> {
        let logged = self.logged();
        SchemaIntrospector::new(&logged, self.provider())
            .tables(schema, include_views)
            .await
    }

    pub async fn columns(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> OrmResult<Vec<ColumnDefinition>> {
        let logged = self.logged();
        SchemaIntrospector::new(&logged, self.provider())
            .columns(table, schema)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 200), "SELECT 1");
        assert_eq!(truncate_sql_bytes("abcdef", 3), "abc");
        // 'é' is two bytes
        assert_eq!(truncate_sql_bytes("aé", 2), "a");
    }
}
