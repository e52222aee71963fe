//! Dialect providers.
//!
//! [`DialectProvider`] renders statement models into SQL for one backend. All
//! backend-independent work (clause assembly, parameter numbering, column DDL) lives in
//! provided methods; a backend supplies quoting, its type table, catalog queries and the
//! operators or clauses it spells differently.

mod postgres;
mod sqlserver;

#[cfg(test)]
mod tests;

pub use postgres::PostgresDialect;
pub use sqlserver::SqlServerDialect;

use crate::config::ProviderConfig;
use crate::error::{OrmError, OrmResult, StatementKind};
use crate::expr::{Operator, default_operand};
use crate::fragment::{Placeholder, SqlCommand, SqlFragment};
use crate::ident::QuoteStyle;
use crate::introspect::{ColumnDefinition, TableDefinition};
use crate::model::{DefaultValue, FieldDefinition, ModelDefinition};
use crate::naming::NamingStrategy;
use crate::row::Row;
use crate::statement::{
    CreateTableModel, DeleteModel, InsertModel, SelectModel, StatementModel, TableRef, UpdateModel,
};
use crate::value::Value;
use std::fmt;

/// Rendered CREATE TABLE plus the statements that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableScript {
    pub table: SqlCommand,
    pub indexes: Vec<SqlCommand>,
    /// (sequence name, CREATE SEQUENCE command)
    pub sequences: Vec<(String, SqlCommand)>,
}

impl CreateTableScript {
    /// Every command in execution order.
    pub fn commands(&self) -> Vec<&SqlCommand> {
        let mut out = vec![&self.table];
        out.extend(self.indexes.iter());
        out.extend(self.sequences.iter().map(|(_, c)| c));
        out
    }
}

/// Backend-specific SQL rendering.
pub trait DialectProvider: Send + Sync + fmt::Debug {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    fn config(&self) -> &ProviderConfig;

    fn quote_style(&self) -> QuoteStyle;

    fn type_mapper(&self) -> &dyn crate::types::TypeMapper;

    /// Statement returning the key generated by the last insert.
    fn identity_select_sql(&self) -> &'static str;

    // ==================== catalog queries ====================

    /// Single `COUNT(*)` row; zero when the table is absent.
    fn table_exists_command(&self, table: &str, schema: Option<&str>) -> SqlCommand;

    /// Rows with `table_name`, `table_schema`.
    fn tables_command(&self, schema: Option<&str>, include_views: bool) -> SqlCommand;

    /// information_schema-shaped column rows.
    fn columns_command(&self, table: &str, schema: Option<&str>) -> SqlCommand;

    /// Rows with `column_name` for each primary-key column.
    fn primary_keys_command(&self, table: &str, schema: Option<&str>) -> SqlCommand;

    /// Single `COUNT(*)` row.
    fn sequence_exists_command(&self, name: &str, schema: Option<&str>) -> SqlCommand;

    fn create_schema_command(&self, schema: &str, if_not_exists: bool) -> SqlCommand;

    // ==================== identifiers ====================

    fn placeholder(&self) -> Placeholder {
        Placeholder::new(self.config().param_prefix)
    }

    fn naming(&self) -> &dyn NamingStrategy {
        &self.config().naming
    }

    /// Quote one identifier; dots are part of the name.
    fn quote_identifier(&self, name: &str) -> String {
        self.quote_style().quote(name)
    }

    /// Inverse of [`quote_identifier`](DialectProvider::quote_identifier).
    fn unquote_identifier(&self, quoted: &str) -> OrmResult<String> {
        self.quote_style().unquote(quoted)
    }

    /// Physical column name: the alias, else the naming strategy applied to the field name.
    fn field_column_name(&self, field: &FieldDefinition) -> String {
        match &field.alias {
            Some(alias) => alias.clone(),
            None => self.naming().column_name(&field.name),
        }
    }

    /// Physical table name of a model.
    fn model_table_name(&self, def: &ModelDefinition) -> String {
        match &def.alias {
            Some(alias) => alias.clone(),
            None => self.naming().table_name(&def.name),
        }
    }

    /// Schema names may be dotted (`db.schema`); each part is quoted separately.
    fn quote_schema(&self, schema: &str) -> String {
        schema
            .split('.')
            .map(|part| self.quote_identifier(&self.naming().schema_name(part)))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn quote_table(&self, table: &TableRef) -> String {
        let name = self.quote_identifier(&table.name);
        match &table.schema {
            Some(schema) => format!("{}.{}", self.quote_schema(schema), name),
            None => name,
        }
    }

    fn quote_model_table(&self, def: &ModelDefinition) -> String {
        self.quote_table(&TableRef::new(self.model_table_name(def), def.schema.as_deref()))
    }

    // ==================== expressions ====================

    /// Operator text; override individual operators and delegate the rest.
    fn bind_operand(&self, op: Operator, is_logical: bool) -> &'static str {
        default_operand(op, is_logical)
    }

    fn date_part(&self, part: &str, column_sql: &str) -> String {
        format!("DATEPART({}, {})", part.to_ascii_lowercase(), column_sql)
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        let mut s = String::with_capacity(2 + bytes.len() * 2);
        s.push_str("0x");
        for b in bytes {
            s.push_str(&format!("{b:02X}"));
        }
        s
    }

    /// Inline literal, used for DDL defaults only; statements always bind values.
    fn render_literal(&self, value: &Value) -> OrmResult<String> {
        let quoted = |s: &str| format!("'{}'", s.replace('\'', "''"));
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b).to_string(),
            Value::I16(v) => v.to_string(),
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F32(v) if v.is_finite() => v.to_string(),
            Value::F64(v) if v.is_finite() => v.to_string(),
            Value::F32(_) | Value::F64(_) => {
                return Err(OrmError::validation("Non-finite float cannot be used as a literal"));
            }
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => quoted(s),
            Value::Bytes(b) => self.bytes_literal(b),
            Value::Uuid(u) => quoted(&u.to_string()),
            Value::Date(d) => quoted(&d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => quoted(&t.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(dt) => quoted(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::DateTimeTz(dt) => quoted(&dt.to_rfc3339()),
            Value::Json(j) => quoted(&j.to_string()),
        })
    }

    // ==================== DDL ====================

    /// Column DDL: name, type, nullability or inline key, default.
    fn render_column_definition(&self, field: &FieldDefinition) -> OrmResult<String> {
        let mapper = self.type_mapper();
        let column_type = if field.is_auto_increment {
            mapper.auto_increment_type(field.db_type)?
        } else {
            mapper.column_type(field.db_type, field.length, field.precision, field.scale)?
        };

        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&self.field_column_name(field)),
            column_type
        );
        if field.is_primary_key && field.is_auto_increment {
            sql.push_str(" NOT NULL PRIMARY KEY");
        } else if field.nullable && !field.is_primary_key {
            sql.push_str(" NULL");
        } else {
            sql.push_str(" NOT NULL");
        }

        match &field.default {
            Some(DefaultValue::Literal(v)) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(&self.render_literal(v)?);
            }
            Some(DefaultValue::Expression(e)) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(e);
            }
            None => {}
        }
        Ok(sql)
    }

    fn create_sequence_command(&self, name: &str, schema: Option<&str>) -> SqlCommand {
        let table = TableRef::new(name, schema);
        SqlCommand::new(
            StatementKind::Other,
            name,
            format!("CREATE SEQUENCE {}", self.quote_table(&table)),
        )
    }

    fn drop_table_command(&self, table: &TableRef, if_exists: bool) -> SqlCommand {
        let sql = if if_exists {
            format!("DROP TABLE IF EXISTS {}", self.quote_table(table))
        } else {
            format!("DROP TABLE {}", self.quote_table(table))
        };
        SqlCommand::new(StatementKind::Other, table.name.clone(), sql)
    }

    fn render_create_table(&self, model: &CreateTableModel) -> OrmResult<CreateTableScript> {
        trace_render(StatementKind::CreateTable, &model.table);
        let table_sql = self.quote_table(&model.table);

        let mut parts = model
            .columns
            .iter()
            .map(|f| self.render_column_definition(f))
            .collect::<OrmResult<Vec<_>>>()?;
        if !model.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", self.quote_list(&model.primary_key)));
        }
        let table = SqlCommand::new(
            StatementKind::CreateTable,
            model.table.name.clone(),
            format!("CREATE TABLE {} ({})", table_sql, parts.join(", ")),
        );

        let indexes = model
            .indexes
            .iter()
            .map(|idx| {
                let unique = if idx.unique { "UNIQUE " } else { "" };
                SqlCommand::new(
                    StatementKind::Other,
                    model.table.name.clone(),
                    format!(
                        "CREATE {unique}INDEX {} ON {} ({})",
                        self.quote_identifier(&idx.name),
                        table_sql,
                        self.quote_list(&idx.columns)
                    ),
                )
            })
            .collect();

        let sequences = model
            .sequences
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    self.create_sequence_command(name, model.table.schema.as_deref()),
                )
            })
            .collect();

        Ok(CreateTableScript {
            table,
            indexes,
            sequences,
        })
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ==================== DML ====================

    /// Text placed right after `SELECT [DISTINCT]`, e.g. `TOP (n) `.
    fn select_top(&self, model: &SelectModel) -> Option<String> {
        let _ = model;
        None
    }

    /// Trailing paging clause.
    fn render_paging(&self, model: &SelectModel, sql: &mut SqlFragment) {
        if let Some(limit) = model.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = model.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    /// `FROM ... JOIN ... WHERE ...` shared by SELECT and COUNT.
    fn render_from_where(&self, model: &SelectModel, sql: &mut SqlFragment) {
        sql.push_str(" FROM ");
        sql.push_str(&self.quote_table(&model.table));
        for join in &model.joins {
            sql.push_str(&format!(" {} {} ON ", join.kind.as_sql(), self.quote_table(&join.table)));
            sql.append(join.on.clone());
        }
        if let Some(filter) = &model.filter {
            sql.push_str(" WHERE ");
            sql.append(filter.clone());
        }
    }

    fn render_select(&self, model: &SelectModel) -> OrmResult<SqlCommand> {
        trace_render(StatementKind::Select, &model.table);
        let mut sql = SqlFragment::text("SELECT ");
        if model.distinct {
            sql.push_str("DISTINCT ");
        }
        if let Some(top) = self.select_top(model) {
            sql.push_str(&top);
        }
        if model.columns.is_empty() {
            sql.push_str("*");
        } else {
            sql.append(SqlFragment::join(model.columns.iter().cloned(), ", "));
        }
        self.render_from_where(model, &mut sql);
        if !model.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.append(SqlFragment::join(model.group_by.iter().cloned(), ", "));
        }
        if let Some(having) = &model.having {
            sql.push_str(" HAVING ");
            sql.append(having.clone());
        }
        if !model.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let items = model.order_by.iter().map(|o| {
                let mut f = o.expr.clone();
                if o.descending {
                    f.push_str(" DESC");
                }
                f
            });
            sql.append(SqlFragment::join(items, ", "));
        }
        self.render_paging(model, &mut sql);
        Ok(self.command(StatementKind::Select, &model.table, &sql))
    }

    /// `SELECT COUNT(*)` over the model's source and filter.
    fn render_count(&self, model: &SelectModel) -> OrmResult<SqlCommand> {
        trace_render(StatementKind::Select, &model.table);
        let mut sql = SqlFragment::text("SELECT COUNT(*)");
        self.render_from_where(model, &mut sql);
        Ok(self.command(StatementKind::Select, &model.table, &sql))
    }

    fn render_insert(&self, model: &InsertModel) -> OrmResult<SqlCommand> {
        trace_render(StatementKind::Insert, &model.table);
        let mut sql = SqlFragment::text(format!("INSERT INTO {}", self.quote_table(&model.table)));
        if model.columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(&format!(" ({}) VALUES (", self.quote_list(&model.columns)));
            let values = model.values.iter().cloned().map(SqlFragment::param);
            sql.append(SqlFragment::join(values, ", "));
            sql.push_str(")");
        }
        Ok(self.command(StatementKind::Insert, &model.table, &sql))
    }

    /// INSERT whose only result value is the generated key, sent as one batch.
    fn render_insert_with_identity(&self, model: &InsertModel) -> OrmResult<SqlCommand> {
        let mut command = self.render_insert(model)?;
        command.sql.push_str("; ");
        command.sql.push_str(self.identity_select_sql());
        Ok(command)
    }

    fn render_update(&self, model: &UpdateModel) -> OrmResult<SqlCommand> {
        trace_render(StatementKind::Update, &model.table);
        if model.set.is_empty() {
            return Err(OrmError::validation("UPDATE requires at least one SET column"));
        }
        let mut sql = SqlFragment::text(format!("UPDATE {} SET ", self.quote_table(&model.table)));
        let assignments = model.set.iter().map(|(column, value)| {
            let mut f = SqlFragment::text(format!("{} = ", self.quote_identifier(column)));
            f.append(value.clone());
            f
        });
        sql.append(SqlFragment::join(assignments, ", "));
        if let Some(filter) = &model.filter {
            sql.push_str(" WHERE ");
            sql.append(filter.clone());
        }
        Ok(self.command(StatementKind::Update, &model.table, &sql))
    }

    fn render_delete(&self, model: &DeleteModel) -> OrmResult<SqlCommand> {
        trace_render(StatementKind::Delete, &model.table);
        let mut sql = SqlFragment::text(format!("DELETE FROM {}", self.quote_table(&model.table)));
        if let Some(filter) = &model.filter {
            sql.push_str(" WHERE ");
            sql.append(filter.clone());
        }
        Ok(self.command(StatementKind::Delete, &model.table, &sql))
    }

    /// Render any statement model; CREATE TABLE yields its follow-up statements too.
    fn render(&self, model: &StatementModel) -> OrmResult<Vec<SqlCommand>> {
        Ok(match model {
            StatementModel::Select(m) => vec![self.render_select(m)?],
            StatementModel::Insert(m) => vec![self.render_insert(m)?],
            StatementModel::Update(m) => vec![self.render_update(m)?],
            StatementModel::Delete(m) => vec![self.render_delete(m)?],
            StatementModel::CreateTable(m) => self
                .render_create_table(m)?
                .commands()
                .into_iter()
                .cloned()
                .collect(),
        })
    }

    fn command(&self, kind: StatementKind, table: &TableRef, sql: &SqlFragment) -> SqlCommand {
        SqlCommand::from_fragment(kind, table.name.clone(), sql, self.placeholder())
    }

    // ==================== introspection rows ====================

    fn map_table_row(&self, row: &Row) -> OrmResult<TableDefinition> {
        Ok(TableDefinition {
            name: row.try_get("table_name")?,
            schema: row.try_get("table_schema")?,
        })
    }

    fn map_column_row(&self, row: &Row, primary_keys: &[String]) -> OrmResult<ColumnDefinition> {
        let name: String = row.try_get("column_name")?;
        let definition: String = row.try_get("data_type")?;
        let nullable: String = row.try_get("is_nullable")?;
        let size = |column: &str| -> OrmResult<Option<u32>> {
            let v: Option<i64> = row.try_get(column)?;
            Ok(v.and_then(|v| u32::try_from(v).ok()))
        };
        Ok(ColumnDefinition {
            primary_key: primary_keys.iter().any(|pk| *pk == name),
            db_type: self.type_mapper().map_data_type(&definition),
            nullable: nullable.eq_ignore_ascii_case("YES"),
            length: size("character_maximum_length")?,
            precision: size("numeric_precision")?,
            scale: size("numeric_scale")?,
            default_value: row.try_get("column_default")?,
            name,
            definition,
        })
    }
}

fn trace_render(kind: StatementKind, table: &TableRef) {
    tracing::trace!(target: "polyorm.render", kind = %kind, table = %table.name, "rendering statement");
}
