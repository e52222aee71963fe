use super::DialectProvider;
use crate::config::ProviderConfig;
use crate::error::{OrmError, OrmResult, StatementKind};
use crate::expr::Operator;
use crate::fragment::{SqlCommand, SqlFragment};
use crate::ident::QuoteStyle;
use crate::statement::{InsertModel, TableRef};
use crate::types::{PostgresTypeMapper, TypeMapper};

/// PostgreSQL provider: `"quoted"` identifiers, `serial` keys, `#` for exclusive-or.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    config: ProviderConfig,
    types: PostgresTypeMapper,
}

impl PostgresDialect {
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::postgres())
    }

    pub fn with_config(config: ProviderConfig) -> Self {
        Self {
            config,
            types: PostgresTypeMapper,
        }
    }

    fn catalog(&self, table: &str, sql: SqlFragment) -> SqlCommand {
        SqlCommand::from_fragment(StatementKind::Other, table, &sql, self.placeholder())
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

/// `AND <column> = <schema or current_schema()>`
fn schema_filter(sql: &mut SqlFragment, column: &str, schema: Option<&str>) {
    sql.push_str(&format!(" AND {column} = "));
    match schema {
        Some(s) => sql.push_param(s),
        None => sql.push_str("current_schema()"),
    }
}

impl DialectProvider for PostgresDialect {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DOUBLE_QUOTE
    }

    fn type_mapper(&self) -> &dyn TypeMapper {
        &self.types
    }

    fn identity_select_sql(&self) -> &'static str {
        "SELECT LASTVAL()"
    }

    fn render_insert_with_identity(&self, model: &InsertModel) -> OrmResult<SqlCommand> {
        let identity = model.identity.as_deref().ok_or_else(|| {
            OrmError::validation(format!(
                "Table '{}' has no auto-increment column to return",
                model.table.name
            ))
        })?;
        let mut command = self.render_insert(model)?;
        command.sql.push_str(" RETURNING ");
        command.sql.push_str(&self.quote_identifier(identity));
        Ok(command)
    }

    fn bind_operand(&self, op: Operator, is_logical: bool) -> &'static str {
        match op {
            Operator::ExclusiveOr => "#",
            _ => crate::expr::default_operand(op, is_logical),
        }
    }

    fn date_part(&self, part: &str, column_sql: &str) -> String {
        format!("date_part('{}', {})", part.to_ascii_lowercase(), column_sql)
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        let mut s = String::with_capacity(12 + bytes.len() * 2);
        s.push_str("'\\x");
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s.push_str("'::bytea");
        s
    }

    fn drop_table_command(&self, table: &TableRef, if_exists: bool) -> SqlCommand {
        let exists = if if_exists { "IF EXISTS " } else { "" };
        SqlCommand::new(
            StatementKind::Other,
            table.name.clone(),
            format!("DROP TABLE {exists}{} CASCADE", self.quote_table(table)),
        )
    }

    fn table_exists_command(&self, table: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text(
            "SELECT COUNT(*) FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE c.relkind IN ('r', 'p') AND c.relname = ",
        );
        sql.push_param(table);
        schema_filter(&mut sql, "n.nspname", schema);
        self.catalog(table, sql)
    }

    fn tables_command(&self, schema: Option<&str>, include_views: bool) -> SqlCommand {
        let types = if include_views {
            "('BASE TABLE', 'VIEW')"
        } else {
            "('BASE TABLE')"
        };
        let mut sql = SqlFragment::text(format!(
            "SELECT table_name::text AS table_name, table_schema::text AS table_schema \
             FROM information_schema.tables WHERE table_type IN {types}"
        ));
        schema_filter(&mut sql, "table_schema", schema);
        sql.push_str(" ORDER BY table_name");
        self.catalog("information_schema.tables", sql)
    }

    fn columns_command(&self, table: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text(
            "SELECT column_name::text AS column_name, data_type::text AS data_type, \
             is_nullable::text AS is_nullable, \
             character_maximum_length::int8 AS character_maximum_length, \
             numeric_precision::int8 AS numeric_precision, \
             numeric_scale::int8 AS numeric_scale, \
             column_default::text AS column_default \
             FROM information_schema.columns WHERE table_name = ",
        );
        sql.push_param(table);
        schema_filter(&mut sql, "table_schema", schema);
        sql.push_str(" ORDER BY ordinal_position");
        self.catalog(table, sql)
    }

    fn primary_keys_command(&self, table: &str, schema: Option<&str>) -> SqlCommand {
        // to_regclass yields NULL (and so no rows) for a missing table
        let mut sql = SqlFragment::text(
            "SELECT a.attname::text AS column_name FROM pg_index i \
             JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
             WHERE i.indisprimary AND i.indrelid = to_regclass(",
        );
        sql.push_param(self.quote_table(&TableRef::new(table, schema)));
        sql.push_str("::text)");
        self.catalog(table, sql)
    }

    fn sequence_exists_command(&self, name: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text(
            "SELECT COUNT(*) FROM information_schema.sequences WHERE sequence_name = ",
        );
        sql.push_param(name);
        schema_filter(&mut sql, "sequence_schema", schema);
        self.catalog(name, sql)
    }

    fn create_schema_command(&self, schema: &str, if_not_exists: bool) -> SqlCommand {
        let exists = if if_not_exists { "IF NOT EXISTS " } else { "" };
        SqlCommand::new(
            StatementKind::Other,
            schema,
            format!("CREATE SCHEMA {exists}{}", self.quote_schema(schema)),
        )
    }
}
