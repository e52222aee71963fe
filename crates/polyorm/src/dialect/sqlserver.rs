use super::DialectProvider;
use crate::config::ProviderConfig;
use crate::error::StatementKind;
use crate::fragment::{SqlCommand, SqlFragment};
use crate::ident::QuoteStyle;
use crate::statement::SelectModel;
use crate::types::{SqlServerTypeMapper, TypeMapper};

/// SQL Server provider: `[bracketed]` identifiers, `IDENTITY(1,1)` keys, TOP/OFFSET paging.
#[derive(Debug, Clone)]
pub struct SqlServerDialect {
    config: ProviderConfig,
    types: SqlServerTypeMapper,
}

impl SqlServerDialect {
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::sqlserver())
    }

    pub fn with_config(config: ProviderConfig) -> Self {
        let types = SqlServerTypeMapper {
            use_unicode: config.use_unicode,
            use_datetime2: config.use_datetime2,
        };
        Self { config, types }
    }

    fn catalog(&self, table: &str, sql: SqlFragment) -> SqlCommand {
        SqlCommand::from_fragment(StatementKind::Other, table, &sql, self.placeholder())
    }
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new()
    }
}

fn schema_filter(sql: &mut SqlFragment, column: &str, schema: Option<&str>) {
    sql.push_str(&format!(" AND {column} = "));
    match schema {
        Some(s) => sql.push_param(s),
        None => sql.push_str("SCHEMA_NAME()"),
    }
}

impl DialectProvider for SqlServerDialect {
    fn name(&self) -> &'static str {
        "SQL Server"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::BRACKET
    }

    fn type_mapper(&self) -> &dyn TypeMapper {
        &self.types
    }

    fn identity_select_sql(&self) -> &'static str {
        "SELECT SCOPE_IDENTITY()"
    }

    fn select_top(&self, model: &SelectModel) -> Option<String> {
        match (model.limit, model.offset) {
            (Some(limit), None) => Some(format!("TOP ({limit}) ")),
            _ => None,
        }
    }

    fn render_paging(&self, model: &SelectModel, sql: &mut SqlFragment) {
        let Some(offset) = model.offset else {
            return;
        };
        // OFFSET/FETCH is only valid after ORDER BY
        if model.order_by.is_empty() {
            sql.push_str(" ORDER BY (SELECT NULL)");
        }
        sql.push_str(&format!(" OFFSET {offset} ROWS"));
        if let Some(limit) = model.limit {
            sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
    }

    fn table_exists_command(&self, table: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = ",
        );
        sql.push_param(table);
        schema_filter(&mut sql, "TABLE_SCHEMA", schema);
        self.catalog(table, sql)
    }

    fn tables_command(&self, schema: Option<&str>, include_views: bool) -> SqlCommand {
        let types = if include_views {
            "('BASE TABLE', 'VIEW')"
        } else {
            "('BASE TABLE')"
        };
        let mut sql = SqlFragment::text(format!(
            "SELECT TABLE_NAME AS table_name, TABLE_SCHEMA AS table_schema \
             FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE IN {types}"
        ));
        schema_filter(&mut sql, "TABLE_SCHEMA", schema);
        sql.push_str(" ORDER BY TABLE_NAME");
        self.catalog("INFORMATION_SCHEMA.TABLES", sql)
    }

    fn columns_command(&self, table: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text(
            "SELECT COLUMN_NAME AS column_name, DATA_TYPE AS data_type, \
             IS_NULLABLE AS is_nullable, \
             CAST(CHARACTER_MAXIMUM_LENGTH AS BIGINT) AS character_maximum_length, \
             CAST(NUMERIC_PRECISION AS BIGINT) AS numeric_precision, \
             CAST(NUMERIC_SCALE AS BIGINT) AS numeric_scale, \
             COLUMN_DEFAULT AS column_default \
             FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = ",
        );
        sql.push_param(table);
        schema_filter(&mut sql, "TABLE_SCHEMA", schema);
        sql.push_str(" ORDER BY ORDINAL_POSITION");
        self.catalog(table, sql)
    }

    fn primary_keys_command(&self, table: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text(
            "SELECT kcu.COLUMN_NAME AS column_name \
             FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
             ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA \
             WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_NAME = ",
        );
        sql.push_param(table);
        schema_filter(&mut sql, "tc.TABLE_SCHEMA", schema);
        sql.push_str(" ORDER BY kcu.ORDINAL_POSITION");
        self.catalog(table, sql)
    }

    fn sequence_exists_command(&self, name: &str, schema: Option<&str>) -> SqlCommand {
        let mut sql = SqlFragment::text("SELECT COUNT(*) FROM sys.sequences s WHERE s.name = ");
        sql.push_param(name);
        schema_filter(&mut sql, "SCHEMA_NAME(s.schema_id)", schema);
        self.catalog(name, sql)
    }

    fn create_schema_command(&self, schema: &str, if_not_exists: bool) -> SqlCommand {
        if !if_not_exists {
            return SqlCommand::new(
                StatementKind::Other,
                schema,
                format!("CREATE SCHEMA {}", self.quote_schema(schema)),
            );
        }
        // CREATE SCHEMA must be alone in its batch, hence EXEC
        let mut sql = SqlFragment::text("IF SCHEMA_ID(");
        sql.push_param(schema);
        sql.push_str(") IS NULL EXEC('CREATE SCHEMA ' + QUOTENAME(");
        sql.push_param(schema);
        sql.push_str("))");
        self.catalog(schema, sql)
    }
}
