//! Rendering tests shared by both dialects.

use super::*;
use crate::expr::{Expr, col, lit};
use crate::ident::Ident;
use crate::model::IndexDefinition;
use crate::naming::NamingConvention;
use crate::statement::{CreateTable, InsertStatement, SelectStatement};
use crate::types::DbType;
use chrono::NaiveDate;

fn providers() -> Vec<Box<dyn DialectProvider>> {
    vec![Box::new(PostgresDialect::new()), Box::new(SqlServerDialect::new())]
}

fn orders() -> ModelDefinition {
    ModelDefinition::new("orders")
        .schema("public")
        .field(FieldDefinition::new("id", DbType::Int64).primary_key().auto_increment())
        .field(FieldDefinition::new("total", DbType::Decimal).precision(10, 2))
}

/// Exactly one of `NULL` / `NOT NULL` appears.
fn nullability_clauses(sql: &str) -> (bool, bool) {
    let not_null = sql.contains(" NOT NULL");
    let null = sql.replace(" NOT NULL", "").contains(" NULL");
    (null, not_null)
}

#[test]
fn column_definition_properties_hold_for_every_flag_combination() {
    for provider in providers() {
        for db_type in [DbType::Int32, DbType::Int64, DbType::String, DbType::Decimal] {
            for pk in [false, true] {
                for ai in [false, true] {
                    if ai && !db_type.is_integer() {
                        continue;
                    }
                    for nullable in [false, true] {
                        let mut field = FieldDefinition::new("col", db_type).length(40);
                        field.is_primary_key = pk;
                        field.is_auto_increment = ai;
                        field.nullable = nullable;

                        let sql = provider.render_column_definition(&field).unwrap();
                        let (null, not_null) = nullability_clauses(&sql);
                        assert!(null ^ not_null, "{}: {sql}", provider.name());
                        assert_eq!(sql.contains("PRIMARY KEY"), pk && ai, "{}: {sql}", provider.name());
                    }
                }
            }
        }
    }
}

#[test]
fn column_definitions_per_dialect() {
    let pg = PostgresDialect::new();
    let ms = SqlServerDialect::new();
    let id = FieldDefinition::new("id", DbType::Int32).primary_key().auto_increment();
    assert_eq!(pg.render_column_definition(&id).unwrap(), r#""id" serial NOT NULL PRIMARY KEY"#);
    assert_eq!(
        ms.render_column_definition(&id).unwrap(),
        "[id] integer IDENTITY(1,1) NOT NULL PRIMARY KEY"
    );

    let name = FieldDefinition::new("name", DbType::String).length(50).nullable();
    assert_eq!(pg.render_column_definition(&name).unwrap(), r#""name" varchar(50) NULL"#);
    assert_eq!(ms.render_column_definition(&name).unwrap(), "[name] NVARCHAR(50) NULL");

    let active = FieldDefinition::new("active", DbType::Boolean).default_value(true);
    assert_eq!(
        pg.render_column_definition(&active).unwrap(),
        r#""active" boolean NOT NULL DEFAULT true"#
    );
    assert_eq!(ms.render_column_definition(&active).unwrap(), "[active] BIT NOT NULL DEFAULT 1");

    let created = FieldDefinition::new("created", DbType::DateTime).default_expr("CURRENT_TIMESTAMP");
    assert_eq!(
        pg.render_column_definition(&created).unwrap(),
        r#""created" timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP"#
    );
}

#[test]
fn unmapped_type_fails_column_definition() {
    let field = FieldDefinition::new("blob", DbType::Object);
    let err = PostgresDialect::new().render_column_definition(&field).unwrap_err();
    assert!(matches!(err, OrmError::TypeNotSupported { .. }));

    let guid_key = FieldDefinition::new("id", DbType::Guid).primary_key().auto_increment();
    assert!(SqlServerDialect::new().render_column_definition(&guid_key).is_err());
}

#[test]
fn quoting_round_trips_through_the_dialect_parser() {
    let names = ["plain", "Mixed.Case.Dots", "select", "with \"quote\"", "with ]bracket[", "a.b"];
    for provider in providers() {
        for name in names {
            let quoted = provider.quote_identifier(name);
            assert_eq!(provider.unquote_identifier(&quoted).unwrap(), name);

            let parsed = Ident::parse(provider.quote_style(), &quoted).unwrap();
            assert_eq!(parsed.names(), vec![name]);
        }
    }
}

#[test]
fn schema_qualified_table_names() {
    let def = orders();
    assert_eq!(PostgresDialect::new().quote_model_table(&def), r#""public"."orders""#);
    assert_eq!(SqlServerDialect::new().quote_model_table(&def), "[public].[orders]");

    let nested = TableRef::new("orders", Some("archive.sales"));
    assert_eq!(PostgresDialect::new().quote_table(&nested), r#""archive"."sales"."orders""#);
}

#[test]
fn exclusive_or_is_the_only_postgres_override() {
    let pg = PostgresDialect::new();
    let ms = SqlServerDialect::new();
    assert_eq!(ms.bind_operand(Operator::ExclusiveOr, false), "^");
    assert_eq!(pg.bind_operand(Operator::ExclusiveOr, false), "#");

    let ops = [
        Operator::AndAlso,
        Operator::OrElse,
        Operator::And,
        Operator::Or,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessThan,
        Operator::GreaterThanOrEqual,
        Operator::Add,
        Operator::Modulo,
    ];
    for op in ops {
        for logical in [false, true] {
            assert_eq!(pg.bind_operand(op, logical), ms.bind_operand(op, logical), "{op:?}");
        }
    }
}

#[test]
fn xor_predicate_renders_per_dialect() {
    let def = ModelDefinition::new("flags")
        .field(FieldDefinition::new("id", DbType::Int32).primary_key())
        .field(FieldDefinition::new("mask", DbType::Int32));
    let filter = col("mask").xor(4).eq(0);

    let pg = PostgresDialect::with_config(ProviderConfig::postgres().with_naming(NamingConvention::Verbatim));
    let cmd = SelectStatement::from_model(&pg, &def).filter(&filter).render().unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "flags" WHERE ("mask" # $1) = $2"#);

    let ms = SqlServerDialect::new();
    let cmd = SelectStatement::from_model(&ms, &def).filter(&filter).render().unwrap();
    assert_eq!(cmd.sql, "SELECT * FROM [flags] WHERE ([mask] ^ @p1) = @p2");
}

#[test]
fn date_part_lowering() {
    let def = ModelDefinition::new("events")
        .field(FieldDefinition::new("id", DbType::Int32).primary_key())
        .field(FieldDefinition::new("at", DbType::DateTime));
    let filter = col("at").date_part("Year").eq(2024);

    let pg = PostgresDialect::new();
    let cmd = SelectStatement::from_model(&pg, &def).filter(&filter).render().unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "events" WHERE date_part('year', "at") = $1"#);

    let ms = SqlServerDialect::new();
    let cmd = SelectStatement::from_model(&ms, &def).filter(&filter).render().unwrap();
    assert_eq!(cmd.sql, "SELECT * FROM [events] WHERE DATEPART(year, [at]) = @p1");
}

#[test]
fn literals_for_defaults() {
    let pg = PostgresDialect::new();
    let ms = SqlServerDialect::new();
    assert_eq!(pg.render_literal(&Value::from("O'Brien")).unwrap(), "'O''Brien'");
    assert_eq!(pg.render_literal(&Value::Null).unwrap(), "NULL");
    assert_eq!(ms.render_literal(&Value::Bool(false)).unwrap(), "0");
    assert_eq!(pg.render_literal(&Value::Bytes(vec![0xde, 0xad])).unwrap(), "'\\xdead'::bytea");
    assert_eq!(ms.render_literal(&Value::Bytes(vec![0xde, 0xad])).unwrap(), "0xDEAD");
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(ms.render_literal(&Value::Date(date)).unwrap(), "'2024-02-29'");
    assert!(pg.render_literal(&Value::F64(f64::NAN)).is_err());
}

#[test]
fn create_table_script() {
    let def = ModelDefinition::new("User")
        .field(FieldDefinition::new("id", DbType::Int32).primary_key().auto_increment())
        .field(FieldDefinition::new("email", DbType::String).length(120).unique())
        .field(FieldDefinition::new("lastName", DbType::String).length(60).indexed())
        .field(FieldDefinition::new("ticket", DbType::Int64).sequence("ticket_seq"));

    let pg = PostgresDialect::new();
    let script = CreateTable::from_model(&pg, &def).render().unwrap();
    assert_eq!(
        script.table.sql,
        r#"CREATE TABLE "user" ("id" serial NOT NULL PRIMARY KEY, "email" varchar(120) NOT NULL, "last_name" varchar(60) NOT NULL, "ticket" bigint NOT NULL)"#
    );
    let indexes: Vec<&str> = script.indexes.iter().map(|c| c.sql.as_str()).collect();
    assert_eq!(
        indexes,
        vec![
            r#"CREATE UNIQUE INDEX "uidx_user_email" ON "user" ("email")"#,
            r#"CREATE INDEX "idx_user_last_name" ON "user" ("last_name")"#,
        ]
    );
    assert_eq!(script.sequences.len(), 1);
    assert_eq!(script.sequences[0].0, "ticket_seq");
    assert_eq!(script.sequences[0].1.sql, r#"CREATE SEQUENCE "ticket_seq""#);
    assert_eq!(script.commands().len(), 4);
    assert_eq!(script.table.kind, StatementKind::CreateTable);
}

#[test]
fn composite_primary_key_is_a_table_constraint() {
    let def = ModelDefinition::new("OrderLine")
        .schema("sales")
        .field(FieldDefinition::new("OrderId", DbType::Int64).primary_key())
        .field(FieldDefinition::new("Line", DbType::Int32).primary_key())
        .field(FieldDefinition::new("Qty", DbType::Int32))
        .index(IndexDefinition::new(["OrderId", "Qty"]).named("ix_lines_qty"));

    let ms = SqlServerDialect::new();
    let script = CreateTable::from_model(&ms, &def).render().unwrap();
    assert_eq!(
        script.table.sql,
        "CREATE TABLE [sales].[OrderLine] ([OrderId] bigint NOT NULL, [Line] integer NOT NULL, \
         [Qty] integer NOT NULL, PRIMARY KEY ([OrderId], [Line]))"
    );
    assert_eq!(
        script.indexes[0].sql,
        "CREATE INDEX [ix_lines_qty] ON [sales].[OrderLine] ([OrderId], [Qty])"
    );
}

#[test]
fn insert_with_identity_is_a_single_command() {
    let def = ModelDefinition::new("Ticket")
        .field(FieldDefinition::new("id", DbType::Int64).primary_key().auto_increment())
        .field(FieldDefinition::new("code", DbType::String).length(20));

    let pg = PostgresDialect::new();
    let model = InsertStatement::from_model(&pg, &def).set("code", "A1").build().unwrap();
    assert_eq!(model.identity.as_deref(), Some("id"));
    let cmd = pg.render_insert_with_identity(&model).unwrap();
    assert_eq!(cmd.sql, r#"INSERT INTO "ticket" ("code") VALUES ($1) RETURNING "id""#);

    let ms = SqlServerDialect::new();
    let model = InsertStatement::from_model(&ms, &def).set("code", "A1").build().unwrap();
    let cmd = ms.render_insert_with_identity(&model).unwrap();
    assert_eq!(cmd.sql, "INSERT INTO [Ticket] ([code]) VALUES (@p1); SELECT SCOPE_IDENTITY()");
    assert_eq!(cmd.params, vec![Value::from("A1")]);
}

#[test]
fn pg_insert_with_identity_needs_generated_key() {
    let pg = PostgresDialect::new();
    let model = InsertStatement::from_table(&pg, "audit", None).set("note", "x").build().unwrap();
    assert_eq!(model.identity, None);
    let err = pg.render_insert_with_identity(&model).unwrap_err();
    assert!(matches!(err, OrmError::Validation(ref m) if m.contains("auto-increment")), "{err}");
}

#[test]
fn auto_increment_inside_composite_key_is_rejected() {
    let def = ModelDefinition::new("line")
        .field(FieldDefinition::new("id", DbType::Int64).primary_key().auto_increment())
        .field(FieldDefinition::new("tenant", DbType::Int32).primary_key())
        .field(FieldDefinition::new("qty", DbType::Int32));

    for provider in providers() {
        let err = CreateTable::from_model(provider.as_ref(), &def).render().unwrap_err();
        assert!(matches!(err, OrmError::Validation(ref m) if m.contains("only primary key")), "{err}");
    }
}

#[test]
fn sqlserver_paging() {
    let ms = SqlServerDialect::new();
    let cmd = SelectStatement::from_table(&ms, "Users", None).limit(5).render().unwrap();
    assert_eq!(cmd.sql, "SELECT TOP (5) * FROM [Users]");

    let cmd = SelectStatement::from_table(&ms, "Users", None)
        .offset(20)
        .limit(10)
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        "SELECT * FROM [Users] ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    );

    let cmd = SelectStatement::from_table(&ms, "Users", None)
        .order_by(col("Name"))
        .offset(20)
        .render()
        .unwrap();
    assert_eq!(cmd.sql, "SELECT * FROM [Users] ORDER BY [Name] OFFSET 20 ROWS");
}

#[test]
fn postgres_paging() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::from_table(&pg, "users", None)
        .limit(10)
        .offset(30)
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "users" LIMIT 10 OFFSET 30"#);
}

#[test]
fn drop_and_schema_ddl() {
    let pg = PostgresDialect::new();
    let ms = SqlServerDialect::new();
    let table = TableRef::new("orders", Some("public"));

    assert_eq!(pg.drop_table_command(&table, false).sql, r#"DROP TABLE "public"."orders" CASCADE"#);
    assert_eq!(
        pg.drop_table_command(&table, true).sql,
        r#"DROP TABLE IF EXISTS "public"."orders" CASCADE"#
    );
    assert_eq!(ms.drop_table_command(&table, false).sql, "DROP TABLE [public].[orders]");

    assert_eq!(pg.create_schema_command("sales", true).sql, r#"CREATE SCHEMA IF NOT EXISTS "sales""#);
    let cmd = ms.create_schema_command("sales", true);
    assert_eq!(
        cmd.sql,
        "IF SCHEMA_ID(@p1) IS NULL EXEC('CREATE SCHEMA ' + QUOTENAME(@p2))"
    );
    assert_eq!(cmd.params, vec![Value::from("sales"), Value::from("sales")]);
    assert_eq!(ms.create_schema_command("sales", false).sql, "CREATE SCHEMA [sales]");
}

#[test]
fn catalog_queries_bind_names_and_default_the_schema() {
    let pg = PostgresDialect::new();
    let cmd = pg.table_exists_command("orders", None);
    assert!(cmd.sql.contains("current_schema()"));
    assert_eq!(cmd.params, vec![Value::from("orders")]);

    let cmd = pg.table_exists_command("orders", Some("sales"));
    assert!(!cmd.sql.contains("current_schema()"));
    assert_eq!(cmd.params, vec![Value::from("orders"), Value::from("sales")]);

    let cmd = pg.columns_command("orders", None);
    assert_eq!(cmd.params, vec![Value::from("orders")]);
    assert!(cmd.sql.contains("information_schema.columns"));

    let cmd = pg.primary_keys_command("orders", Some("sales"));
    assert_eq!(cmd.params, vec![Value::from(r#""sales"."orders""#)]);

    let ms = SqlServerDialect::new();
    let cmd = ms.tables_command(None, true);
    assert!(cmd.sql.contains("'VIEW'"));
    assert!(cmd.sql.contains("SCHEMA_NAME()"));
    assert!(cmd.params.is_empty());

    let cmd = ms.sequence_exists_command("ticket_seq", Some("dbo"));
    assert_eq!(cmd.sql.matches("@p").count(), cmd.params.len());
}

#[test]
fn pg_catalog_lookups_share_exact_name_matching() {
    // quoted DDL keeps case, so "OrderLine" and "orderline" are different tables
    let pg = PostgresDialect::new();
    let exists = pg.table_exists_command("OrderLine", None);
    let columns = pg.columns_command("OrderLine", None);
    assert_eq!(exists.params, vec![Value::from("OrderLine")]);
    assert_eq!(columns.params, vec![Value::from("OrderLine")]);
    assert!(exists.sql.contains("c.relname = $1"));
    assert!(columns.sql.contains("WHERE table_name = $1"));
    assert!(!columns.sql.contains("lower("));
}

#[test]
fn map_column_row_reads_information_schema_shape() {
    let row = Row::from_pairs([
        ("column_name", Value::from("total")),
        ("data_type", Value::from("numeric")),
        ("is_nullable", Value::from("YES")),
        ("character_maximum_length", Value::Null),
        ("numeric_precision", Value::I64(10)),
        ("numeric_scale", Value::I64(2)),
        ("column_default", Value::Null),
    ]);
    let column = PostgresDialect::new()
        .map_column_row(&row, &["id".to_string()])
        .unwrap();
    assert_eq!(column.name, "total");
    assert_eq!(column.db_type, DbType::Numeric);
    assert!(column.nullable);
    assert!(!column.primary_key);
    assert_eq!(column.length, None);
    assert_eq!(column.precision, Some(10));
    assert_eq!(column.scale, Some(2));
    assert_eq!(column.default_value, None);

    // SQL Server reports -1 for MAX columns
    let row = Row::from_pairs([
        ("COLUMN_NAME", Value::from("Notes")),
        ("DATA_TYPE", Value::from("nvarchar")),
        ("IS_NULLABLE", Value::from("NO")),
        ("CHARACTER_MAXIMUM_LENGTH", Value::I64(-1)),
        ("NUMERIC_PRECISION", Value::Null),
        ("NUMERIC_SCALE", Value::Null),
        ("COLUMN_DEFAULT", Value::from("('')")),
    ]);
    let column = SqlServerDialect::new().map_column_row(&row, &[]).unwrap();
    assert_eq!(column.db_type, DbType::String);
    assert_eq!(column.length, None);
    assert_eq!(column.default_value.as_deref(), Some("('')"));
}

#[test]
fn render_dispatches_on_statement_model() {
    let pg = PostgresDialect::new();
    let model = SelectStatement::from_model(&pg, &orders())
        .filter(&col("total").gt(lit(100)))
        .into_model()
        .unwrap();
    let commands = pg.render(&model).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].sql, r#"SELECT * FROM "public"."orders" WHERE "total" > $1"#);
    assert_eq!(commands[0].table, "orders");

    let model = CreateTable::from_model(&pg, &orders()).into_model().unwrap();
    let commands = pg.render(&model).unwrap();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].sql.starts_with(r#"CREATE TABLE "public"."orders""#));
}

#[test]
fn unsupported_call_produces_no_sql() {
    for provider in providers() {
        let def = orders();
        let filter = Expr::parse("soundex(total) = 1").unwrap();
        let err = SelectStatement::from_model(provider.as_ref(), &def)
            .filter(&filter)
            .render()
            .unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedExpression { .. }), "{err}");
    }
}
