//! Builder tests rendered through both dialects.

use super::*;
use crate::config::ProviderConfig;
use crate::dialect::{PostgresDialect, SqlServerDialect};
use crate::expr::{col, count_all, qcol};
use crate::model::FieldDefinition;
use crate::types::DbType;
use std::sync::LazyLock;

struct Person {
    id: i32,
    name: String,
    age: i32,
    active: bool,
}

static PERSON: LazyLock<ModelDefinition> = LazyLock::new(|| {
    ModelDefinition::new("Person")
        .field(FieldDefinition::new("id", DbType::Int32).primary_key().auto_increment())
        .field(FieldDefinition::new("name", DbType::String).length(50))
        .field(FieldDefinition::new("age", DbType::Int32))
        .field(FieldDefinition::new("active", DbType::Boolean))
});

impl Model for Person {
    fn model_definition() -> &'static ModelDefinition {
        &PERSON
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "age" => Some(self.age.into()),
            "active" => Some(self.active.into()),
            _ => None,
        }
    }
}

struct Member;

static MEMBER: LazyLock<ModelDefinition> = LazyLock::new(|| {
    ModelDefinition::new("member")
        .field(FieldDefinition::new("name", DbType::String))
        .field(FieldDefinition::new("age", DbType::Int32))
        .field(FieldDefinition::new("active", DbType::Boolean))
});

impl Model for Member {
    fn model_definition() -> &'static ModelDefinition {
        &MEMBER
    }

    fn field_value(&self, _field: &str) -> Option<Value> {
        None
    }
}

fn alice() -> Person {
    Person {
        id: 1,
        name: "Alice".to_string(),
        age: 30,
        active: true,
    }
}

fn adults() -> Expr {
    col("age").gt(18).and(col("active").eq(true))
}

// ==================== SELECT ====================

#[test]
fn select_three_field_model_with_limit() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::of::<Member>(&pg)
        .columns(&["name", "age", "active"])
        .filter(&adults())
        .limit(10)
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        r#"SELECT "name", "age", "active" FROM "member" WHERE "age" > $1 AND "active" = $2 LIMIT 10"#
    );
    assert_eq!(cmd.params, vec![Value::I32(18), Value::Bool(true)]);
    assert_eq!(cmd.kind, StatementKind::Select);

    // without an explicit projection every column is selected
    let cmd = SelectStatement::of::<Member>(&pg).filter(&adults()).render().unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "member" WHERE "age" > $1 AND "active" = $2"#);

    let ms = SqlServerDialect::new();
    let cmd = SelectStatement::of::<Member>(&ms)
        .columns(&["name", "age", "active"])
        .filter(&adults())
        .limit(10)
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        "SELECT TOP (10) [name], [age], [active] FROM [member] WHERE [age] > @p1 AND [active] = @p2"
    );
    assert_eq!(cmd.params, vec![Value::I32(18), Value::Bool(true)]);
}

#[test]
fn placeholder_count_matches_params_for_every_prefix() {
    for prefix in ['$', '?', ':', '@'] {
        let provider = PostgresDialect::with_config(ProviderConfig::postgres().with_param_prefix(prefix));
        let cmd = SelectStatement::of::<Person>(&provider)
            .filter(&adults().or(col("name").starts_with("A")))
            .render()
            .unwrap();
        assert_eq!(cmd.params.len(), 3);
        let placeholders = match prefix {
            '$' => cmd.sql.matches('$').count(),
            '?' => cmd.sql.matches('?').count(),
            c => cmd.sql.matches(&format!("{c}p")).count(),
        };
        assert_eq!(placeholders, cmd.params.len(), "{}", cmd.sql);
    }
}

#[test]
fn rendering_is_deterministic() {
    let pg = PostgresDialect::new();
    let model = SelectStatement::of::<Person>(&pg)
        .filter(&adults())
        .order_by_desc(col("age"))
        .build()
        .unwrap();
    let first = pg.render_select(&model).unwrap();
    let second = pg.render_select(&model).unwrap();
    assert_eq!(first, second);
}

#[test]
fn predicate_string_matches_expression_tree() {
    let pg = PostgresDialect::new();
    let from_tree = SelectStatement::of::<Person>(&pg).filter(&adults()).render().unwrap();
    let from_text = SelectStatement::of::<Person>(&pg)
        .filter_str("age > 18 && active == true")
        .render()
        .unwrap();
    assert_eq!(from_tree.sql, from_text.sql);
}

#[test]
fn or_filters_are_grouped_before_and_combination() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::of::<Person>(&pg)
        .filter(&col("age").lt(18).or(col("age").gt(65)))
        .filter(&col("active"))
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        r#"SELECT * FROM "person" WHERE ("age" < $1 OR "age" > $2) AND "active" = $3"#
    );
    assert_eq!(cmd.params[2], Value::Bool(true));
}

#[test]
fn null_in_and_like_lowering() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::of::<Person>(&pg)
        .filter(&col("name").is_not_null())
        .filter(&col("age").in_list([20, 30]))
        .filter(&col("name").starts_with("50%"))
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        r#"SELECT * FROM "person" WHERE "name" IS NOT NULL AND "age" IN ($1, $2) AND "name" LIKE $3 ESCAPE '\'"#
    );
    assert_eq!(cmd.params[2], Value::from("50\\%%"));

    let cmd = SelectStatement::of::<Person>(&pg)
        .filter(&col("age").in_list(Vec::<i32>::new()))
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "person" WHERE 1=0"#);
    assert!(cmd.params.is_empty());
}

#[test]
fn negation_and_arithmetic() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::of::<Person>(&pg)
        .filter(&col("active").not())
        .filter(&col("age").add(1).mul(2).ge(40))
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        r#"SELECT * FROM "person" WHERE NOT ("active" = $1) AND ("age" + $2) * $3 >= $4"#
    );
}

#[test]
fn negation_as_comparison_operand_keeps_its_scope() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::from_table(&pg, "t", None)
        .filter(&col("a").not().eq(false))
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "t" WHERE (NOT ("a" = $1)) = $2"#);
    assert_eq!(cmd.params, vec![Value::Bool(true), Value::Bool(false)]);

    let cmd = SelectStatement::from_table(&pg, "t", None)
        .filter(&col("a").not().and(col("b").gt(1)))
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "t" WHERE NOT ("a" = $1) AND "b" > $2"#);
}

#[test]
fn joins_grouping_and_ordering() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::of::<Person>(&pg)
        .inner_join("Pet", &qcol("Pet", "ownerId").eq(qcol("Person", "id")))
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        r#"SELECT * FROM "person" INNER JOIN "pet" ON "pet"."owner_id" = "person"."id""#
    );

    let cmd = SelectStatement::of::<Person>(&pg)
        .select([col("age"), count_all()])
        .group_by([col("age")])
        .having(&count_all().gt(1))
        .order_by_desc(col("age"))
        .render()
        .unwrap();
    assert_eq!(
        cmd.sql,
        r#"SELECT "age", COUNT(*) FROM "person" GROUP BY "age" HAVING COUNT(*) > $1 ORDER BY "age" DESC"#
    );

    let cmd = SelectStatement::of::<Person>(&pg).distinct().columns(&["name"]).render().unwrap();
    assert_eq!(cmd.sql, r#"SELECT DISTINCT "name" FROM "person""#);
}

#[test]
fn dynamic_table_with_schema() {
    let pg = PostgresDialect::new();
    let cmd = SelectStatement::from_table(&pg, "Orders", Some("public"))
        .filter(&col("customerId").eq(7))
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"SELECT * FROM "public"."orders" WHERE "customer_id" = $1"#);
    assert_eq!(cmd.table, "orders");
}

#[test]
fn first_error_wins_and_no_sql_is_rendered() {
    let pg = PostgresDialect::new();
    let err = SelectStatement::of::<Person>(&pg)
        .filter(&col("nickname").eq("x"))
        .filter(&Expr::parse("soundex(name) = 1").unwrap())
        .render()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)), "{err}");

    let err = SelectStatement::of::<Person>(&pg)
        .filter_str("age >")
        .render()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn member_access_is_unsupported() {
    let pg = PostgresDialect::new();
    let err = SelectStatement::of::<Person>(&pg)
        .filter_str("name.length.value > 3")
        .render()
        .unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedExpression { .. }), "{err}");
}

// ==================== INSERT ====================

#[test]
fn insert_skips_auto_increment_fields() {
    let pg = PostgresDialect::new();
    let cmd = InsertStatement::of::<Person>(&pg).values(&alice()).render().unwrap();
    assert_eq!(
        cmd.sql,
        r#"INSERT INTO "person" ("name", "age", "active") VALUES ($1, $2, $3)"#
    );
    assert_eq!(cmd.params, vec![Value::from("Alice"), Value::I32(30), Value::Bool(true)]);

    let ms = SqlServerDialect::new();
    let cmd = InsertStatement::of::<Person>(&ms)
        .values(&alice())
        .only(&["name"])
        .render()
        .unwrap();
    assert_eq!(cmd.sql, "INSERT INTO [Person] ([name]) VALUES (@p1)");
}

#[test]
fn insert_rejects_auto_increment_and_foreign_models() {
    let pg = PostgresDialect::new();
    let err = InsertStatement::of::<Person>(&pg).set("id", 5).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = InsertStatement::of::<Member>(&pg).values(&alice()).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = InsertStatement::of::<Person>(&pg).only(&["nickname"]).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn insert_without_columns_uses_default_values() {
    let pg = PostgresDialect::new();
    let cmd = InsertStatement::from_table(&pg, "audit", None).render().unwrap();
    assert_eq!(cmd.sql, r#"INSERT INTO "audit" DEFAULT VALUES"#);
}

// ==================== UPDATE ====================

#[test]
fn update_by_primary_key() {
    let pg = PostgresDialect::new();
    let cmd = UpdateStatement::of::<Person>(&pg).values(&alice()).render().unwrap();
    assert_eq!(
        cmd.sql,
        r#"UPDATE "person" SET "name" = $1, "age" = $2, "active" = $3 WHERE "id" = $4"#
    );
    assert_eq!(cmd.params[3], Value::I32(1));

    let cmd = UpdateStatement::of::<Person>(&pg)
        .values(&alice())
        .only(&["age"])
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"UPDATE "person" SET "age" = $1 WHERE "id" = $2"#);
}

#[test]
fn update_with_expression() {
    let ms = SqlServerDialect::new();
    let cmd = UpdateStatement::of::<Person>(&ms)
        .set_expr("age", &col("age").add(1))
        .filter(&col("id").eq(7))
        .render()
        .unwrap();
    assert_eq!(cmd.sql, "UPDATE [Person] SET [age] = [age] + @p1 WHERE [id] = @p2");
    assert_eq!(cmd.kind, StatementKind::Update);
}

#[test]
fn update_safe_defaults() {
    let pg = PostgresDialect::new();
    let err = UpdateStatement::of::<Person>(&pg)
        .filter(&col("id").eq(1))
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = UpdateStatement::of::<Person>(&pg).set("age", 3).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let cmd = UpdateStatement::of::<Person>(&pg).set("age", 3).allow_all().render().unwrap();
    assert_eq!(cmd.sql, r#"UPDATE "person" SET "age" = $1"#);

    let err = UpdateStatement::of::<Person>(&pg)
        .set("id", 3)
        .allow_all()
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

// ==================== DELETE ====================

#[test]
fn delete_by_instance_and_filter() {
    let pg = PostgresDialect::new();
    let cmd = DeleteStatement::of::<Person>(&pg).instance(&alice()).render().unwrap();
    assert_eq!(cmd.sql, r#"DELETE FROM "person" WHERE "id" = $1"#);
    assert_eq!(cmd.params, vec![Value::I32(1)]);

    let cmd = DeleteStatement::of::<Person>(&pg)
        .filter(&col("active").eq(false))
        .filter_str("age < 18")
        .render()
        .unwrap();
    assert_eq!(cmd.sql, r#"DELETE FROM "person" WHERE "active" = $1 AND "age" < $2"#);
}

#[test]
fn delete_safe_defaults() {
    let pg = PostgresDialect::new();
    let err = DeleteStatement::of::<Person>(&pg).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let cmd = DeleteStatement::of::<Person>(&pg).allow_all().render().unwrap();
    assert_eq!(cmd.sql, r#"DELETE FROM "person""#);

    // Member has no primary key to target
    let err = DeleteStatement::of::<Member>(&pg).instance(&Member).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

// ==================== models ====================

#[test]
fn statement_model_kind_and_table() {
    let pg = PostgresDialect::new();
    let model = DeleteStatement::of::<Person>(&pg).allow_all().into_model().unwrap();
    assert_eq!(model.kind(), StatementKind::Delete);
    assert_eq!(model.table(), &TableRef::new("person", None));

    let model = CreateTable::of::<Person>(&pg).into_model().unwrap();
    assert_eq!(model.kind(), StatementKind::CreateTable);
}

#[test]
fn invalid_model_fails_every_builder() {
    static BROKEN: LazyLock<ModelDefinition> = LazyLock::new(|| {
        ModelDefinition::new("broken")
            .field(FieldDefinition::new("a", DbType::Int32))
            .field(FieldDefinition::new("a", DbType::Int32))
    });
    let pg = PostgresDialect::new();
    assert!(SelectStatement::from_model(&pg, &BROKEN).build().is_err());
    assert!(DeleteStatement::from_model(&pg, &BROKEN).allow_all().build().is_err());
    assert!(CreateTable::from_model(&pg, &BROKEN).build().is_err());
}
