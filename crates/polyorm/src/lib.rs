//! # polyorm
//!
//! A multi-dialect SQL compiler and lightweight ORM for Rust.
//!
//! ## Features
//!
//! - **One model, many backends**: the same statement renders for PostgreSQL and SQL Server
//! - **Parameterized by construction**: values always travel as bound parameters
//! - **Expression trees**: predicates are built with `col(..)` or parsed from text
//! - **Safe defaults**: DELETE and UPDATE require WHERE unless explicitly opted out
//! - **Schema tooling**: CREATE TABLE scripts with indexes and sequences, plus catalog introspection
//!
//! ## Statements
//!
//! ```ignore
//! use polyorm::{col, PostgresDialect, SelectStatement};
//!
//! let pg = PostgresDialect::new();
//! let cmd = SelectStatement::of::<Member>(&pg)
//!     .columns(&["name", "age", "active"])
//!     .filter(&col("age").gt(18).and(col("active").eq(true)))
//!     .limit(10)
//!     .render()?;
//! // SELECT "name", "age", "active" FROM "member" WHERE "age" > $1 AND "active" = $2 LIMIT 10
//! ```
//!
//! ## Connection
//!
//! ```ignore
//! use polyorm::{OrmConnection, PostgresDialect};
//! use std::sync::Arc;
//!
//! let conn = OrmConnection::new(client, Arc::new(PostgresDialect::new()));
//! conn.create_table_if_not_exists::<Member>().await?;
//! conn.insert(&member).await?;
//! let adults: Vec<Member> = conn.select(Some(&col("age").ge(18))).await?;
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod fragment;
pub mod ident;
pub mod introspect;
pub mod model;
pub mod naming;
pub mod pg_client;
pub mod row;
pub mod statement;
pub mod types;
pub mod value;

pub use client::Executor;
pub use config::{ConnectionConfig, PolyormConfig, ProviderConfig};
pub use connection::OrmConnection;
pub use dialect::{CreateTableScript, DialectProvider, PostgresDialect, SqlServerDialect};
pub use error::{OrmError, OrmResult, StatementKind};
pub use expr::{Expr, Operator, call, col, count_all, lit, qcol};
pub use fragment::{Placeholder, SqlCommand, SqlFragment};
pub use introspect::{ColumnDefinition, SchemaIntrospector, TableDefinition};
pub use model::{FieldDefinition, IndexDefinition, Model, ModelDefinition};
pub use naming::{NamingConvention, NamingStrategy};
pub use row::{FromRow, Row};
pub use statement::{
    CreateTable, DeleteStatement, InsertStatement, SelectStatement, StatementModel, TableRef,
    UpdateStatement,
};
pub use types::{DbType, TypeMapper};
pub use value::{FromValue, Value};
