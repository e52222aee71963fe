//! Abstract column types and per-dialect type mapping.
//!
//! A [`TypeMapper`] turns a [`DbType`] plus optional length/precision/scale into the
//! column-type text of one backend. There is no shared default table: every backend
//! supplies its own, and unmapped combinations fail with
//! [`OrmError::TypeNotSupported`](crate::OrmError::TypeNotSupported).

mod postgres;
mod sqlserver;

pub use postgres::PostgresTypeMapper;
pub use sqlserver::SqlServerTypeMapper;

use crate::error::OrmResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of abstract column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbType {
    /// Variable-length string.
    String,
    /// Fixed-length string.
    FixedString,
    /// Unbounded text.
    Text,
    Boolean,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Currency,
    /// Exact decimal with precision/scale.
    Decimal,
    /// Variable numeric with precision/scale.
    Numeric,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    Guid,
    Binary,
    Xml,
    /// Anything the catalog reports that has no abstract counterpart.
    Object,
}

impl DbType {
    pub fn is_integer(&self) -> bool {
        matches!(self, DbType::Int16 | DbType::Int32 | DbType::Int64)
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Maps abstract types to backend column-type text.
pub trait TypeMapper: Send + Sync + fmt::Debug {
    /// Column type for a plain (non auto-increment) column.
    fn column_type(
        &self,
        db_type: DbType,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> OrmResult<String>;

    /// Column type for a backend-assigned key column.
    fn auto_increment_type(&self, db_type: DbType) -> OrmResult<String>;

    /// Reverse mapping of a catalog `data_type` to the abstract type.
    ///
    /// Unknown names map to [`DbType::Object`].
    fn map_data_type(&self, data_type: &str) -> DbType;
}

/// Lowercase, drop `(...)` typmods and collapse whitespace: `VARCHAR(255)` -> `varchar`.
pub(crate) fn normalize_type_name(name: &str) -> String {
    let mut s = name.trim().to_lowercase();

    while let Some(start) = s.find('(') {
        let Some(end) = s[start..].find(')') else {
            break;
        };
        s.replace_range(start..start + end + 1, "");
    }

    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
