//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// A result row returned by an [`Executor`](crate::client::Executor).
///
/// Column names are shared between all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a single row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a column by name. Exact match wins; otherwise ASCII case-insensitive.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))?;
        self.values.get(idx)
    }

    pub fn get_idx(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get a column value by name, returning an [`OrmError::Decode`] on failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "no such column"))?;
        T::from_value(value).map_err(|e| match e {
            OrmError::Decode { message, .. } => OrmError::decode(column, message),
            other => other,
        })
    }
}

/// Trait for types that can be constructed from a result [`Row`].
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_fallback() {
        let row = Row::from_pairs([("COLUMN_NAME", "id"), ("column_name", "other")]);
        assert_eq!(row.get("column_name"), Some(&Value::from("other")));
        assert_eq!(row.get("Column_Name"), Some(&Value::from("id")));
    }

    #[test]
    fn try_get_names_the_column_on_failure() {
        let row = Row::from_pairs([("age", Value::from("x"))]);
        let err = row.try_get::<i64>("age").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "age"));
        assert!(row.try_get::<i64>("missing").is_err());
    }
}
