//! Error types for polyorm

use std::fmt;
use thiserror::Error;

/// Result type alias for polyorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// The kind of statement an error or command relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    /// DDL or catalog statements that are not table-shaped (schemas, sequences, drops).
    Other,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::CreateTable => "CREATE TABLE",
            StatementKind::Other => "SQL",
        };
        f.write_str(s)
    }
}

/// Error types for compiling and executing statements
#[derive(Debug, Error)]
pub enum OrmError {
    /// An expression node has no SQL lowering
    #[error("Unsupported expression: {kind}")]
    UnsupportedExpression { kind: String },

    /// No column type mapping for the abstract type on this backend
    #[error("Type not supported by {dialect}: {db_type}")]
    TypeNotSupported {
        db_type: String,
        dialect: &'static str,
    },

    /// CREATE TABLE on a table that already exists
    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    /// Schema mutation on a table that does not exist
    #[error("Table does not exist: {0}")]
    TableMissing(String),

    /// Execution fault with statement context
    #[error("{kind} on '{table}' failed: {source}")]
    OperationFailed {
        kind: StatementKind,
        table: String,
        #[source]
        source: Box<OrmError>,
    },

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create an unsupported-expression error naming the node kind
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedExpression { kind: kind.into() }
    }

    /// Create a type-not-supported error
    pub fn type_not_supported(db_type: impl fmt::Display, dialect: &'static str) -> Self {
        Self::TypeNotSupported {
            db_type: db_type.to_string(),
            dialect,
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an execution fault with the statement kind and target table.
    pub fn operation_failed(kind: StatementKind, table: impl Into<String>, source: OrmError) -> Self {
        Self::OperationFailed {
            kind,
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error (directly or wrapped)
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::OperationFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error happened while compiling, before any SQL was produced.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedExpression { .. } | Self::TypeNotSupported { .. }
        )
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
