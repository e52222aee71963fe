//! Provider and connection configuration.
//!
//! Configuration is read once at startup, usually from a TOML file:
//!
//! ```toml
//! dialect = "postgres"          # or "sqlserver"
//!
//! [provider]
//! param_prefix = "$"
//! naming = "snake_case"         # verbatim | snake_case | lower_case | upper_case
//! use_unicode = true
//! use_datetime2 = false
//!
//! [connection]
//! command_timeout_secs = 30
//! ```

use crate::dialect::{DialectProvider, PostgresDialect, SqlServerDialect};
use crate::error::{OrmError, OrmResult};
use crate::naming::NamingConvention;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Settings fixed at provider construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// `$` numbers placeholders `$1..`, `?` is positional, anything else renders `<c>p1..`.
    pub param_prefix: char,
    pub naming: NamingConvention,
    /// SQL Server: NVARCHAR/NCHAR instead of VARCHAR/CHAR.
    pub use_unicode: bool,
    /// SQL Server: datetime2 instead of datetime.
    pub use_datetime2: bool,
}

impl ProviderConfig {
    pub fn postgres() -> Self {
        Self {
            param_prefix: '$',
            naming: NamingConvention::SnakeCase,
            use_unicode: true,
            use_datetime2: false,
        }
    }

    pub fn sqlserver() -> Self {
        Self {
            param_prefix: '@',
            naming: NamingConvention::Verbatim,
            use_unicode: true,
            use_datetime2: false,
        }
    }

    pub fn with_param_prefix(mut self, prefix: char) -> Self {
        self.param_prefix = prefix;
        self
    }

    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_unicode(mut self, use_unicode: bool) -> Self {
        self.use_unicode = use_unicode;
        self
    }

    pub fn with_datetime2(mut self, use_datetime2: bool) -> Self {
        self.use_datetime2 = use_datetime2;
        self
    }

    pub fn validate(&self) -> OrmResult<()> {
        let c = self.param_prefix;
        if c.is_alphanumeric() || c.is_whitespace() || c == '_' || c == '\'' || c == '"' {
            return Err(OrmError::Config(format!(
                "param_prefix must be a punctuation character, got {c:?}"
            )));
        }
        Ok(())
    }
}

/// Settings applied to every command a connection executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionConfig {
    pub command_timeout: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "mssql")]
    Sqlserver,
}

/// `[provider]` table; unset keys fall back to the dialect defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    pub param_prefix: Option<char>,
    pub naming: Option<NamingConvention>,
    pub use_unicode: Option<bool>,
    pub use_datetime2: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    pub command_timeout_secs: Option<u64>,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolyormConfig {
    pub dialect: DialectKind,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub connection: ConnectionSection,
}

impl PolyormConfig {
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        let cfg: PolyormConfig = toml::from_str(raw)?;
        cfg.provider_config().validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrmError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let base = match self.dialect {
            DialectKind::Postgres => ProviderConfig::postgres(),
            DialectKind::Sqlserver => ProviderConfig::sqlserver(),
        };
        let p = &self.provider;
        ProviderConfig {
            param_prefix: p.param_prefix.unwrap_or(base.param_prefix),
            naming: p.naming.unwrap_or(base.naming),
            use_unicode: p.use_unicode.unwrap_or(base.use_unicode),
            use_datetime2: p.use_datetime2.unwrap_or(base.use_datetime2),
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            command_timeout: self.connection.command_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Construct the configured provider, shared read-only from here on.
    pub fn build_provider(&self) -> OrmResult<Arc<dyn DialectProvider>> {
        let config = self.provider_config();
        config.validate()?;
        Ok(match self.dialect {
            DialectKind::Postgres => Arc::new(PostgresDialect::with_config(config)),
            DialectKind::Sqlserver => Arc::new(SqlServerDialect::with_config(config)),
        })
    }
}
