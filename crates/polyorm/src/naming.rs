//! Naming strategies: logical table/column names to physical identifiers.

use heck::ToSnakeCase;
use serde::Deserialize;
use std::fmt;

/// Maps a logical name (as declared on the model) to the name used in SQL.
pub trait NamingStrategy: Send + Sync + fmt::Debug {
    fn table_name(&self, name: &str) -> String;

    fn column_name(&self, name: &str) -> String;

    fn schema_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Casing convention selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Names are used exactly as declared.
    #[default]
    Verbatim,
    /// `OrderLine` -> `order_line`
    SnakeCase,
    /// `OrderLine` -> `orderline`
    LowerCase,
    /// `OrderLine` -> `ORDERLINE`
    UpperCase,
}

impl NamingConvention {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingConvention::Verbatim => name.to_string(),
            NamingConvention::SnakeCase => name.to_snake_case(),
            NamingConvention::LowerCase => name.to_lowercase(),
            NamingConvention::UpperCase => name.to_uppercase(),
        }
    }
}

impl NamingStrategy for NamingConvention {
    fn table_name(&self, name: &str) -> String {
        self.apply(name)
    }

    fn column_name(&self, name: &str) -> String {
        self.apply(name)
    }
}
