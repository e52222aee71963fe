//! SQL fragments and rendered commands.
//!
//! A [`SqlFragment`] is a sequence of SQL text and bound values. Fragments are composed
//! by concatenation and never re-parsed, so the placeholder count always equals the
//! number of values. Placeholders are only numbered when the final command is rendered,
//! which means fragments built independently can be combined in any order.

use crate::error::StatementKind;
use crate::value::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Param(Value),
}

/// SQL text interleaved with bound values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    parts: Vec<Part>,
}

impl SqlFragment {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// A fragment of trusted SQL text (identifiers must already be quoted).
    pub fn text(sql: impl Into<String>) -> Self {
        let mut f = Self::new();
        f.push_str(&sql.into());
        f
    }

    /// A fragment holding one placeholder.
    pub fn param(value: impl Into<Value>) -> Self {
        let mut f = Self::new();
        f.push_param(value);
        f
    }

    pub fn push_str(&mut self, sql: &str) {
        if sql.is_empty() {
            return;
        }
        match self.parts.last_mut() {
            Some(Part::Text(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Text(sql.to_string())),
        }
    }

    pub fn push_param(&mut self, value: impl Into<Value>) {
        self.parts.push(Part::Param(value.into()));
    }

    /// Append another fragment, keeping its values in order after ours.
    pub fn append(&mut self, other: SqlFragment) {
        for part in other.parts {
            match part {
                Part::Text(t) => self.push_str(&t),
                Part::Param(v) => self.parts.push(Part::Param(v)),
            }
        }
    }

    /// Surround the fragment with parentheses.
    pub fn wrap_parens(self) -> Self {
        let mut out = SqlFragment::text("(");
        out.append(self);
        out.push_str(")");
        out
    }

    /// Join fragments with a separator.
    pub fn join(fragments: impl IntoIterator<Item = SqlFragment>, sep: &str) -> Self {
        let mut out = SqlFragment::new();
        for (i, f) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            out.append(f);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn param_count(&self) -> usize {
        self.parts.iter().filter(|p| matches!(p, Part::Param(_))).count()
    }

    /// Values in placeholder order.
    pub fn params(&self) -> impl Iterator<Item = &Value> {
        self.parts.iter().filter_map(|p| match p {
            Part::Param(v) => Some(v),
            Part::Text(_) => None,
        })
    }

    /// Render to SQL text with numbered placeholders, collecting values into `params`.
    ///
    /// Numbering continues from `params.len()`, so several fragments can be rendered
    /// into one statement.
    pub fn render_into(&self, style: Placeholder, sql: &mut String, params: &mut Vec<Value>) {
        for part in &self.parts {
            match part {
                Part::Text(t) => sql.push_str(t),
                Part::Param(v) => {
                    params.push(v.clone());
                    style.write(params.len(), sql);
                }
            }
        }
    }

    pub fn render(&self, style: Placeholder) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::with_capacity(self.param_count());
        self.render_into(style, &mut sql, &mut params);
        (sql, params)
    }
}

impl From<&str> for SqlFragment {
    fn from(sql: &str) -> Self {
        SqlFragment::text(sql)
    }
}

/// Placeholder syntax derived from a dialect's parameter prefix.
///
/// - `$` renders `$1, $2, ...`
/// - `?` renders bare positional `?`
/// - any other prefix `c` renders `cp1, cp2, ...` (e.g. `@p1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub prefix: char,
}

impl Placeholder {
    pub const fn new(prefix: char) -> Self {
        Self { prefix }
    }

    /// Write the placeholder for 1-based parameter `index`.
    pub fn write(&self, index: usize, out: &mut String) {
        use std::fmt::Write as _;
        match self.prefix {
            '$' => {
                let _ = write!(out, "${index}");
            }
            '?' => out.push('?'),
            c => {
                let _ = write!(out, "{c}p{index}");
            }
        }
    }

    pub fn format(&self, index: usize) -> String {
        let mut s = String::new();
        self.write(index, &mut s);
        s
    }
}

/// A rendered statement ready for an [`Executor`](crate::client::Executor).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    pub sql: String,
    pub params: Vec<Value>,
    pub timeout: Option<Duration>,
    pub kind: StatementKind,
    /// Target table, used for error context and logging.
    pub table: String,
}

impl SqlCommand {
    pub fn new(kind: StatementKind, table: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            timeout: None,
            kind,
            table: table.into(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render a fragment into a command.
    pub fn from_fragment(
        kind: StatementKind,
        table: impl Into<String>,
        fragment: &SqlFragment,
        style: Placeholder,
    ) -> Self {
        let (sql, params) = fragment.render(style);
        Self::new(kind, table, sql).with_params(params)
    }
}

impl fmt::Display for SqlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
