//! SQL identifier quoting and parsing.
//!
//! Each backend delimits identifiers differently (`"name"` on PostgreSQL, `[name]` on
//! SQL Server). [`QuoteStyle`] captures the delimiters; [`Ident`] is a parsed, possibly
//! dotted identifier.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and escape the closing delimiter
//!   by doubling it (`""` / `]]`)
//!
//! # Example
//! ```ignore
//! use polyorm::ident::{Ident, QuoteStyle};
//!
//! let t = Ident::parse(QuoteStyle::DOUBLE_QUOTE, r#"public."Order.Lines""#)?;
//! assert_eq!(t.names(), vec!["public", "Order.Lines"]);
//! # Ok::<(), polyorm::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// Maximum identifier length (conservative limit across backends).
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Opening and closing identifier delimiters of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStyle {
    pub open: char,
    pub close: char,
}

impl QuoteStyle {
    /// ANSI / PostgreSQL: `"name"`.
    pub const DOUBLE_QUOTE: QuoteStyle = QuoteStyle { open: '"', close: '"' };
    /// SQL Server: `[name]`.
    pub const BRACKET: QuoteStyle = QuoteStyle { open: '[', close: ']' };

    /// Quote a single identifier. Dots are not separators here: the whole
    /// string becomes one delimited identifier.
    pub fn quote(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.write_quoted(name, &mut out);
        out
    }

    pub(crate) fn write_quoted(&self, name: &str, out: &mut String) {
        out.push(self.open);
        for ch in name.chars() {
            if ch == self.close {
                out.push(self.close);
            }
            out.push(ch);
        }
        out.push(self.close);
    }

    /// Parse exactly one identifier part (quoted or bare) back to its name.
    pub fn unquote(&self, s: &str) -> OrmResult<String> {
        let mut ident = Ident::parse(*self, s)?;
        if ident.parts.len() != 1 {
            return Err(OrmError::validation(format!(
                "Expected a single identifier, got {} parts",
                ident.parts.len()
            )));
        }
        Ok(ident.parts.remove(0).into_name())
    }
}

/// Reject identifiers that cannot be quoted safely.
pub fn validate_identifier(name: &str) -> OrmResult<()> {
    if name.is_empty() {
        return Err(OrmError::validation("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(OrmError::validation(
            "Identifier cannot contain NUL character",
        ));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(OrmError::validation(format!(
            "Identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes: {name:?}"
        )));
    }
    Ok(())
}

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Unquoted identifier: must match `[A-Za-z_][A-Za-z0-9_$]*`.
    Unquoted(String),
    /// Quoted identifier: allows any characters except NUL.
    Quoted(String),
}

impl IdentPart {
    pub fn name(&self) -> &str {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }

    fn into_name(self) -> String {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// A SQL identifier (column, table, or schema name), possibly dotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table.column`
    /// - Quoted: `"CamelCase"."UserTable"` (or `[CamelCase].[UserTable]`)
    /// - Mixed: `public."UserTable".id`
    pub fn parse(style: QuoteStyle, s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            // Consume '.' between parts (but require there is a next part).
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::validation("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::validation(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&style.open) {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == style.close => {
                            // Escaped delimiter: doubled close char
                            if chars.peek() == Some(&style.close) {
                                chars.next();
                                name.push(style.close);
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let valid = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !valid {
                    return Err(OrmError::validation(format!(
                        "Invalid character in identifier: '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty identifier segment"));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        if parts.is_empty() {
            return Err(OrmError::validation("Empty identifier"));
        }

        Ok(Self { parts })
    }

    /// The unescaped names of every part.
    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(IdentPart::name).collect()
    }

    /// Render the identifier with every part quoted.
    pub fn to_sql(&self, style: QuoteStyle) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            style.write_quoted(part.name(), &mut out);
        }
        out
    }
}
