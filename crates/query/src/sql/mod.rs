//! SQL primitives shared by the criteria converter and sort visitor.
//!
//! - `SqlExpression`: a boolean/scalar SQL fragment produced by handlers
//! - `ParameterValue`: a value bound to a named `:placeholder`
//! - `SelectQuery`: the string-fragment SELECT builder everything mutates
//! - `bind`: named-to-positional rewriting for execution and inlining for logs

pub mod bind;
mod select;

pub use select::{FromSource, Join, JoinKind, Parameters, SelectQuery};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A SQL fragment produced by a handler.
///
/// Only built through the explicit constructors below so arbitrary strings
/// cannot silently pass for compiled SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlExpression(String);

impl SqlExpression {
    /// Wrap SQL text that the caller vouches for (identifiers and
    /// placeholders only, never user input).
    pub fn raw(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// A predicate that matches every row.
    pub fn always() -> Self {
        Self::raw("1 = 1")
    }

    /// A predicate that matches no row.
    pub fn never() -> Self {
        Self::raw("1 = 0")
    }

    /// Combine fragments with `AND`, each part parenthesized.
    ///
    /// A single part is returned unchanged; no parts is `1 = 1`.
    pub fn all(parts: impl IntoIterator<Item = SqlExpression>) -> Self {
        Self::composite(parts, "AND").unwrap_or_else(Self::always)
    }

    /// Combine fragments with `OR`, each part parenthesized.
    ///
    /// A single part is returned unchanged; no parts is `1 = 0`.
    pub fn any(parts: impl IntoIterator<Item = SqlExpression>) -> Self {
        Self::composite(parts, "OR").unwrap_or_else(Self::never)
    }

    /// Negate this fragment.
    pub fn not(self) -> Self {
        Self(format!("NOT ({})", self.0))
    }

    /// Borrow the SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the SQL text.
    pub fn into_string(self) -> String {
        self.0
    }

    fn composite(parts: impl IntoIterator<Item = SqlExpression>, operator: &str) -> Option<Self> {
        let mut parts: Vec<SqlExpression> = parts.into_iter().collect();
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => {
                let joined = parts
                    .iter()
                    .map(|p| format!("({})", p.0))
                    .collect::<Vec<_>>()
                    .join(&format!(" {operator} "));
                Some(Self(joined))
            }
        }
    }
}

impl std::fmt::Display for SqlExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value bound to a named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// UUID value.
    Uuid(Uuid),
    /// String value.
    String(String),
    /// List of values, expanded to one placeholder per element when bound.
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    /// Build a list parameter from anything convertible to scalar values.
    pub fn list<T: Into<ParameterValue>>(values: impl IntoIterator<Item = T>) -> Self {
        ParameterValue::List(values.into_iter().map(Into::into).collect())
    }

    /// Whether this value is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, ParameterValue::List(_))
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Integer(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Integer(i64::from(v))
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Boolean(v)
    }
}

impl From<Uuid> for ParameterValue {
    fn from(v: Uuid) -> Self {
        ParameterValue::Uuid(v)
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::String(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterValue {
    fn from(values: Vec<T>) -> Self {
        ParameterValue::list(values)
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Validate a SQL identifier name (table, alias or column).
/// Allows only `[a-zA-Z_][a-zA-Z0-9_]*` with max 63 chars (PostgreSQL limit).
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}
