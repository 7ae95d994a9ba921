//! Core value types for Strata: field values, keys and versions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar field value.
///
/// Values are totally ordered: null sorts before booleans, booleans before
/// integers and integers before text. Keys rely on this ordering for the
/// key-ordered scans every store must produce.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Parses a literal as typed on a command line.
    ///
    /// `null`, `true` and `false` map to their values, anything that parses
    /// as an `i64` becomes an integer, and everything else is text.
    #[must_use]
    pub fn parse_literal(literal: &str) -> Self {
        match literal {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => other
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(other.to_string())),
        }
    }

    /// Returns true if this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Primary key of a record: the ordered values of its key fields.
///
/// Keys compare lexicographically, field by field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Vec<Value>);

impl Key {
    /// Creates a key from its ordered field values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Creates a single-field key.
    #[must_use]
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// Returns the key field values in order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Returns the number of key fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::single(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::single(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::single(v)
    }
}

/// Record version used for optimistic concurrency control.
///
/// A successful versioned update must install a strictly greater version
/// than the one it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub i64);

impl Version {
    /// Creates a new version.
    #[must_use]
    pub const fn new(version: i64) -> Self {
        Self(version)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_ordering_across_variants() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Bool(true) < Value::Integer(i64::MIN));
        assert!(Value::Integer(i64::MAX) < Value::Text(String::new()));
    }

    #[test]
    fn parse_literal() {
        assert_eq!(Value::parse_literal("null"), Value::Null);
        assert_eq!(Value::parse_literal("true"), Value::Bool(true));
        assert_eq!(Value::parse_literal("-17"), Value::Integer(-17));
        assert_eq!(Value::parse_literal("eu-west"), Value::from("eu-west"));
    }

    #[test]
    fn key_ordering_is_lexicographic() {
        let a = Key::new(vec![Value::from(1), Value::from("b")]);
        let b = Key::new(vec![Value::from(1), Value::from("c")]);
        let c = Key::new(vec![Value::from(2)]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn key_display() {
        let key = Key::new(vec![Value::from(7), Value::from("eu")]);
        assert_eq!(key.to_string(), "[7, \"eu\"]");
        assert_eq!(Key::from(42).to_string(), "[42]");
    }

    #[test]
    fn value_json_is_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Bool(true),
            Value::Integer(3),
            Value::from("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,true,3,"x"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[2], Value::Integer(3));
        assert_eq!(back[3], Value::from("x"));
    }

    #[test]
    fn version_display_and_order() {
        let v = Version::new(5);
        assert_eq!(v.to_string(), "5");
        assert!(v < Version::new(6));
    }
}
