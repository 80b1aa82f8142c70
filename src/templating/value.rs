//! Data context values.
//!
//! Record data is a closed variant: a scalar, an object (field mapping) or a
//! sequence. Path resolution is a fold over [`Segment`]s against this type;
//! there is no dynamic attribute lookup beyond it.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::ast::Segment;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Object(BTreeMap<String, Value>),
    Sequence(Vec<Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::Text(s.into()))
    }

    pub fn number(n: impl Into<serde_json::Number>) -> Self {
        Value::Scalar(Scalar::Number(n.into()))
    }

    /// Build a numeric value from a float, preferring an integer
    /// representation when the float has no fractional part.
    pub fn from_f64(n: f64) -> Option<Self> {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            return Some(Value::number(n as i64));
        }
        serde_json::Number::from_f64(n).map(Value::number)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::Null))
    }

    /// Empty string or empty sequence.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Scalar(Scalar::Text(s)) => s.is_empty(),
            Value::Sequence(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Short description of the value's kind for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(Scalar::Null) => "null",
            Value::Scalar(Scalar::Bool(_)) => "boolean",
            Value::Scalar(Scalar::Number(_)) => "number",
            Value::Scalar(Scalar::Text(_)) => "text",
            Value::Scalar(Scalar::Date(_)) => "date",
            Value::Scalar(Scalar::DateTime(_)) => "datetime",
            Value::Object(_) => "object",
            Value::Sequence(_) => "sequence",
        }
    }

    /// Look up a single path segment. Null children resolve to `None`.
    pub fn get(&self, segment: &Segment) -> Option<&Value> {
        let child = match (self, segment) {
            (Value::Object(fields), Segment::Field(name)) => fields.get(name),
            (Value::Sequence(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        };
        child.filter(|v| !v.is_null())
    }

    /// Follow `segments` from this value; `None` if any step is absent.
    pub fn lookup(&self, segments: &[Segment]) -> Option<&Value> {
        segments.iter().try_fold(self, |current, segment| current.get(segment))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Scalar::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Value::Scalar(Scalar::Number(n)),
            serde_json::Value::String(s) => Value::Scalar(Scalar::Text(s)),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::number(n)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Scalar(Scalar::Date(d))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::Scalar(Scalar::DateTime(dt))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Result of resolving an expression: a value, or the missing sentinel.
///
/// Missing is distinct from an empty string and from zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Missing,
    Present(Cow<'a, Value>),
}

impl<'a> Resolved<'a> {
    pub fn owned(value: Value) -> Self {
        Resolved::Present(Cow::Owned(value))
    }

    pub fn borrowed(value: &'a Value) -> Self {
        Resolved::Present(Cow::Borrowed(value))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Resolved::Missing)
    }

    /// Missing, empty string or empty sequence.
    pub fn is_missing_or_empty(&self) -> bool {
        match self {
            Resolved::Missing => true,
            Resolved::Present(v) => v.is_empty(),
        }
    }

    /// Conditional truthiness. Numeric zero is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Resolved::Missing => false,
            Resolved::Present(v) => match v.as_ref() {
                Value::Scalar(Scalar::Bool(b)) => *b,
                Value::Scalar(Scalar::Null) => false,
                other => !other.is_empty(),
            },
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolved::Missing => None,
            Resolved::Present(v) => Some(v.as_ref()),
        }
    }
}
