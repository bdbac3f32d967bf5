//! The value and property-type vocabulary shared by the schema model, the
//! parameter bridge, and the query executor.
//!
//! Centralising this here (rather than scattering `serde_json::Value` or
//! ad-hoc enums through each component) is what keeps the `agtype` decoder in
//! [`crate::executor`] the single place round-trip semantics are defined —
//! see the design note on centralised decoding in `SPEC_FULL.md` §9.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// The property types a [`crate::schema::model::PropertyDefinition`] can
/// declare. Maps to PostgreSQL column types via
/// [`crate::dialect::postgres_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Object,
    Array,
    Any,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::DateTime => "datetime",
            PropertyType::Object => "object",
            PropertyType::Array => "array",
            PropertyType::Any => "any",
        };
        f.write_str(s)
    }
}

/// A dynamically typed value flowing through the bridge and executor.
///
/// This is the crate's native value representation: schema-validated input
/// data, bridge-table payloads, and decoded `agtype` results all converge on
/// this type so there is exactly one place that defines "what a value is".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// The [`PropertyType`] this value would satisfy absent any declared
    /// schema (used for warnings about ambiguous coercions).
    pub fn inferred_type(&self) -> PropertyType {
        match self {
            Value::Null => PropertyType::Any,
            Value::Bool(_) => PropertyType::Boolean,
            Value::Int(_) => PropertyType::Integer,
            Value::Float(_) => PropertyType::Float,
            Value::String(_) => PropertyType::String,
            Value::Date(_) => PropertyType::Date,
            Value::DateTime(_) => PropertyType::DateTime,
            Value::Array(_) => PropertyType::Array,
            Value::Object(_) => PropertyType::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert to `serde_json::Value`, the wire format used for both the
    /// bridge table's `JSON` column and AGE's `agtype` literal parsing.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Build a `Value` from `serde_json::Value`, the inverse of [`Value::to_json`].
    /// Numbers without a fractional part decode as `Int`; this keeps integer
    /// round-trips exact (P7) since JSON itself has no integer/float distinction.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::from_json_scalar_string(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect(),
            ),
        }
    }

    /// Promote a decoded JSON string to `Date`/`DateTime` when it's shaped
    /// like one, so a property round-trips through its original typed form
    /// (P7) instead of degrading to a plain string on the way back from the
    /// database. Falls back to `String` for anything that isn't a strict
    /// `YYYY-MM-DD` or RFC 3339 datetime — a bare date-shaped word like a
    /// version tag should never get silently reinterpreted.
    fn from_json_scalar_string(s: String) -> Value {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
            return Value::DateTime(dt.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            return Value::Date(date);
        }
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
