//! Relational dialect helpers (C1).
//!
//! Pure functions for quoting identifiers, escaping string literals, and
//! formatting values for the PostgreSQL/AGE dialect. Grounded on the
//! teacher's `db/escape.rs` (string escaping) and
//! `db/schema/definition.rs::DataType::{cozo_type, age_type}` (type mapping),
//! generalized from the teacher's Cozo-flavoured escaping to Postgres
//! identifier/string quoting and from a four-variant `DataType` to the full
//! `PropertyType` vocabulary.

use crate::value::{PropertyType, Value};

/// Double any embedded `"` and wrap in `"…"`, the standard SQL identifier
/// quoting rule (`CREATE TABLE "my table"`, `SELECT "Col""With""Quotes"`).
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Double any embedded single quote, the standard SQL string-literal escape.
pub fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Format a [`Value`] as a SQL literal: `NULL`, `TRUE`/`FALSE`, a quoted
/// ISO-8601 date/timestamp, quoted escaped text, or raw decimal text for
/// numbers. Arrays/objects are rendered as quoted JSON text, since plain SQL
/// literals have no array/object syntax of their own in this dialect.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("'{}'", escape_string(s)),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::DateTime(dt) => format!("'{}'", dt.to_rfc3339()),
        Value::Array(_) | Value::Object(_) => format!("'{}'", escape_string(&value.to_json().to_string())),
    }
}

/// Map a [`PropertyType`] to its PostgreSQL column type, per §4.1.
pub fn postgres_type(property_type: PropertyType) -> &'static str {
    match property_type {
        PropertyType::String => "TEXT",
        PropertyType::Number => "DOUBLE PRECISION",
        PropertyType::Integer => "INTEGER",
        PropertyType::Float => "DOUBLE PRECISION",
        PropertyType::Boolean => "BOOLEAN",
        PropertyType::Date => "DATE",
        PropertyType::DateTime => "TIMESTAMP WITH TIME ZONE",
        PropertyType::Object | PropertyType::Array => "JSON",
        PropertyType::Any => "TEXT",
    }
}

/// Strict identifier syntax required for labels/property names placed where
/// AGE requires an unquoted Cypher identifier (`[A-Za-z_][A-Za-z0-9_]*`).
/// Used by the parameter bridge (key names) and the query template generator
/// (labels, property names) to reject anything that could escape the
/// generated Cypher body.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
