//! Schema validation (C4): checking a [`GraphData`] batch against a
//! [`Schema`] before it ever reaches the database.
//!
//! There is no direct teacher analogue for data validation (the teacher's
//! schema module only generates documentation/DDL from a fixed, already-valid
//! relation list), so this module is grounded on the teacher's general
//! "collect results, report paths" idiom used throughout `db/schema` and
//! extended to the fail-fast/collect-all dual mode spec §4.4 requires.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use super::model::{Constraints, GraphData, PropertyDefinition, Schema};
use crate::value::{PropertyType, Value};

/// Controls how [`validate`] behaves.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Stop at the first error instead of collecting every one.
    pub fail_fast: bool,
    /// Don't warn about properties present in the data but absent from the
    /// schema; still validated as `Any` if a schema entry is found nowhere.
    pub allow_unknown_properties: bool,
    /// Skip the from/to referential check for edges (§4.4).
    pub skip_referential_check: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { fail_fast: false, allow_unknown_properties: false, skip_referential_check: false }
    }
}

/// A single validation failure, with a JSON-pointer-ish path and message.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The outcome of [`validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

macro_rules! fail_fast_return {
    ($opts:expr, $errors:expr) => {
        if $opts.fail_fast && !$errors.is_empty() {
            return ValidationReport { valid: false, errors: $errors, warnings: Vec::new() };
        }
    };
}

/// Validate `data` against `schema`. In fail-fast mode, returns as soon as
/// the first error is recorded; in collect-all mode (the default), every
/// error across the whole batch is gathered before returning.
pub fn validate(data: &GraphData, schema: &Schema, opts: &ValidateOptions) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (label, rows) in &data.vertices {
        let Some(vertex_label) = schema.vertices.get(label) else {
            errors.push(ValidationError {
                path: format!("/vertices/{}", label),
                message: format!("unknown vertex label '{}'", label),
            });
            fail_fast_return!(opts, errors);
            continue;
        };
        for (i, row) in rows.iter().enumerate() {
            let path = format!("/vertices/{}/{}", label, i);
            validate_properties(
                &path,
                row,
                &vertex_label.properties,
                &vertex_label.required,
                opts,
                &mut errors,
                &mut warnings,
            );
            fail_fast_return!(opts, errors);
        }
    }

    for (label, records) in &data.edges {
        let Some(edge_label) = schema.edges.get(label) else {
            errors.push(ValidationError {
                path: format!("/edges/{}", label),
                message: format!("unknown edge label '{}'", label),
            });
            fail_fast_return!(opts, errors);
            continue;
        };
        for (i, record) in records.iter().enumerate() {
            let path = format!("/edges/{}/{}", label, i);
            if record.from.is_null() {
                errors.push(ValidationError { path: path.clone(), message: "missing required property: from".into() });
            }
            if record.to.is_null() {
                errors.push(ValidationError { path: path.clone(), message: "missing required property: to".into() });
            }
            fail_fast_return!(opts, errors);

            validate_properties(
                &path,
                &record.properties,
                &edge_label.properties,
                &edge_label.required,
                opts,
                &mut errors,
                &mut warnings,
            );
            fail_fast_return!(opts, errors);

            if !opts.skip_referential_check {
                if let Some(rows) = data.vertices.get(&edge_label.from_label) {
                    if !vertex_ids_contain(rows, &record.from) {
                        errors.push(ValidationError {
                            path: path.clone(),
                            message: format!(
                                "edge 'from' value not found among batch vertices of label '{}'",
                                edge_label.from_label
                            ),
                        });
                    }
                }
                if let Some(rows) = data.vertices.get(&edge_label.to_label) {
                    if !vertex_ids_contain(rows, &record.to) {
                        errors.push(ValidationError {
                            path,
                            message: format!(
                                "edge 'to' value not found among batch vertices of label '{}'",
                                edge_label.to_label
                            ),
                        });
                    }
                }
                fail_fast_return!(opts, errors);
            }
        }
    }

    ValidationReport { valid: errors.is_empty(), errors, warnings }
}

/// Whether any row's `id` property equals `needle`. Referential checks only
/// apply to vertices present in the same batch, per §4.4.
fn vertex_ids_contain(rows: &[BTreeMap<String, Value>], needle: &Value) -> bool {
    rows.iter().any(|row| row.get("id") == Some(needle))
}

fn validate_properties(
    path: &str,
    row: &BTreeMap<String, Value>,
    properties: &BTreeMap<String, PropertyDefinition>,
    required: &std::collections::BTreeSet<String>,
    opts: &ValidateOptions,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<String>,
) {
    for name in required {
        if !row.contains_key(name) || row.get(name).map(Value::is_null).unwrap_or(true) {
            errors.push(ValidationError {
                path: path.to_string(),
                message: format!("Missing required property: {}", name),
            });
            if opts.fail_fast {
                return;
            }
        }
    }

    for (name, value) in row {
        match properties.get(name) {
            Some(def) => {
                if let Err(message) = check_property(value, def) {
                    errors.push(ValidationError { path: format!("{}/{}", path, name), message });
                    if opts.fail_fast {
                        return;
                    }
                }
            }
            None => {
                if opts.allow_unknown_properties {
                    warnings.push(format!("{}: unknown property '{}' (allowed)", path, name));
                } else {
                    errors.push(ValidationError {
                        path: format!("{}/{}", path, name),
                        message: format!("unknown property '{}'", name),
                    });
                    if opts.fail_fast {
                        return;
                    }
                }
            }
        }
    }
}

fn check_property(value: &Value, def: &PropertyDefinition) -> Result<(), String> {
    if value.is_null() {
        return if def.nullable { Ok(()) } else { Err("value is null but property is not nullable".into()) };
    }

    if !type_matches(value, def.property_type) {
        return Err(format!(
            "expected type {}, got {}",
            def.property_type,
            value.inferred_type()
        ));
    }

    if let Some(constraints) = &def.constraints {
        check_constraints(value, constraints)?;
    }

    Ok(())
}

/// Whether `value`'s runtime shape is acceptable for `expected`. `Any`
/// accepts everything; `Number` accepts both `Int` and `Float`.
fn type_matches(value: &Value, expected: PropertyType) -> bool {
    match expected {
        PropertyType::Any => true,
        PropertyType::Number => matches!(value, Value::Int(_) | Value::Float(_)),
        PropertyType::Integer => matches!(value, Value::Int(_)),
        PropertyType::Float => matches!(value, Value::Int(_) | Value::Float(_)),
        PropertyType::String => matches!(value, Value::String(_)),
        PropertyType::Boolean => matches!(value, Value::Bool(_)),
        PropertyType::Date => matches!(value, Value::Date(_) | Value::String(_)),
        PropertyType::DateTime => matches!(value, Value::DateTime(_) | Value::String(_)),
        PropertyType::Object => matches!(value, Value::Object(_)),
        PropertyType::Array => matches!(value, Value::Array(_)),
    }
}

fn check_constraints(value: &Value, constraints: &Constraints) -> Result<(), String> {
    match constraints {
        Constraints::String(c) => {
            let s = value.as_str().unwrap_or_default();
            if let Some(min) = c.min_length {
                if s.len() < min {
                    return Err(format!("string shorter than minLength {}", min));
                }
            }
            if let Some(max) = c.max_length {
                if s.len() > max {
                    return Err(format!("string longer than maxLength {}", max));
                }
            }
            if let Some(pattern) = &c.pattern {
                let re = Regex::new(pattern).map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;
                if !re.is_match(s) {
                    return Err(format!("string does not match pattern '{}'", pattern));
                }
            }
            if let Some(values) = &c.enum_values {
                if !values.iter().any(|v| v == s) {
                    return Err(format!("value '{}' not in enum {:?}", s, values));
                }
            }
            Ok(())
        }
        Constraints::Number(c) => {
            let n = value.as_f64().unwrap_or(f64::NAN);
            if let Some(min) = c.minimum {
                let ok = if c.exclusive_minimum { n > min } else { n >= min };
                if !ok {
                    return Err(format!("value {} below minimum {}", n, min));
                }
            }
            if let Some(max) = c.maximum {
                let ok = if c.exclusive_maximum { n < max } else { n <= max };
                if !ok {
                    return Err(format!("value {} above maximum {}", n, max));
                }
            }
            if let Some(multiple_of) = c.multiple_of {
                if multiple_of != 0.0 && (n / multiple_of).fract().abs() > f64::EPSILON {
                    return Err(format!("value {} is not a multiple of {}", n, multiple_of));
                }
            }
            if let Some(values) = &c.enum_values {
                if !values.iter().any(|v| (*v - n).abs() < f64::EPSILON) {
                    return Err(format!("value {} not in enum {:?}", n, values));
                }
            }
            Ok(())
        }
        Constraints::Array(c) => {
            let items = value.as_array().unwrap_or_default();
            if let Some(min) = c.min_items {
                if items.len() < min {
                    return Err(format!("array shorter than minItems {}", min));
                }
            }
            if let Some(max) = c.max_items {
                if items.len() > max {
                    return Err(format!("array longer than maxItems {}", max));
                }
            }
            if c.unique_items {
                for (i, a) in items.iter().enumerate() {
                    if items[..i].iter().any(|b| b == a) {
                        return Err("array items are not unique".into());
                    }
                }
            }
            if let Some(item_def) = &c.items {
                for item in items {
                    check_property(item, item_def)?;
                }
            }
            Ok(())
        }
        Constraints::Object(c) => {
            let obj = value.as_object().cloned().unwrap_or_default();
            for name in &c.required {
                if !obj.contains_key(name) {
                    return Err(format!("missing required nested property '{}'", name));
                }
            }
            for (name, nested_value) in &obj {
                if let Some(nested_def) = c.properties.get(name) {
                    check_property(nested_value, nested_def)?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{EdgeRecord, SchemaVersion, VertexLabel};

    fn person_schema() -> Schema {
        Schema::new(SchemaVersion::new(1, 0, 0)).with_vertex(
            VertexLabel::new("Person")
                .with_property("id", PropertyDefinition::new(PropertyType::String), true)
                .with_property("name", PropertyDefinition::new(PropertyType::String), true)
                .with_property("age", PropertyDefinition::new(PropertyType::Integer), false),
        )
    }

    #[test]
    fn valid_batch_passes() {
        let schema = person_schema();
        let mut data = GraphData::new();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::from("1"));
        row.insert("name".to_string(), Value::from("Alice"));
        row.insert("age".to_string(), Value::from(30i64));
        data.add_vertex("Person", row);

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn missing_required_property_reported_with_message() {
        let schema = person_schema();
        let mut data = GraphData::new();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::from("1"));
        data.add_vertex("Person", row);

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.message.contains("Missing required property: name")));
    }

    #[test]
    fn fail_fast_stops_at_first_error() {
        let schema = person_schema();
        let mut data = GraphData::new();
        data.add_vertex("Person", BTreeMap::new());
        data.add_vertex("Person", BTreeMap::new());

        let opts = ValidateOptions { fail_fast: true, ..Default::default() };
        let report = validate(&data, &schema, &opts);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn collect_all_gathers_every_error() {
        let schema = person_schema();
        let mut data = GraphData::new();
        data.add_vertex("Person", BTreeMap::new());
        data.add_vertex("Person", BTreeMap::new());

        let report = validate(&data, &schema, &ValidateOptions::default());
        // Two rows, each missing both "id" and "name" => 4 errors.
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn unknown_property_is_error_by_default_but_warning_when_allowed() {
        let schema = person_schema();
        let mut data = GraphData::new();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::from("1"));
        row.insert("name".to_string(), Value::from("Alice"));
        row.insert("nickname".to_string(), Value::from("Al"));
        data.add_vertex("Person", row.clone());

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);

        let mut data2 = GraphData::new();
        data2.add_vertex("Person", row);
        let opts = ValidateOptions { allow_unknown_properties: true, ..Default::default() };
        let report2 = validate(&data2, &schema, &opts);
        assert!(report2.valid);
        assert!(!report2.warnings.is_empty());
    }

    #[test]
    fn unknown_vertex_label_is_error() {
        let schema = person_schema();
        let mut data = GraphData::new();
        data.add_vertex("Ghost", BTreeMap::new());
        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);
        assert!(report.errors[0].message.contains("unknown vertex label"));
    }

    #[test]
    fn edge_missing_from_to_is_error() {
        let mut schema = person_schema();
        schema.vertices.insert("Company".to_string(), VertexLabel::new("Company"));
        schema.edges.insert(
            "WORKS_AT".to_string(),
            super::super::model::EdgeLabel::new("WORKS_AT", "Person", "Company"),
        );

        let mut data = GraphData::new();
        data.add_edge("WORKS_AT", EdgeRecord { from: Value::Null, to: Value::from("3"), properties: BTreeMap::new() });

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.message.contains("missing required property: from")));
    }

    #[test]
    fn edge_referential_check_flags_missing_vertex() {
        let mut schema = person_schema();
        schema.vertices.insert("Company".to_string(), VertexLabel::new("Company"));
        schema.edges.insert(
            "WORKS_AT".to_string(),
            super::super::model::EdgeLabel::new("WORKS_AT", "Person", "Company"),
        );

        let mut data = GraphData::new();
        let mut person = BTreeMap::new();
        person.insert("id".to_string(), Value::from("1"));
        person.insert("name".to_string(), Value::from("Alice"));
        data.add_vertex("Person", person);
        data.add_vertex("Company", BTreeMap::new()); // no "id"
        data.add_edge("WORKS_AT", EdgeRecord::new("1", "missing-id"));

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.message.contains("'to' value not found")));
    }

    #[test]
    fn edge_referential_check_can_be_disabled() {
        let mut schema = person_schema();
        schema.vertices.insert("Company".to_string(), VertexLabel::new("Company"));
        schema.edges.insert(
            "WORKS_AT".to_string(),
            super::super::model::EdgeLabel::new("WORKS_AT", "Person", "Company"),
        );

        let mut data = GraphData::new();
        let mut person = BTreeMap::new();
        person.insert("id".to_string(), Value::from("1"));
        person.insert("name".to_string(), Value::from("Alice"));
        data.add_vertex("Person", person);
        data.add_edge("WORKS_AT", EdgeRecord::new("1", "nonexistent"));

        let opts = ValidateOptions { skip_referential_check: true, ..Default::default() };
        let report = validate(&data, &schema, &opts);
        assert!(report.valid);
    }

    #[test]
    fn string_pattern_constraint_enforced() {
        let schema = Schema::new(SchemaVersion::new(1, 0, 0)).with_vertex(
            VertexLabel::new("Person").with_property(
                "id",
                PropertyDefinition::new(PropertyType::String).with_constraints(Constraints::String(
                    super::super::model::StringConstraints {
                        pattern: Some("^[0-9]+$".to_string()),
                        ..Default::default()
                    },
                )),
                true,
            ),
        );
        let mut data = GraphData::new();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::from("abc"));
        data.add_vertex("Person", row);

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);
        assert!(report.errors[0].message.contains("pattern"));
    }

    #[test]
    fn numeric_range_constraint_enforced() {
        let schema = Schema::new(SchemaVersion::new(1, 0, 0)).with_vertex(
            VertexLabel::new("Person").with_property(
                "age",
                PropertyDefinition::new(PropertyType::Integer).with_constraints(Constraints::Number(
                    super::super::model::NumberConstraints { minimum: Some(0.0), maximum: Some(130.0), ..Default::default() },
                )),
                true,
            ),
        );
        let mut data = GraphData::new();
        let mut row = BTreeMap::new();
        row.insert("age".to_string(), Value::from(200i64));
        data.add_vertex("Person", row);

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(!report.valid);
        assert!(report.errors[0].message.contains("above maximum"));
    }

    #[test]
    fn nullable_property_allows_null() {
        let schema = Schema::new(SchemaVersion::new(1, 0, 0)).with_vertex(
            VertexLabel::new("Person")
                .with_property("nickname", PropertyDefinition::new(PropertyType::String).nullable(), false),
        );
        let mut data = GraphData::new();
        let mut row = BTreeMap::new();
        row.insert("nickname".to_string(), Value::Null);
        data.add_vertex("Person", row);

        let report = validate(&data, &schema, &ValidateOptions::default());
        assert!(report.valid);
    }
}
