//! Schema model (C4 types): [`Schema`], [`VertexLabel`], [`EdgeLabel`],
//! [`PropertyDefinition`], and supporting enums.
//!
//! Grounded on the teacher's `db/schema/definition.rs` (`SchemaRelation`,
//! `SchemaField`, `SchemaRelationship`), generalized from the teacher's
//! fixed, `'static`-array, code-generated relations to an owned, runtime
//! `serde`-deserializable schema document (§6: "Schema format: a JSON
//! document with `version`, `vertices`, `edges`, `metadata`").

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{PropertyType, Value};

/// A `major.minor.patch[-prerelease]` schema version, per §6.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub prerelease: Option<String>,
}

impl SchemaVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch, prerelease: None }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (core, prerelease) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (s, None),
        };
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(format!("invalid schema version '{}': expected major.minor.patch", s));
        }
        let parse = |p: &str| p.parse::<u32>().map_err(|_| format!("invalid version segment '{}'", p));
        Ok(SchemaVersion {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
            prerelease,
        })
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(v: SchemaVersion) -> Self {
        v.to_string()
    }
}

/// String-specific constraints on a [`PropertyDefinition`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Numeric constraints on a [`PropertyDefinition`] (applies to `Number`,
/// `Integer`, and `Float`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    #[serde(default)]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "enum")]
    pub enum_values: Option<Vec<f64>>,
}

/// Array constraints on a [`PropertyDefinition`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub unique_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyDefinition>>,
}

/// Object constraints on a [`PropertyDefinition`]: a nested property/required
/// schema, for `object`-typed properties that themselves have known shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectConstraints {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub required: BTreeSet<String>,
}

/// Type-specific constraints on a [`PropertyDefinition`]. At most one variant
/// applies, matching the property's [`PropertyType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constraints {
    String(StringConstraints),
    Number(NumberConstraints),
    Array(ArrayConstraints),
    Object(ObjectConstraints),
}

/// The full description of a single vertex/edge property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

impl PropertyDefinition {
    pub fn new(property_type: PropertyType) -> Self {
        Self { property_type, nullable: false, default: None, constraints: None }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

/// A vertex label: a named set of typed properties plus which of them are
/// required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexLabel {
    pub label: String,
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub required: BTreeSet<String>,
}

impl VertexLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), properties: BTreeMap::new(), required: BTreeSet::new() }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        definition: PropertyDefinition,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        }
        self.properties.insert(name, definition);
        self
    }

    /// `required ⊆ keys(properties)`, per the data model invariant in §3.
    pub fn has_consistent_required_set(&self) -> bool {
        self.required.iter().all(|r| self.properties.contains_key(r))
    }
}

/// Declared cardinality between the endpoints of an edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Multiplicity {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Declared traversal direction of an edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Outgoing,
    Incoming,
    Bidirectional,
}

/// An edge label: everything a [`VertexLabel`] has, plus endpoint vertex
/// labels and optional cardinality/direction metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub label: String,
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub required: BTreeSet<String>,
    pub from_label: String,
    pub to_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<Multiplicity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl EdgeLabel {
    pub fn new(
        label: impl Into<String>,
        from_label: impl Into<String>,
        to_label: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            from_label: from_label.into(),
            to_label: to_label.into(),
            multiplicity: None,
            direction: None,
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        definition: PropertyDefinition,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        }
        self.properties.insert(name, definition);
        self
    }

    pub fn has_consistent_required_set(&self) -> bool {
        self.required.iter().all(|r| self.properties.contains_key(r))
    }
}

/// The versioned, top-level schema document: a mapping of vertex/edge labels
/// plus free-form metadata. See §3's data model and §6's schema format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub version: SchemaVersion,
    #[serde(default)]
    pub vertices: BTreeMap<String, VertexLabel>,
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeLabel>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// Error raised by [`Schema::validate_references`] when an edge label names
/// a vertex label that does not exist in the same schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanglingEdgeReference {
    pub edge_label: String,
    pub missing_vertex_label: String,
}

impl fmt::Display for DanglingEdgeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edge '{}' references undefined vertex label '{}'",
            self.edge_label, self.missing_vertex_label
        )
    }
}

impl Schema {
    pub fn new(version: SchemaVersion) -> Self {
        Self { version, vertices: BTreeMap::new(), edges: BTreeMap::new(), metadata: BTreeMap::new() }
    }

    pub fn with_vertex(mut self, vertex: VertexLabel) -> Self {
        self.vertices.insert(vertex.label.clone(), vertex);
        self
    }

    pub fn with_edge(mut self, edge: EdgeLabel) -> Self {
        self.edges.insert(edge.label.clone(), edge);
        self
    }

    /// Checks the schema-level invariant from §3: every edge's `from_label`
    /// and `to_label` must name an existing vertex label.
    pub fn validate_references(&self) -> Vec<DanglingEdgeReference> {
        let mut errors = Vec::new();
        for edge in self.edges.values() {
            if !self.vertices.contains_key(&edge.from_label) {
                errors.push(DanglingEdgeReference {
                    edge_label: edge.label.clone(),
                    missing_vertex_label: edge.from_label.clone(),
                });
            }
            if !self.vertices.contains_key(&edge.to_label) {
                errors.push(DanglingEdgeReference {
                    edge_label: edge.label.clone(),
                    missing_vertex_label: edge.to_label.clone(),
                });
            }
        }
        errors
    }
}

/// One edge record inside a [`GraphData`] batch: the `from`/`to` vertex ids
/// plus any edge properties, per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: Value,
    pub to: Value,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl EdgeRecord {
    pub fn new(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self { from: from.into(), to: to.into(), properties: BTreeMap::new() }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// The batch loader's input: an ordered set of vertex property-maps and edge
/// records, grouped by label. Order within a label is preserved end-to-end
/// (see the Batch Loader's determinism guarantee in §4.10).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub vertices: BTreeMap<String, Vec<BTreeMap<String, Value>>>,
    #[serde(default)]
    pub edges: BTreeMap<String, Vec<EdgeRecord>>,
}

impl GraphData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, label: impl Into<String>, properties: BTreeMap<String, Value>) {
        self.vertices.entry(label.into()).or_default().push(properties);
    }

    pub fn add_edge(&mut self, label: impl Into<String>, record: EdgeRecord) {
        self.edges.entry(label.into()).or_default().push(record);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.values().map(Vec::len).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_major_minor_patch() {
        let v: SchemaVersion = "1.2.3".parse().unwrap();
        assert_eq!(v, SchemaVersion::new(1, 2, 3));
    }

    #[test]
    fn version_parses_prerelease_suffix() {
        let v: SchemaVersion = "1.2.3-beta.1".parse().unwrap();
        assert_eq!(v.prerelease.as_deref(), Some("beta.1"));
        assert_eq!(v.to_string(), "1.2.3-beta.1");
    }

    #[test]
    fn version_rejects_malformed_input() {
        assert!("1.2".parse::<SchemaVersion>().is_err());
        assert!("a.b.c".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn version_ordering_compares_numerically() {
        let a: SchemaVersion = "1.9.0".parse().unwrap();
        let b: SchemaVersion = "1.10.0".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn vertex_label_required_subset_invariant_holds() {
        let vertex = VertexLabel::new("Person")
            .with_property("name", PropertyDefinition::new(PropertyType::String), true);
        assert!(vertex.has_consistent_required_set());
    }

    #[test]
    fn vertex_label_required_subset_invariant_detects_violation() {
        let mut vertex = VertexLabel::new("Person");
        vertex.required.insert("ghost".to_string());
        assert!(!vertex.has_consistent_required_set());
    }

    #[test]
    fn schema_reference_validation_passes_for_known_labels() {
        let schema = Schema::new(SchemaVersion::new(1, 0, 0))
            .with_vertex(VertexLabel::new("Person"))
            .with_vertex(VertexLabel::new("Company"))
            .with_edge(EdgeLabel::new("WORKS_AT", "Person", "Company"));
        assert!(schema.validate_references().is_empty());
    }

    #[test]
    fn schema_reference_validation_flags_dangling_endpoint() {
        let schema = Schema::new(SchemaVersion::new(1, 0, 0))
            .with_vertex(VertexLabel::new("Person"))
            .with_edge(EdgeLabel::new("WORKS_AT", "Person", "Company"));
        let errors = schema.validate_references();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].missing_vertex_label, "Company");
    }

    #[test]
    fn graph_data_counts_vertices_and_edges_across_labels() {
        let mut data = GraphData::new();
        data.add_vertex("Person", BTreeMap::new());
        data.add_vertex("Person", BTreeMap::new());
        data.add_vertex("Company", BTreeMap::new());
        data.add_edge("WORKS_AT", EdgeRecord::new("1", "3"));
        assert_eq!(data.vertex_count(), 3);
        assert_eq!(data.edge_count(), 1);
    }

    #[test]
    fn schema_json_round_trip() {
        let schema = Schema::new(SchemaVersion::new(1, 0, 0)).with_vertex(
            VertexLabel::new("Person").with_property(
                "age",
                PropertyDefinition::new(PropertyType::Integer),
                false,
            ),
        );
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
