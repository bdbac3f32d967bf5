//! Query template generation (C5): turning a [`VertexLabel`]/[`EdgeLabel`]
//! plus a bridge parameter key into the Cypher body that loads or mutates it.
//!
//! Grounded on the teacher's `AgeCompiler` (`db/schema/compilers/age.rs`),
//! which already turns a `SchemaRelation` into label-shaped Cypher/SQL text
//! (`validate_schema_query`, `create_index`); this module generalizes that
//! "relation in, Cypher fragment out" shape to the bridge-backed batch
//! load/merge/delete templates the spec's batch loader and CRUD ops build on.

use std::collections::BTreeMap;

use crate::bridge;
use crate::dialect::is_valid_identifier;
use crate::error::{Error, Result};
use crate::schema::model::{EdgeLabel, PropertyDefinition, VertexLabel};

fn require_valid_label(label: &str) -> Result<()> {
    if is_valid_identifier(label) {
        Ok(())
    } else {
        Err(Error::Template { message: format!("invalid label '{}': must be a plain Cypher identifier", label) })
    }
}

/// Renders each declared property as `p: CASE WHEN alias.p IS NOT NULL THEN
/// alias.p ELSE NULL END`, the stable per-property shape §4.5 requires so a
/// missing property on a row becomes an explicit `NULL` rather than being
/// omitted from the created entity entirely.
fn property_case_when_list(alias: &str, properties: &BTreeMap<String, PropertyDefinition>) -> String {
    properties
        .keys()
        .map(|p| format!("{p}: CASE WHEN {alias}.{p} IS NOT NULL THEN {alias}.{p} ELSE NULL END", p = p, alias = alias))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `UNWIND get_vertices(key) AS v CREATE (n:Label {p1: CASE WHEN ... END, …})
/// RETURN count(n) AS created_vertices`: bulk vertex insert for one label's
/// worth of a batch, with every declared property enumerated individually
/// so a row missing a property still creates the vertex with that property
/// explicitly `NULL` rather than silently dropping it.
pub fn create_vertices_template(label: &VertexLabel, param_key: &str) -> Result<String> {
    require_valid_label(&label.label)?;
    let rows = bridge::vertices_reference(param_key)?;
    let properties = property_case_when_list("v", &label.properties);
    Ok(format!(
        "UNWIND {rows} AS v CREATE (n:{label} {{{properties}}}) RETURN count(n) AS created_vertices",
        rows = rows,
        label = label.label,
        properties = properties
    ))
}

/// `UNWIND get_vertices(key) AS row MERGE (n:Label {id: row.id}) SET n += row`:
/// idempotent upsert keyed on the `id` property.
pub fn merge_vertices_template(label: &VertexLabel, param_key: &str) -> Result<String> {
    require_valid_label(&label.label)?;
    let rows = bridge::vertices_reference(param_key)?;
    Ok(format!(
        "UNWIND {rows} AS row MERGE (n:{label} {{id: row.id}}) SET n += row RETURN n",
        rows = rows,
        label = label.label
    ))
}

/// Bulk edge insert: match both endpoints by `id` within their declared
/// labels, then create the relationship with its properties enumerated the
/// same stable way as [`create_vertices_template`]. `e` is expected to carry
/// `from`, `to`, and the edge's own declared properties flattened alongside
/// them, the shape the batch loader serializes an
/// [`crate::schema::model::EdgeRecord`] batch into (see `loader::edge_batch_json`).
/// A row whose `from`/`to` don't match an existing vertex produces no row at
/// all for that `UNWIND` iteration, which is why `created_edges` can be less
/// than the chunk size the loader sent.
pub fn create_edges_template(label: &EdgeLabel, param_key: &str) -> Result<String> {
    require_valid_label(&label.label)?;
    require_valid_label(&label.from_label)?;
    require_valid_label(&label.to_label)?;
    let rows = bridge::edges_reference(param_key)?;
    let properties = property_case_when_list("e", &label.properties);
    Ok(format!(
        "UNWIND {rows} AS e MATCH (a:{from} {{id: e.from}}) MATCH (b:{to} {{id: e.to}}) CREATE (a)-[r:{label} {{{properties}}}]->(b) RETURN count(r) AS created_edges",
        rows = rows,
        from = label.from_label,
        to = label.to_label,
        label = label.label,
        properties = properties
    ))
}

/// `MATCH (n:Label {id: get_age_param(key)}) DETACH DELETE n`: delete a
/// single vertex (and its incident edges) by id.
pub fn delete_vertex_template(label: &str, id_param_key: &str) -> Result<String> {
    require_valid_label(label)?;
    let id = bridge::param_reference(id_param_key)?;
    Ok(format!("MATCH (n:{label} {{id: {id}}}) DETACH DELETE n", label = label, id = id))
}

/// `MATCH (n:Label {id: get_age_param(key)}) SET n += get_age_param(updates_key) RETURN n`:
/// partial update of a vertex's properties.
pub fn update_vertex_template(label: &str, id_param_key: &str, updates_param_key: &str) -> Result<String> {
    require_valid_label(label)?;
    let id = bridge::param_reference(id_param_key)?;
    let updates = bridge::param_reference(updates_param_key)?;
    Ok(format!(
        "MATCH (n:{label} {{id: {id}}}) SET n += {updates} RETURN n",
        label = label,
        id = id,
        updates = updates
    ))
}

/// `MATCH (n:Label) WHERE n.prop = get_age_param(key) RETURN n`: a single
/// property-equality lookup, the common case behind `ops::find_vertices`.
pub fn find_vertices_by_property_template(label: &str, property: &str, param_key: &str) -> Result<String> {
    require_valid_label(label)?;
    require_valid_label(property)?;
    let value = bridge::param_reference(param_key)?;
    Ok(format!("MATCH (n:{label}) WHERE n.{property} = {value} RETURN n", label = label, property = property, value = value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyType;

    fn person_label() -> VertexLabel {
        VertexLabel::new("Person").with_property("name", PropertyDefinition::new(PropertyType::String), true)
    }

    #[test]
    fn create_vertices_template_uses_unwind_and_label() {
        let template = create_vertices_template(&person_label(), "rows").unwrap();
        assert!(template.starts_with("UNWIND get_vertices('rows') AS v"));
        assert!(template.contains("CREATE (n:Person {name: CASE WHEN v.name IS NOT NULL THEN v.name ELSE NULL END})"));
        assert!(template.ends_with("RETURN count(n) AS created_vertices"));
    }

    #[test]
    fn create_vertices_template_with_no_properties_creates_bare_label() {
        let template = create_vertices_template(&VertexLabel::new("Tag"), "rows").unwrap();
        assert!(template.contains("CREATE (n:Tag {})"));
    }

    #[test]
    fn merge_vertices_template_matches_on_id() {
        let template = merge_vertices_template(&person_label(), "rows").unwrap();
        assert!(template.contains("MERGE (n:Person {id: row.id})"));
        assert!(template.contains("SET n += row"));
    }

    #[test]
    fn create_edges_template_matches_both_endpoints() {
        let edge = EdgeLabel::new("WORKS_AT", "Person", "Company")
            .with_property("since", PropertyDefinition::new(PropertyType::Integer), false);
        let template = create_edges_template(&edge, "rows").unwrap();
        assert!(template.contains("MATCH (a:Person {id: e.from})"));
        assert!(template.contains("MATCH (b:Company {id: e.to})"));
        assert!(template.contains("CREATE (a)-[r:WORKS_AT {since: CASE WHEN e.since IS NOT NULL THEN e.since ELSE NULL END}]->(b)"));
        assert!(template.ends_with("RETURN count(r) AS created_edges"));
        assert!(template.contains("get_edges('rows')"));
    }

    #[test]
    fn delete_vertex_template_detaches_and_deletes() {
        let template = delete_vertex_template("Person", "target_id").unwrap();
        assert_eq!(template, "MATCH (n:Person {id: get_age_param('target_id')}) DETACH DELETE n");
    }

    #[test]
    fn update_vertex_template_merges_properties() {
        let template = update_vertex_template("Person", "target_id", "updates").unwrap();
        assert!(template.contains("SET n += get_age_param('updates')"));
    }

    #[test]
    fn find_vertices_by_property_template_builds_where_clause() {
        let template = find_vertices_by_property_template("Person", "name", "needle").unwrap();
        assert_eq!(template, "MATCH (n:Person) WHERE n.name = get_age_param('needle') RETURN n");
    }

    #[test]
    fn templates_reject_labels_that_are_not_plain_identifiers() {
        let edge = EdgeLabel::new("WORKS-AT", "Person", "Company");
        assert!(create_edges_template(&edge, "rows").is_err());
        assert!(delete_vertex_template("bad label", "key").is_err());
    }

    #[test]
    fn templates_reject_unsafe_param_keys() {
        let label = VertexLabel::new("Person");
        assert!(create_vertices_template(&label, "bad key").is_err());
    }
}
