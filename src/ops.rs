//! Vertex/edge CRUD operations (C9): small, direct wrappers around a single
//! graph entity, built on the same bridge + template machinery the batch
//! loader and fluent query builder use for bulk work.
//!
//! Grounded on the teacher's `AgeCompiler` methods (`db/schema/compilers/age.rs`),
//! which each build one purpose-specific Cypher/SQL string per catalog
//! operation; these functions do the same for single-entity reads and
//! writes, reusing [`crate::template`]'s batch templates where the shape
//! already matches and building a one-off fragment inline where a batch
//! template would be overkill (a lone `CREATE`/`SET` has no `UNWIND` to do).

use crate::connection::Session;
use crate::dialect::is_valid_identifier;
use crate::error::{Error, Result};
use crate::executor::{self, ExecuteOptions};
use crate::template;
use crate::value::Value;
use crate::{bridge, dialect};

fn require_valid_label(label: &str) -> Result<()> {
    if is_valid_identifier(label) {
        Ok(())
    } else {
        Err(Error::Template { message: format!("invalid label '{}'", label) })
    }
}

fn run(session: &mut Session, body: &str) -> Result<Vec<Value>> {
    executor::execute_cypher(session.client(), session.graph_name(), body, &ExecuteOptions::default())
}

/// Create a single vertex with the given label and properties, returning the
/// created node.
pub fn create_vertex(session: &mut Session, label: &str, properties: &Value) -> Result<Value> {
    require_valid_label(label)?;
    bridge::set(session.client(), "ops_create_vertex", properties)?;
    let body = format!(
        "CREATE (n:{label}) SET n = {props} RETURN n",
        label = label,
        props = bridge::param_reference("ops_create_vertex")?
    );
    run(session, &body)?.into_iter().next().ok_or_else(|| Error::query("create_vertex returned no rows"))
}

/// Find every vertex of `label` whose `property` equals `value`.
pub fn find_vertices(session: &mut Session, label: &str, property: &str, value: &Value) -> Result<Vec<Value>> {
    bridge::set(session.client(), "ops_find_value", value)?;
    let body = template::find_vertices_by_property_template(label, property, "ops_find_value")?;
    run(session, &body)
}

/// Create an edge of `edge_label` between an existing `from_label` vertex
/// (matched by `id`) and `to_label` vertex, with the given properties.
pub fn create_edge(
    session: &mut Session,
    edge_label: &str,
    from_label: &str,
    to_label: &str,
    from_id: &Value,
    to_id: &Value,
    properties: &Value,
) -> Result<Value> {
    require_valid_label(edge_label)?;
    require_valid_label(from_label)?;
    require_valid_label(to_label)?;
    bridge::set_many(
        session.client(),
        &[
            ("ops_edge_from".to_string(), from_id.clone()),
            ("ops_edge_to".to_string(), to_id.clone()),
            ("ops_edge_props".to_string(), properties.clone()),
        ],
    )?;
    let body = format!(
        "MATCH (a:{from} {{id: {from_ref}}}), (b:{to} {{id: {to_ref}}}) CREATE (a)-[r:{label}]->(b) SET r = {props_ref} RETURN r",
        from = from_label,
        from_ref = bridge::param_reference("ops_edge_from")?,
        to = to_label,
        to_ref = bridge::param_reference("ops_edge_to")?,
        label = edge_label,
        props_ref = bridge::param_reference("ops_edge_props")?
    );
    run(session, &body)?.into_iter().next().ok_or_else(|| Error::query("create_edge matched no endpoints"))
}

/// Merge `updates` into an existing vertex's properties, returning the
/// updated node.
pub fn update_vertex(session: &mut Session, label: &str, id: &Value, updates: &Value) -> Result<Value> {
    bridge::set_many(
        session.client(),
        &[("ops_update_id".to_string(), id.clone()), ("ops_update_props".to_string(), updates.clone())],
    )?;
    let body = template::update_vertex_template(label, "ops_update_id", "ops_update_props")?;
    run(session, &body)?.into_iter().next().ok_or_else(|| Error::query(format!("no vertex with that id in label '{}'", label)))
}

/// Delete a vertex (and its incident edges) by id.
pub fn delete_vertex(session: &mut Session, label: &str, id: &Value) -> Result<()> {
    bridge::set(session.client(), "ops_delete_id", id)?;
    let body = template::delete_vertex_template(label, "ops_delete_id")?;
    run(session, &body)?;
    Ok(())
}

/// Quote and validate `label` for embedding directly into hand-written
/// Cypher, for callers that need a pattern this module doesn't already
/// provide a dedicated operation for.
pub fn quoted_label(label: &str) -> Result<String> {
    require_valid_label(label)?;
    Ok(dialect::quote_ident(label))
}
