//! Query execution (C7): running Cypher against the graph and plain SQL
//! against the bridge table, with the single centralized `agtype` decoder
//! and a retry policy gated on [`crate::error::Error::is_transient`].
//!
//! Grounded on the teacher's `AgeCompiler::validate_schema_query` and
//! `init_graph_query` for the convention of calling AGE's `cypher()`
//! function as plain SQL text rather than through a wrapper type — this
//! keeps the exact calling convention visible and unit-testable without a
//! live database, which is why this module builds the `SELECT * FROM
//! cypher(...)` text itself instead of relying on a crate-specific client
//! API (see the dependency note in DESIGN.md).

use std::thread::sleep;
use std::time::Duration;

use postgres::GenericClient;
use tracing::warn;

use crate::error::{Error, Result};
use crate::value::Value;

/// Knobs controlling a single [`execute_cypher`]/[`execute_sql`] call.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { max_retries: 3, retry_delay: Duration::from_millis(50) }
    }
}

/// Build the SQL AGE expects for running a Cypher body: `SELECT
/// result::text FROM cypher('graph', $$ body $$) AS (result agtype)`. The
/// explicit `::text` cast matters: `agtype` is a custom Postgres type the
/// `postgres` crate has no `FromSql` impl for, so every row is pulled back
/// as text and handed to [`decode_agtype`] rather than decoded by the driver.
pub fn wrap_cypher(graph_name: &str, cypher_body: &str) -> String {
    format!(
        "SELECT result::text FROM cypher('{graph}', $${body}$$) AS (result agtype)",
        graph = graph_name,
        body = cypher_body
    )
}

/// Run a Cypher body against `graph_name` and decode every returned `result`
/// column. Retries transient failures up to `options.max_retries` times.
pub fn execute_cypher(
    client: &mut impl GenericClient,
    graph_name: &str,
    cypher_body: &str,
    options: &ExecuteOptions,
) -> Result<Vec<Value>> {
    let sql = wrap_cypher(graph_name, cypher_body);
    let rows = execute_with_retry(client, &sql, options)?;
    rows.iter().map(|row| decode_agtype(row.get::<_, &str>(0))).collect()
}

/// Run a plain SQL statement (e.g. against the parameter bridge table) with
/// the same retry policy as [`execute_cypher`].
pub fn execute_sql(
    client: &mut impl GenericClient,
    sql: &str,
    params: &[&(dyn postgres::types::ToSql + Sync)],
    options: &ExecuteOptions,
) -> Result<Vec<postgres::Row>> {
    let mut attempt = 0;
    loop {
        match client.query(sql, params) {
            Ok(rows) => return Ok(rows),
            Err(e) => {
                let err = Error::from(e);
                if attempt >= options.max_retries || !err.is_transient() {
                    return Err(err);
                }
                attempt += 1;
                warn!(attempt, "retrying transient query failure");
                sleep(options.retry_delay);
            }
        }
    }
}

fn execute_with_retry(client: &mut impl GenericClient, sql: &str, options: &ExecuteOptions) -> Result<Vec<postgres::Row>> {
    execute_sql(client, sql, &[], options)
}

/// Decode a single `agtype` text representation into a [`Value`]. This is
/// the one place in the crate that understands `agtype`'s textual form, per
/// the centralized-decoder design note: every other module that needs a
/// result value goes through this function rather than re-parsing text.
///
/// `agtype` renders composite results with a trailing type annotation
/// (`::vertex`, `::edge`, `::path`, `::numeric`); those annotations are
/// stripped before the remaining text is parsed as JSON. Bare scalars (a
/// plain number, string, boolean, or `null`) have no annotation and parse
/// directly.
pub fn decode_agtype(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let json_text = strip_type_annotation(trimmed);
    let json: serde_json::Value = serde_json::from_str(json_text)
        .map_err(|e| Error::query(format!("failed to decode agtype value '{}': {}", trimmed, e)))?;
    Ok(Value::from_json(unwrap_vertex_or_edge(json)))
}

/// `::vertex`/`::edge`/`::path` results are JSON objects with `id`, `label`,
/// and `properties` keys; callers generally want the `properties` map with
/// `id`/`label` folded in, matching how the batch loader round-trips a
/// vertex's own `id` property.
fn unwrap_vertex_or_edge(json: serde_json::Value) -> serde_json::Value {
    match json {
        serde_json::Value::Object(mut map) if map.contains_key("properties") && map.contains_key("label") => {
            let mut properties = match map.remove("properties") {
                Some(serde_json::Value::Object(props)) => props,
                _ => serde_json::Map::new(),
            };
            properties.insert("label".to_string(), map.remove("label").unwrap_or(serde_json::Value::Null));
            serde_json::Value::Object(properties)
        }
        other => other,
    }
}

fn strip_type_annotation(text: &str) -> &str {
    for suffix in ["::vertex", "::edge", "::path", "::numeric"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            return stripped.trim();
        }
    }
    text
}
