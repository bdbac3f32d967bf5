//! The parameter bridge (C3): the session-scoped `age_params` scratch table
//! and the server-side helper functions Cypher bodies call to read it back.
//!
//! Apache AGE's `cypher()` function takes no bind parameters of its own, so
//! anything beyond a literal has to travel through an ordinary relational
//! table and be fetched from inside the Cypher body via a `SELECT` wrapped in
//! a PL/pgSQL helper. This module owns the SQL text for that table and those
//! helpers, and the typed `set`/`set_many`/`clear` operations that write to
//! it. Grounded on the teacher's `AgeCompiler::init_graph_query` (a single
//! parameterless SQL string generator against the `ag_graph` catalog) for the
//! "build exactly the SQL text AGE expects" style, and on `db/escape.rs` for
//! the principle that user-controlled text must be escaped once, in one
//! place, before being embedded in generated SQL/Cypher.

use lazy_static::lazy_static;
use postgres::GenericClient;
use regex::Regex;

use crate::error::{Error, Result};
use crate::value::Value;

/// Name of the session-scoped scratch table.
pub const PARAMS_TABLE: &str = "age_params";

lazy_static! {
    static ref KEY_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Validate that `key` is safe to interpolate into generated Cypher as a
/// function-call argument / map key (it never travels as a bind parameter,
/// since AGE has none).
pub fn validate_key(key: &str) -> Result<()> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(Error::Template { message: format!("invalid parameter key '{}': must match ^[A-Za-z_][A-Za-z0-9_]*$", key) })
    }
}

/// DDL for the scratch table. Idempotent: safe to run on every session
/// bootstrap.
pub fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (key TEXT PRIMARY KEY, value JSONB NOT NULL)",
        table = PARAMS_TABLE
    )
}

/// `get_age_param(key)` returns a single parameter's value as `agtype`, or
/// `agtype 'null'` if the key is absent. Cypher bodies call this as
/// `get_age_param('key')` wherever a bound value is needed.
pub fn create_get_age_param_function_sql() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION get_age_param(param_key TEXT) RETURNS agtype AS $$
DECLARE
    result JSONB;
BEGIN
    SELECT value INTO result FROM {table} WHERE key = param_key;
    IF result IS NULL THEN
        RETURN 'null'::agtype;
    END IF;
    RETURN result::text::agtype;
END;
$$ LANGUAGE plpgsql STABLE;",
        table = PARAMS_TABLE
    )
}

/// `get_all_age_params()` returns every parameter as a single `agtype` map,
/// used where a Cypher body needs several values at once (e.g. `WITH
/// get_all_age_params() AS params`).
pub fn create_get_all_age_params_function_sql() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION get_all_age_params() RETURNS agtype AS $$
DECLARE
    result JSONB;
BEGIN
    SELECT COALESCE(jsonb_object_agg(key, value), '{{}}'::jsonb) INTO result FROM {table};
    RETURN result::text::agtype;
END;
$$ LANGUAGE plpgsql STABLE;",
        table = PARAMS_TABLE
    )
}

/// `get_vertices(key)` returns the array parameter stored at `key` as an
/// `agtype` array, for use with `UNWIND get_vertices('rows')` when loading a
/// batch of vertex property maps.
pub fn create_get_vertices_function_sql() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION get_vertices(param_key TEXT) RETURNS agtype AS $$
DECLARE
    result JSONB;
BEGIN
    SELECT value INTO result FROM {table} WHERE key = param_key;
    IF result IS NULL THEN
        RETURN '[]'::agtype;
    END IF;
    RETURN result::text::agtype;
END;
$$ LANGUAGE plpgsql STABLE;",
        table = PARAMS_TABLE
    )
}

/// `get_edges(key)` is identical in shape to [`create_get_vertices_function_sql`]
/// but named separately so call sites read intent, matching the distinct
/// `get_vertices`/`get_edges` helpers named in the design.
pub fn create_get_edges_function_sql() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION get_edges(param_key TEXT) RETURNS agtype AS $$
DECLARE
    result JSONB;
BEGIN
    SELECT value INTO result FROM {table} WHERE key = param_key;
    IF result IS NULL THEN
        RETURN '[]'::agtype;
    END IF;
    RETURN result::text::agtype;
END;
$$ LANGUAGE plpgsql STABLE;",
        table = PARAMS_TABLE
    )
}

/// Every bootstrap statement, in the order a fresh session must run them:
/// the scratch table, then each helper function.
pub fn bootstrap_statements() -> Vec<String> {
    vec![
        create_table_sql(),
        create_get_age_param_function_sql(),
        create_get_all_age_params_function_sql(),
        create_get_vertices_function_sql(),
        create_get_edges_function_sql(),
    ]
}

/// `TRUNCATE` the scratch table, releasing every parameter set during the
/// session. Called on session release per the hygiene invariant (P3).
pub fn clear_sql() -> String {
    format!("TRUNCATE TABLE {}", PARAMS_TABLE)
}

fn upsert_sql() -> &'static str {
    "INSERT INTO age_params (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"
}

/// Write a single named parameter into the scratch table, upserting if the
/// key was already set earlier in the session.
pub fn set(client: &mut impl GenericClient, key: &str, value: &Value) -> Result<()> {
    validate_key(key)?;
    client.execute(upsert_sql(), &[&key, &value.to_json()])?;
    Ok(())
}

/// Write several named parameters in one round trip.
pub fn set_many(client: &mut impl GenericClient, params: &[(String, Value)]) -> Result<()> {
    for (key, value) in params {
        validate_key(key)?;
    }
    let statement = client.prepare(upsert_sql())?;
    for (key, value) in params {
        client.execute(&statement, &[key, &value.to_json()])?;
    }
    Ok(())
}

/// Remove every parameter written during the current session.
pub fn clear(client: &mut impl GenericClient) -> Result<()> {
    client.execute(&clear_sql(), &[])?;
    Ok(())
}

/// Build the Cypher fragment a query template uses to reference `key`, e.g.
/// `get_age_param('threshold')`. Centralised here so the template generator
/// (C5) and fluent builder (C8) never hand-roll this call shape.
pub fn param_reference(key: &str) -> Result<String> {
    validate_key(key)?;
    Ok(format!("get_age_param('{}')", key))
}

/// Build the Cypher fragment referencing a vertex-array parameter, e.g.
/// `get_vertices('rows')`.
pub fn vertices_reference(key: &str) -> Result<String> {
    validate_key(key)?;
    Ok(format!("get_vertices('{}')", key))
}

/// Build the Cypher fragment referencing an edge-array parameter, e.g.
/// `get_edges('rows')`.
pub fn edges_reference(key: &str) -> Result<String> {
    validate_key(key)?;
    Ok(format!("get_edges('{}')", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_key_accepts_identifier_shaped_keys() {
        assert!(validate_key("threshold").is_ok());
        assert!(validate_key("_private").is_ok());
        assert!(validate_key("row_1").is_ok());
    }

    #[test]
    fn validate_key_rejects_keys_that_could_escape_cypher() {
        assert!(validate_key("a'; DROP TABLE x; --").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn create_table_sql_is_idempotent_ddl() {
        assert!(create_table_sql().contains("IF NOT EXISTS"));
        assert!(create_table_sql().contains(PARAMS_TABLE));
    }

    #[test]
    fn bootstrap_statements_start_with_table_creation() {
        let statements = bootstrap_statements();
        assert_eq!(statements.len(), 5);
        assert!(statements[0].contains("CREATE TABLE"));
        assert!(statements[1].contains("get_age_param"));
        assert!(statements[2].contains("get_all_age_params"));
        assert!(statements[3].contains("get_vertices"));
        assert!(statements[4].contains("get_edges"));
    }

    #[test]
    fn clear_sql_truncates_scratch_table() {
        assert_eq!(clear_sql(), "TRUNCATE TABLE age_params");
    }

    #[test]
    fn param_reference_embeds_key() {
        assert_eq!(param_reference("threshold").unwrap(), "get_age_param('threshold')");
    }

    #[test]
    fn param_reference_rejects_unsafe_key() {
        assert!(param_reference("bad key").is_err());
    }

    #[test]
    fn vertices_and_edges_reference_use_distinct_helpers() {
        assert_eq!(vertices_reference("rows").unwrap(), "get_vertices('rows')");
        assert_eq!(edges_reference("rows").unwrap(), "get_edges('rows')");
    }
}
