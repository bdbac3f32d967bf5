//! A single bootstrapped connection (C2), checked out of the [`super::pool::Pool`].
//!
//! Grounded on the teacher's `PostgresAgeBackend::verify_age_extension` and
//! `create_graph_if_not_exists` (`db/postgres/mod.rs`): this crate runs the
//! same two checks on every acquisition, then additionally lays down the
//! parameter bridge's scratch table and helper functions from
//! [`crate::bridge::bootstrap_statements`].

use postgres::NoTls;
use r2d2_postgres::PostgresConnectionManager;
use tracing::{debug, warn};

use crate::bridge;
use crate::error::{Error, Result};

type PooledConnection = r2d2::PooledConnection<PostgresConnectionManager<NoTls>>;

/// An acquired, bootstrapped connection. Dereferences to
/// [`postgres::Client`] (via [`std::ops::DerefMut`]) for callers that need
/// direct `postgres` access; the executor and transaction controller build on
/// top of this.
pub struct Session {
    conn: PooledConnection,
    graph_name: String,
}

impl Session {
    /// Verify the AGE extension, ensure the target graph exists, and
    /// idempotently bootstrap the parameter bridge.
    pub(crate) fn bootstrap(mut conn: PooledConnection, graph_name: String) -> Result<Self> {
        verify_age_extension(&mut conn)?;
        ensure_graph_exists(&mut conn, &graph_name)?;
        for statement in bridge::bootstrap_statements() {
            conn.batch_execute(&statement)
                .map_err(|e| Error::connection_with_source("failed to bootstrap parameter bridge", e))?;
        }
        set_search_path(&mut conn)?;
        debug!(graph = %graph_name, "session bootstrapped");
        Ok(Self { conn, graph_name })
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    pub fn client(&mut self) -> &mut postgres::Client {
        &mut self.conn
    }

    /// Truncate the parameter bridge's scratch table before the underlying
    /// connection returns to the pool, per the scratch-table hygiene
    /// invariant (P3): no session should ever observe another session's
    /// leftover parameters.
    pub fn release(mut self) -> Result<()> {
        bridge::clear(&mut self.conn)?;
        Ok(())
    }
}

impl std::ops::Deref for Session {
    type Target = postgres::Client;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

fn verify_age_extension(client: &mut postgres::Client) -> Result<()> {
    match client.simple_query("SELECT * FROM ag_catalog.ag_graph LIMIT 1") {
        Ok(_) => Ok(()),
        Err(e) => {
            let message = e.to_string();
            if message.contains("ag_catalog") || message.contains("does not exist") {
                Err(Error::connection(
                    "Apache AGE extension is not installed or not loaded; run CREATE EXTENSION IF NOT EXISTS age",
                ))
            } else {
                Err(Error::connection_with_source("failed to verify AGE extension", e))
            }
        }
    }
}

fn ensure_graph_exists(client: &mut postgres::Client, graph_name: &str) -> Result<()> {
    let exists = client
        .query_opt("SELECT 1 FROM ag_catalog.ag_graph WHERE name = $1", &[&graph_name])
        .map_err(|e| Error::connection_with_source("failed to check for AGE graph", e))?
        .is_some();

    if exists {
        return Ok(());
    }

    warn!(graph = %graph_name, "AGE graph not found, creating it");
    client
        .execute("SELECT create_graph($1)", &[&graph_name])
        .map_err(|e| Error::connection_with_source(format!("failed to create AGE graph '{}'", graph_name), e))?;
    Ok(())
}

/// AGE's helper functions live in the `ag_catalog` schema; putting it on the
/// search path lets generated Cypher call `cypher(...)` without qualifying
/// every reference.
fn set_search_path(client: &mut postgres::Client) -> Result<()> {
    client
        .batch_execute("SET search_path = ag_catalog, \"$user\", public")
        .map_err(|e| Error::connection_with_source("failed to set search_path", e))?;
    Ok(())
}
