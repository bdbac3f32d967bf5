//! Connection pooling (C2): wraps an `r2d2` pool of PostgreSQL connections
//! and hands out bootstrapped [`Session`]s.
//!
//! Grounded on the teacher's `PostgresAgeBackend::new` (`db/postgres/mod.rs`)
//! for the "connect, then verify the AGE extension is loaded" sequence;
//! generalized from a single `RwLock`-guarded client to a pooled
//! `r2d2_postgres::PostgresConnectionManager`, since this crate is meant to
//! serve concurrent callers rather than one backend instance per process.

use std::time::Duration;

use postgres::NoTls;
use r2d2_postgres::PostgresConnectionManager;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};

use super::session::Session;

type InnerPool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

/// A pool of PostgreSQL/AGE connections, sized and timed out per
/// [`crate::config::PoolConfig`].
pub struct Pool {
    inner: InnerPool,
    graph_name: String,
}

impl Pool {
    /// Connect and build a pool. Connections are not actually established
    /// until first acquired (`r2d2`'s default behaviour), so this call does
    /// not itself verify the AGE extension — the first [`Pool::acquire`]
    /// does that, same as the teacher's `new` constructor.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let manager = PostgresConnectionManager::new(
            url.parse().map_err(|e| Error::connection_with_source("invalid connection URL", PgUrlError(format!("{}", e))))?,
            NoTls,
        );
        let inner = r2d2::Pool::builder()
            .max_size(config.pool.max_size)
            .connection_timeout(Duration::from_millis(config.pool.connect_timeout_ms))
            .idle_timeout(Some(Duration::from_millis(config.pool.idle_timeout_ms)))
            .build(manager)
            .map_err(|e| Error::connection_with_source("failed to build connection pool", e))?;

        info!(max_size = config.pool.max_size, graph = %config.graph_name, "connection pool built");
        Ok(Self { inner, graph_name: config.graph_name.clone() })
    }

    /// Check out a connection and bootstrap it into a [`Session`]: verify the
    /// AGE extension, ensure the graph exists, and idempotently (re)create the
    /// parameter bridge's scratch table and helper functions.
    pub fn acquire(&self) -> Result<Session> {
        debug!("acquiring pooled connection");
        let conn = self.inner.get().map_err(Error::from)?;
        Session::bootstrap(conn, self.graph_name.clone())
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }
}

#[derive(Debug)]
struct PgUrlError(String);

impl std::fmt::Display for PgUrlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PgUrlError {}
