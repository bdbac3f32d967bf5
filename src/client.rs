//! The top-level façade: [`Client::connect`] resolves configuration and
//! opens a pool; everything else is a thin pass-through to the module that
//! actually does the work.
//!
//! Grounded on the teacher's top-level `Client`-equivalent in `lib.rs`
//! (`open_db`/`open_mem_db` plus the CLI's config-resolution entry point):
//! one small type applications construct once and hand to every call site.

use crate::config::ConnectionConfig;
use crate::connection::{Pool, Session};
use crate::error::Result;
use crate::loader::{self, LoadOptions, LoadResult};
use crate::query::QueryBuilder;
use crate::schema::model::{GraphData, Schema};
use crate::transaction::{self, Transaction};

/// An open connection pool to a graph, bootstrapped and ready for use.
pub struct Client {
    pool: Pool,
}

impl Client {
    /// Resolve configuration (config file, then environment variables) and
    /// connect. See [`crate::config::ConnectionConfig::resolve`].
    pub fn connect() -> Result<Self> {
        let config = ConnectionConfig::resolve()?;
        Self::connect_with(&config)
    }

    /// Connect using an already-built configuration, bypassing resolution —
    /// useful for tests and callers that assemble `ConnectionConfig`
    /// themselves.
    pub fn connect_with(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self { pool: Pool::connect(config)? })
    }

    pub fn graph_name(&self) -> &str {
        self.pool.graph_name()
    }

    /// Check out a bootstrapped session from the pool.
    pub fn session(&self) -> Result<Session> {
        self.pool.acquire()
    }

    /// Start a fluent query against a fresh session.
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Run `f` inside a transaction on a fresh session: commit on `Ok`, roll
    /// back on `Err`.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
        let mut session = self.pool.acquire()?;
        transaction::with_transaction(&mut session, f)
    }

    /// Like [`transaction`](Self::transaction), but clears bridge parameters
    /// first so the closure never observes leftovers from the session's
    /// previous use.
    pub fn age_transaction<T>(&self, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
        let mut session = self.pool.acquire()?;
        transaction::with_age_transaction(&mut session, f)
    }

    /// Validate and load a batch of vertices/edges against `schema`.
    pub fn batch_load(&self, schema: &Schema, data: &GraphData, options: &LoadOptions) -> Result<LoadResult> {
        loader::load(&self.pool, schema, data, options)
    }
}
