//! The batch loader (C10): validate a [`GraphData`] batch against a
//! [`Schema`], then load it label-by-label inside a single transaction,
//! chunked to keep any one `UNWIND` body to a manageable size.
//!
//! There's no teacher bulk-loader to generalize directly, so this is
//! grounded on composing the pieces this crate already built the teacher's
//! way: [`crate::schema::validator`] for the pre-flight check,
//! [`crate::transaction`] for the commit/rollback envelope, and
//! [`crate::template`] for the per-label Cypher bodies — the same
//! validate-then-transact shape the teacher applies to its own
//! `PostgresAgeBackend` setup sequence (verify, then act, inside one
//! connection).

use std::fmt;

use crate::connection::{Pool, Session};
use crate::error::{Error, Result};
use crate::executor::{self, ExecuteOptions};
use crate::schema::model::{EdgeRecord, GraphData, Schema};
use crate::schema::validator::{self, ValidateOptions};
use crate::template;
use crate::transaction::Transaction;
use crate::value::Value;
use crate::{bridge, error};

/// Which stage of the load a [`Error::BatchLoader`] failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    Validation,
    Transaction,
    Vertices,
    Edges,
    Cleanup,
}

/// Tuning knobs for one [`load`] call.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Maximum number of rows sent to the database per `UNWIND` call.
    pub chunk_size: usize,
    /// When `true`, a failed chunk is rolled back to a savepoint taken
    /// before it and recorded in [`LoadResult::errors`], and loading
    /// continues with the next chunk inside the same transaction, which
    /// still commits at the end, rather than aborting the whole load.
    pub continue_on_error: bool,
    pub validate: ValidateOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { chunk_size: 500, continue_on_error: false, validate: ValidateOptions::default() }
    }
}

/// Outcome of a [`load`] call.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    pub vertices_loaded: usize,
    pub edges_loaded: usize,
    /// Per-chunk failures recorded when `continue_on_error` is set; empty on
    /// a fully successful, non-lenient load.
    pub errors: Vec<String>,
    /// Non-fatal anomalies that don't stop the load: currently, an edge
    /// chunk whose `MATCH...CREATE` matched fewer rows than it was given
    /// (one or both endpoints didn't exist), which the database reports as
    /// zero rows created rather than an error.
    pub warnings: Vec<String>,
}

impl fmt::Display for LoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loaded {} vertice(s), {} edge(s), {} error(s), {} warning(s)",
            self.vertices_loaded,
            self.edges_loaded,
            self.errors.len(),
            self.warnings.len()
        )
    }
}

/// Validate `data` against `schema`, then load every vertex label followed
/// by every edge label inside one transaction. Commits only if every
/// non-lenient chunk succeeds; rolls back on the first hard failure.
pub fn load(pool: &Pool, schema: &Schema, data: &GraphData, options: &LoadOptions) -> Result<LoadResult> {
    let report = validator::validate(data, schema, &options.validate);
    if !report.valid {
        return Err(Error::batch_loader(
            LoaderPhase::Validation,
            format!("{} validation error(s): {}", report.errors.len(), error::fmt_list(&report.errors)),
        ));
    }

    let mut session = pool.acquire()?;
    let graph_name = session.graph_name().to_string();
    let mut result = LoadResult::default();

    match run_load(&mut session, &graph_name, schema, data, options, &mut result) {
        Ok(()) => {
            session
                .release()
                .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Cleanup, "failed to clear parameter bridge", e))?;
            Ok(result)
        }
        Err(e) => {
            let _ = session.release();
            Err(e)
        }
    }
}

fn run_load(
    session: &mut Session,
    graph_name: &str,
    schema: &Schema,
    data: &GraphData,
    options: &LoadOptions,
    result: &mut LoadResult,
) -> Result<()> {
    bridge::clear(session.client())
        .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Transaction, "failed to clear parameter bridge", e))?;

    let mut tx = Transaction::begin(session)
        .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Transaction, "failed to begin transaction", e))?;

    for label in schema.vertices.values() {
        let Some(rows) = data.vertices.get(&label.label) else { continue };
        for chunk in rows.chunks(options.chunk_size.max(1)) {
            let key = format!("vertices_{}", label.label);
            let payload = Value::Array(chunk.iter().map(|row| Value::Object(row.clone())).collect());
            let cypher = template::create_vertices_template(label, &key)
                .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Vertices, "failed to build vertex load template", e))?;

            let savepoint = tx
                .savepoint()
                .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Vertices, "failed to create savepoint", e))?;

            let outcome = bridge::set(tx_client(&mut tx)?, &key, &payload)
                .and_then(|_| executor::execute_cypher(tx_client(&mut tx)?, graph_name, &cypher, &ExecuteOptions::default()));

            match outcome {
                Ok(rows) => {
                    result.vertices_loaded += created_count(&rows);
                    tx.release_savepoint(&savepoint).map_err(|e| {
                        Error::batch_loader_with_source(LoaderPhase::Vertices, "failed to release savepoint", e)
                    })?;
                }
                Err(e) if options.continue_on_error => {
                    // A chunk failure leaves the underlying PostgreSQL
                    // transaction in its aborted state; rolling back to the
                    // savepoint taken before this chunk clears that state so
                    // the rest of the load, and the eventual commit, aren't
                    // poisoned by it.
                    tx.rollback_to(&savepoint).map_err(|e2| {
                        Error::batch_loader_with_source(
                            LoaderPhase::Vertices,
                            format!("failed to roll back savepoint after error loading vertices '{}': {}", label.label, e),
                            e2,
                        )
                    })?;
                    result.errors.push(format!("vertices '{}': {}", label.label, e));
                }
                Err(e) => {
                    let _ = tx.rollback();
                    return Err(Error::batch_loader_with_source(LoaderPhase::Vertices, format!("loading label '{}'", label.label), e));
                }
            }
        }
    }

    for label in schema.edges.values() {
        let Some(rows) = data.edges.get(&label.label) else { continue };
        for chunk in rows.chunks(options.chunk_size.max(1)) {
            let key = format!("edges_{}", label.label);
            let payload = edge_batch_json(chunk);
            let cypher = template::create_edges_template(label, &key)
                .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Edges, "failed to build edge load template", e))?;

            let savepoint = tx
                .savepoint()
                .map_err(|e| Error::batch_loader_with_source(LoaderPhase::Edges, "failed to create savepoint", e))?;

            let outcome = bridge::set(tx_client(&mut tx)?, &key, &payload)
                .and_then(|_| executor::execute_cypher(tx_client(&mut tx)?, graph_name, &cypher, &ExecuteOptions::default()));

            match outcome {
                Ok(rows) => {
                    let created = created_count(&rows);
                    result.edges_loaded += created;
                    if created < chunk.len() {
                        result.warnings.push(format!(
                            "edges '{}': {} of {} row(s) in this chunk did not match an existing vertex pair and were skipped",
                            label.label,
                            chunk.len() - created,
                            chunk.len()
                        ));
                    }
                    tx.release_savepoint(&savepoint).map_err(|e| {
                        Error::batch_loader_with_source(LoaderPhase::Edges, "failed to release savepoint", e)
                    })?;
                }
                Err(e) if options.continue_on_error => {
                    tx.rollback_to(&savepoint).map_err(|e2| {
                        Error::batch_loader_with_source(
                            LoaderPhase::Edges,
                            format!("failed to roll back savepoint after error loading edges '{}': {}", label.label, e),
                            e2,
                        )
                    })?;
                    result.errors.push(format!("edges '{}': {}", label.label, e));
                }
                Err(e) => {
                    let _ = tx.rollback();
                    return Err(Error::batch_loader_with_source(LoaderPhase::Edges, format!("loading label '{}'", label.label), e));
                }
            }
        }
    }

    tx.commit().map_err(|e| Error::batch_loader_with_source(LoaderPhase::Transaction, "failed to commit load transaction", e))
}

fn tx_client<'a, 'b>(tx: &'b mut Transaction<'a>) -> Result<&'b mut postgres::Transaction<'a>> {
    tx.client()
}

/// The generated templates (see [`crate::template`]) `RETURN count(...) AS
/// created_*`, always a single row holding the aggregate; treat any other
/// shape (no rows, a non-numeric value) as zero created rather than erroring,
/// since a malformed aggregate result is a programmer error in the template,
/// not a data problem worth surfacing mid-load.
fn created_count(rows: &[Value]) -> usize {
    rows.first().and_then(Value::as_i64).map(|n| n.max(0) as usize).unwrap_or(0)
}

/// Serialize an edge batch as `{from, to, p1, p2, …}` objects with
/// properties flattened alongside the endpoints, distinct from
/// [`EdgeRecord`]'s own flattened `Serialize` impl: the generated
/// `UNWIND`/`CREATE` template (see [`crate::template::create_edges_template`])
/// reads `e.from`, `e.to`, and each declared property directly off `e`.
fn edge_batch_json(rows: &[EdgeRecord]) -> Value {
    Value::Array(
        rows.iter()
            .map(|edge| {
                let mut object = edge.properties.clone();
                object.insert("from".to_string(), edge.from.clone());
                object.insert("to".to_string(), edge.to.clone());
                Value::Object(object)
            })
            .collect(),
    )
}

impl Error {
    pub(crate) fn batch_loader_with_source(
        phase: LoaderPhase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::BatchLoader { phase, message: message.into(), source: Some(Box::new(source)) }
    }
}
