//! Transaction control (C6): a small state machine around
//! [`postgres::Transaction`] with savepoint support and `with_transaction`
//! helpers that commit on success and roll back on error.
//!
//! There's no teacher transaction manager to generalize (CozoDB's
//! `DbInstance` has no transaction API the teacher exposes), so this is
//! grounded on the teacher's general error-propagation idiom — return early
//! on the first failure, never swallow a `Result` — applied to the
//! begin/commit/rollback/savepoint lifecycle `postgres::Transaction` already
//! provides.

use tracing::{debug, warn};

use crate::connection::Session;
use crate::error::{Error, Result};

/// Where a [`Transaction`] currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
    Failed,
    Closed,
}

/// A wrapped `postgres::Transaction` tracking its own state so callers get a
/// clear error instead of a panic when they commit twice or use a
/// transaction after it failed.
pub struct Transaction<'a> {
    inner: Option<postgres::Transaction<'a>>,
    state: TransactionState,
    savepoint_counter: u32,
}

impl<'a> Transaction<'a> {
    pub fn begin(session: &'a mut Session) -> Result<Self> {
        let inner = session
            .client()
            .transaction()
            .map_err(|e| Error::transaction_with_source("failed to begin transaction", e))?;
        debug!("transaction started");
        Ok(Self { inner: Some(inner), state: TransactionState::Active, savepoint_counter: 0 })
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Borrow the underlying client for running statements.
    pub fn client(&mut self) -> Result<&mut postgres::Transaction<'a>> {
        self.require_active()?;
        Ok(self.inner.as_mut().expect("active transaction always holds inner"))
    }

    fn require_active(&self) -> Result<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            other => Err(Error::transaction(format!("transaction is not active (state: {:?})", other))),
        }
    }

    /// Create a new savepoint and return its generated name. Issued as raw
    /// `SAVEPOINT` SQL rather than `postgres::Transaction::savepoint`'s
    /// nested-transaction API, since the latter would require holding a
    /// second borrow of `self.inner` for as long as the savepoint is open.
    pub fn savepoint(&mut self) -> Result<String> {
        self.require_active()?;
        self.savepoint_counter += 1;
        let name = format!("sp_{}", self.savepoint_counter);
        self.inner
            .as_mut()
            .unwrap()
            .execute(&format!("SAVEPOINT {}", name), &[])
            .map_err(|e| Error::transaction_with_source(format!("failed to create savepoint '{}'", name), e))?;
        Ok(name)
    }

    /// Roll back the whole transaction to a previously created savepoint.
    pub fn rollback_to(&mut self, name: &str) -> Result<()> {
        self.require_active()?;
        self.inner
            .as_mut()
            .unwrap()
            .execute(&format!("ROLLBACK TO SAVEPOINT {}", name), &[])
            .map_err(|e| Error::transaction_with_source(format!("failed to roll back to savepoint '{}'", name), e))?;
        Ok(())
    }

    pub fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.require_active()?;
        self.inner
            .as_mut()
            .unwrap()
            .execute(&format!("RELEASE SAVEPOINT {}", name), &[])
            .map_err(|e| Error::transaction_with_source(format!("failed to release savepoint '{}'", name), e))?;
        Ok(())
    }

    pub fn commit(mut self) -> Result<()> {
        self.require_active()?;
        self.inner
            .take()
            .unwrap()
            .commit()
            .map_err(|e| Error::transaction_with_source("failed to commit transaction", e))?;
        self.state = TransactionState::Closed;
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        if self.state == TransactionState::Closed {
            return Ok(());
        }
        if let Some(inner) = self.inner.take() {
            inner.rollback().map_err(|e| Error::transaction_with_source("failed to roll back transaction", e))?;
        }
        self.state = TransactionState::Closed;
        warn!("transaction rolled back");
        Ok(())
    }

    fn mark_failed(&mut self) {
        self.state = TransactionState::Failed;
    }
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!("transaction dropped without explicit commit/rollback; rolling back");
        }
    }
}

/// Run `f` inside a fresh transaction: commit if it returns `Ok`, roll back
/// (marking the transaction `Failed` first, so any later use surfaces a
/// clear error) if it returns `Err`.
pub fn with_transaction<T>(session: &mut Session, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
    let mut tx = Transaction::begin(session)?;
    match f(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            tx.mark_failed();
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Like [`with_transaction`], but additionally clears any leftover bridge
/// parameters before running `f`, so a Cypher body inside the transaction
/// never observes state from an earlier, already-committed unit of work on
/// the same pooled connection.
pub fn with_age_transaction<T>(session: &mut Session, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
    crate::bridge::clear(session.client())?;
    with_transaction(session, f)
}

impl Error {
    pub(crate) fn transaction_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Transaction { message: message.into(), source: Some(Box::new(source)) }
    }
}
