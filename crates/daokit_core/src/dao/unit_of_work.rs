//! Unit-of-work wrapper and explicit ambient transaction scope.
//!
//! # Responsibility
//! - Run one DAO operation against a connection inside a transaction.
//! - Commit or roll back only transactions the unit began itself.
//! - Close only connections the unit opened itself.
//!
//! # Invariants
//! - A connection borrowed from a [`TransactionScope`] is never closed,
//!   committed, or rolled back by a unit of work.
//! - A dropped scope that was neither committed nor rolled back rolls back.

use super::error::{DaoError, DaoResult};
use crate::db::DataSource;
use log::{debug, warn};
use rusqlite::Connection;
use uuid::Uuid;

/// Transaction requirement of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Begins a transaction when none is active and commits it on success.
    ReadWrite,
    /// Runs without beginning a transaction.
    ReadOnly,
}

/// Caller-owned connection with an open transaction.
///
/// Pass it to adapters (`with_scope`) so several contract calls share one
/// transaction; the caller then decides to commit or roll back.
pub struct TransactionScope {
    conn: Connection,
    id: Uuid,
    finished: bool,
}

impl TransactionScope {
    /// Opens a connection from `source` and begins an immediate transaction.
    pub fn begin(source: &DataSource) -> DaoResult<Self> {
        let conn = source.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE;")
            .map_err(|err| DaoError::backend("failed to begin scope transaction", err))?;
        let id = Uuid::new_v4();
        debug!("event=scope_begin module=dao status=ok scope_id={id}");
        Ok(Self {
            conn,
            id,
            finished: false,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn commit(mut self) -> DaoResult<()> {
        self.finished = true;
        self.conn
            .execute_batch("COMMIT;")
            .map_err(|err| DaoError::backend("failed to commit scope transaction", err))?;
        debug!("event=scope_commit module=dao status=ok scope_id={}", self.id);
        Ok(())
    }

    pub fn rollback(mut self) -> DaoResult<()> {
        self.finished = true;
        self.conn
            .execute_batch("ROLLBACK;")
            .map_err(|err| DaoError::backend("failed to roll back scope transaction", err))?;
        debug!("event=scope_rollback module=dao status=ok scope_id={}", self.id);
        Ok(())
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.finished || self.conn.is_autocommit() {
            return;
        }
        match self.conn.execute_batch("ROLLBACK;") {
            Ok(()) => debug!(
                "event=scope_rollback module=dao status=ok scope_id={} reason=dropped",
                self.id
            ),
            Err(err) => warn!(
                "event=scope_rollback module=dao status=error scope_id={} reason=dropped error={}",
                self.id, err
            ),
        }
    }
}

enum Acquired<'a> {
    Local(Connection),
    Ambient(&'a Connection),
}

impl Acquired<'_> {
    fn connection(&self) -> &Connection {
        match self {
            Self::Local(conn) => conn,
            Self::Ambient(conn) => *conn,
        }
    }

    fn release(self) {
        if let Self::Local(conn) = self {
            if let Err((_, err)) = conn.close() {
                warn!("event=uow_release module=dao status=error error={err}");
            }
        }
    }
}

/// Runs closures against a connection inside a managed transaction.
#[derive(Clone, Copy)]
pub struct UnitOfWork<'a> {
    source: &'a DataSource,
    ambient: Option<&'a TransactionScope>,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(source: &'a DataSource) -> Self {
        Self {
            source,
            ambient: None,
        }
    }

    /// Runs every unit on the scope's connection instead of a fresh one.
    pub fn in_scope(source: &'a DataSource, scope: &'a TransactionScope) -> Self {
        Self {
            source,
            ambient: Some(scope),
        }
    }

    pub fn source(&self) -> &'a DataSource {
        self.source
    }

    pub fn is_scoped(&self) -> bool {
        self.ambient.is_some()
    }

    /// Executes `work` once and settles the transaction it began, if any.
    pub fn execute<T, F>(&self, mode: TxMode, work: F) -> DaoResult<T>
    where
        F: FnOnce(&Connection) -> DaoResult<T>,
    {
        let acquired = match self.ambient {
            Some(scope) => Acquired::Ambient(scope.connection()),
            None => Acquired::Local(self.source.connect()?),
        };

        let result = run_in_transaction(acquired.connection(), mode, work);
        acquired.release();
        result
    }
}

fn run_in_transaction<T, F>(conn: &Connection, mode: TxMode, work: F) -> DaoResult<T>
where
    F: FnOnce(&Connection) -> DaoResult<T>,
{
    let began = mode == TxMode::ReadWrite && conn.is_autocommit();
    if began {
        conn.execute_batch("BEGIN IMMEDIATE;")
            .map_err(|err| DaoError::backend("failed to begin transaction", err))?;
    }

    match work(conn) {
        Ok(value) => {
            if began {
                if let Err(err) = conn.execute_batch("COMMIT;") {
                    rollback_quietly(conn);
                    return Err(DaoError::backend("failed to commit transaction", err));
                }
            }
            Ok(value)
        }
        Err(err) => {
            if began {
                rollback_quietly(conn);
            }
            Err(err)
        }
    }
}

fn rollback_quietly(conn: &Connection) {
    if conn.is_autocommit() {
        return;
    }
    if let Err(err) = conn.execute_batch("ROLLBACK;") {
        warn!("event=uow_rollback module=dao status=error error={err}");
    }
}
