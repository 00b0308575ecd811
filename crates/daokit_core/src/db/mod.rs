//! Storage layer underneath every DAO backend.
//!
//! # Responsibility
//! - Provide the [`DataSource`] each unit of work draws its connection from,
//!   for a caller-owned database file or a private scratch database.
//! - Configure every connection the same way (foreign keys, busy timeout).
//! - Bring the `bet` schema up to date before the first DAO call.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A source that returned `Ok` has a fully migrated schema.
//! - Storage failures reach DAO callers as `DataAccess(Backend)`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod source;

pub use open::{open_db, open_db_in_memory};
pub use source::{DataSource, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening, configuring, or migrating a database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Filesystem failure outside SQLite, e.g. creating a scratch directory.
    Io {
        context: &'static str,
        source: std::io::Error,
    },
    /// The database was written by a newer schema than this build knows.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "bet schema version {db_version} is ahead of this build (knows up to {latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
