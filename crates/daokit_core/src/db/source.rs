//! Connection source shared by every DAO backend.
//!
//! # Responsibility
//! - Own the database target (caller file path or private scratch database).
//! - Bootstrap schema exactly once, then hand out fresh configured connections.
//!
//! # Invariants
//! - Connections returned by [`DataSource::connect`] see a migrated schema.
//! - A scratch database lives in its own temporary directory and is removed
//!   when the source is dropped.
//! - Both targets use file locking; a unit of work blocked by another waits
//!   up to the busy timeout.

use super::open::{bootstrap_connection, configure_connection};
use super::{DbError, DbResult};
use crate::config::DataSourceConfig;
use log::{debug, error, info};
use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Busy timeout applied when no configuration overrides it.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCRATCH_FILE_NAME: &str = "daokit.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    Scratch(PathBuf),
}

impl Target {
    fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Scratch(path) => path,
        }
    }
}

/// Factory of SQLite connections for one database.
///
/// Each unit of work acquires its own connection from here and closes it
/// when done, unless it borrows an ambient scope connection instead.
pub struct DataSource {
    target: Target,
    busy_timeout: Duration,
    // Deleted on drop together with the scratch database inside it.
    _scratch_dir: Option<TempDir>,
}

impl DataSource {
    /// Creates a source for a database file, creating and migrating it if needed.
    pub fn file(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::bootstrap(
            Target::File(path.as_ref().to_path_buf()),
            None,
            DEFAULT_BUSY_TIMEOUT,
        )
    }

    /// Creates a source for a fresh, private database that disappears with
    /// the source.
    pub fn in_memory() -> DbResult<Self> {
        Self::scratch(DEFAULT_BUSY_TIMEOUT)
    }

    /// Creates a source from startup configuration.
    ///
    /// `database_path = None` selects a private scratch database.
    pub fn from_config(config: &DataSourceConfig) -> DbResult<Self> {
        match config.database_path.as_ref() {
            Some(path) => Self::bootstrap(Target::File(path.clone()), None, config.busy_timeout()),
            None => Self::scratch(config.busy_timeout()),
        }
    }

    fn scratch(busy_timeout: Duration) -> DbResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("daokit-")
            .tempdir()
            .map_err(|err| DbError::Io {
                context: "create scratch database directory",
                source: err,
            })?;
        let target = Target::Scratch(dir.path().join(SCRATCH_FILE_NAME));
        Self::bootstrap(target, Some(dir), busy_timeout)
    }

    fn bootstrap(
        target: Target,
        scratch_dir: Option<TempDir>,
        busy_timeout: Duration,
    ) -> DbResult<Self> {
        let started_at = Instant::now();
        let label = describe_target(&target);
        info!("event=datasource_init module=db status=start target={label}");

        let result = open_target(&target)
            .map_err(Into::into)
            .and_then(|mut conn| bootstrap_connection(&mut conn, busy_timeout).map(|()| conn));

        if let Err(err) = result {
            error!(
                "event=datasource_init module=db status=error target={} duration_ms={} error={}",
                label,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }

        info!(
            "event=datasource_init module=db status=ok target={} duration_ms={}",
            label,
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            target,
            busy_timeout,
            _scratch_dir: scratch_dir,
        })
    }

    /// Opens a new configured connection to the same database.
    ///
    /// The caller owns the connection and is responsible for closing it.
    pub fn connect(&self) -> DbResult<Connection> {
        let conn = open_target(&self.target)?;
        configure_connection(&conn, self.busy_timeout)?;
        debug!(
            "event=datasource_connect module=db status=ok target={}",
            describe_target(&self.target)
        );
        Ok(conn)
    }

    /// Returns whether this source owns a private scratch database.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.target, Target::Scratch(_))
    }

    /// Returns the busy timeout applied to every connection.
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Returns a log-safe description of the target database.
    pub fn describe(&self) -> String {
        describe_target(&self.target)
    }
}

impl Debug for DataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("target", &self.target)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

fn open_target(target: &Target) -> rusqlite::Result<Connection> {
    Connection::open(target.path())
}

fn describe_target(target: &Target) -> String {
    match target {
        Target::File(path) => format!("file:{}", path.display()),
        Target::Scratch(path) => format!("scratch:{}", path.display()),
    }
}
