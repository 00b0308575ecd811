//! Generic DAO contract and its five backend adapters.
//!
//! # Responsibility
//! - Define the CRUD contract every backend adapter implements.
//! - Provide shared pieces: error model, table mapping, result reduction,
//!   and the unit-of-work wrapper.
//!
//! # Invariants
//! - Absent identifiers are rejected with `InvalidArgument` before any
//!   backend interaction.
//! - Every backend fault is surfaced as `DaoError::DataAccess`.
//! - Every contract call runs in exactly one unit of work.

use crate::model::entity::{Entity, EntityId};
use log::{debug, error, info, warn};
use std::time::Instant;

pub mod context;
pub mod error;
pub mod managed;
pub mod mapper;
pub mod mapping;
pub mod reduce;
pub mod session;
pub mod template;
pub mod unit_of_work;

pub use error::{DaoError, DaoResult, DataAccessError, DataAccessKind};
pub use mapping::{RowMapped, TableMapping};
pub use reduce::reduce_single;
pub use unit_of_work::{TransactionScope, TxMode, UnitOfWork};

/// CRUD contract shared by every backend adapter.
pub trait Dao<T: Entity> {
    /// Looks up an entity by identifier.
    ///
    /// # Errors
    /// - `InvalidArgument` when `id` is absent.
    fn find_one(&self, id: Option<EntityId>) -> DaoResult<Option<T>>;

    /// Persists a new entity and returns it carrying its identifier.
    fn save(&self, entity: &T) -> DaoResult<T>;

    /// Overwrites a persisted entity.
    ///
    /// # Errors
    /// - `InvalidArgument` when the entity has no identifier.
    /// - `DataAccess(NotFound)` when no row has that identifier.
    fn update(&self, entity: &T) -> DaoResult<T>;

    /// Removes a persisted entity. Same failures as [`Dao::update`].
    fn delete(&self, entity: &T) -> DaoResult<()>;

    /// Returns every stored entity; empty when there are none.
    fn get_all(&self) -> DaoResult<Vec<T>>;

    fn get_identifier(&self, entity: &T) -> Option<EntityId> {
        entity.id()
    }
}

/// Timing and status logging around one contract call.
pub(crate) struct OpTrace {
    backend: &'static str,
    operation: &'static str,
    entity: &'static str,
    started_at: Instant,
}

impl OpTrace {
    pub(crate) fn start(
        backend: &'static str,
        operation: &'static str,
        entity: &'static str,
    ) -> Self {
        debug!(
            "event=dao_{} module=dao backend={} status=start entity={}",
            operation, backend, entity
        );
        Self {
            backend,
            operation,
            entity,
            started_at: Instant::now(),
        }
    }

    /// Logs the outcome and adds operation context to data-access errors.
    pub(crate) fn finish<T>(self, result: DaoResult<T>) -> DaoResult<T> {
        let duration_ms = self.started_at.elapsed().as_millis();
        match result {
            Ok(value) => {
                info!(
                    "event=dao_{} module=dao backend={} status=ok entity={} duration_ms={}",
                    self.operation, self.backend, self.entity, duration_ms
                );
                Ok(value)
            }
            Err(err @ DaoError::InvalidArgument(_)) => {
                warn!(
                    "event=dao_{} module=dao backend={} status=rejected entity={} error={}",
                    self.operation, self.backend, self.entity, err
                );
                Err(err)
            }
            Err(err) => {
                let err = err.context(format!(
                    "{} {} {}",
                    self.backend, self.operation, self.entity
                ));
                error!(
                    "event=dao_{} module=dao backend={} status=error entity={} duration_ms={} error={}",
                    self.operation, self.backend, self.entity, duration_ms, err
                );
                Err(err)
            }
        }
    }
}

/// Runs one contract call under an [`OpTrace`].
pub(crate) fn traced<R>(
    backend: &'static str,
    operation: &'static str,
    entity: &'static str,
    call: impl FnOnce() -> DaoResult<R>,
) -> DaoResult<R> {
    OpTrace::start(backend, operation, entity).finish(call())
}
