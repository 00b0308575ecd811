//! Error model of the DAO contract.
//!
//! # Invariants
//! - `InvalidArgument` is raised before any backend interaction and is never
//!   wrapped with operation context.
//! - Every backend fault surfaces as `DataAccess` with the original cause
//!   reachable through `Error::source`.

use crate::db::DbError;
use crate::model::entity::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DaoResult<T> = Result<T, DaoError>;

type Cause = Box<dyn Error + Send + Sync + 'static>;

/// Error returned by every DAO contract operation.
#[derive(Debug)]
pub enum DaoError {
    InvalidArgument(String),
    DataAccess(DataAccessError),
}

/// Category of a data-access failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataAccessKind {
    /// Lower-level storage fault; the cause is kept.
    Backend,
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    NonUniqueResult {
        entity: &'static str,
        count: usize,
    },
    /// Column arrays, statement ids, or bound parameters do not line up.
    Mapping,
}

/// Opaque data-access failure with kind, message, and optional cause.
#[derive(Debug)]
pub struct DataAccessError {
    kind: DataAccessKind,
    message: String,
    cause: Option<Cause>,
}

impl DataAccessError {
    pub fn kind(&self) -> &DataAccessKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for DataAccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for DataAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

impl DaoError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn backend(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::data_access(DataAccessKind::Backend, message.into(), Some(cause.into()))
    }

    pub fn not_found(entity: &'static str, id: EntityId) -> Self {
        Self::data_access(
            DataAccessKind::NotFound { entity, id },
            format!("{entity} not found: id={id}"),
            None,
        )
    }

    pub fn non_unique(entity: &'static str, count: usize) -> Self {
        Self::data_access(
            DataAccessKind::NonUniqueResult { entity, count },
            format!("expected at most one {entity}, query returned {count}"),
            None,
        )
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::data_access(DataAccessKind::Mapping, message.into(), None)
    }

    fn data_access(kind: DataAccessKind, message: String, cause: Option<Cause>) -> Self {
        Self::DataAccess(DataAccessError {
            kind,
            message,
            cause,
        })
    }

    /// Prefixes a data-access message with operation context.
    ///
    /// `InvalidArgument` is returned unchanged.
    pub fn context(self, context: impl Display) -> Self {
        match self {
            Self::DataAccess(mut err) => {
                err.message = format!("{context}: {}", err.message);
                Self::DataAccess(err)
            }
            invalid @ Self::InvalidArgument(_) => invalid,
        }
    }

    pub fn data_access_kind(&self) -> Option<&DataAccessKind> {
        match self {
            Self::DataAccess(err) => Some(err.kind()),
            Self::InvalidArgument(_) => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.data_access_kind(), Some(DataAccessKind::NotFound { .. }))
    }

    pub fn is_non_unique_result(&self) -> bool {
        matches!(
            self.data_access_kind(),
            Some(DataAccessKind::NonUniqueResult { .. })
        )
    }

    pub fn is_backend(&self) -> bool {
        matches!(self.data_access_kind(), Some(DataAccessKind::Backend))
    }
}

impl Display for DaoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::DataAccess(err) => write!(f, "data access failed: {err}"),
        }
    }
}

impl Error for DaoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::DataAccess(err) => err.source(),
        }
    }
}

impl From<rusqlite::Error> for DaoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::backend("sqlite error", value)
    }
}

impl From<DbError> for DaoError {
    fn from(value: DbError) -> Self {
        Self::backend("storage bootstrap error", value)
    }
}

#[cfg(test)]
mod tests {
    use super::{DaoError, DataAccessKind};
    use std::error::Error;

    #[test]
    fn context_prefixes_data_access_messages_only() {
        let err = DaoError::not_found("Bet", 4).context("update Bet");
        assert!(err.to_string().contains("update Bet: Bet not found: id=4"));
        assert_eq!(
            err.data_access_kind(),
            Some(&DataAccessKind::NotFound { entity: "Bet", id: 4 })
        );

        let invalid = DaoError::invalid_argument("id is required").context("update Bet");
        assert_eq!(invalid.to_string(), "invalid argument: id is required");
    }

    #[test]
    fn backend_error_keeps_cause() {
        let err: DaoError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.is_backend());
        assert!(err.source().is_some());
    }
}
