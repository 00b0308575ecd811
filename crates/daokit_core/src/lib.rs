//! Generic DAO contract over five SQLite access styles.
//!
//! One CRUD contract ([`Dao`]) is implemented by five adapters, each speaking
//! its own access vocabulary: an ORM session, a managed persistence context,
//! a statement mapper, a SQL template, and an injected ORM template.

pub mod bet;
pub mod config;
pub mod dao;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;

pub use bet::{bet_mapper_registry, BetFinder, BET_MAPPING};
pub use config::{load_config, parse_config, ConfigError, DataSourceConfig};
pub use dao::context::{ContextDao, Criteria, EntityContext, TypedQuery};
pub use dao::managed::{ManagedDao, OrmTemplate};
pub use dao::mapper::{MapperDao, ParamMap, StatementMapper, StatementRegistry};
pub use dao::session::{OrmQuery, OrmSession, SessionDao};
pub use dao::template::{SqlTemplate, TemplateDao};
pub use dao::{
    reduce_single, Dao, DaoError, DaoResult, DataAccessError, DataAccessKind, RowMapped,
    TableMapping, TransactionScope, TxMode, UnitOfWork,
};
pub use db::{DataSource, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::bet::Bet;
pub use model::entity::{Entity, EntityId};
pub use service::bet_service::BetService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
