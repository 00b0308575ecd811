//! Managed-container ORM backend.
//!
//! An [`OrmTemplate`] is injected into the adapter; every template call runs
//! as its own committed unit of work unless the template was created inside
//! a caller's [`TransactionScope`].

use super::error::{DaoError, DaoResult};
use super::mapping::{require_id, require_identifier, RowMapped};
use super::session::OrmSession;
use super::unit_of_work::{TransactionScope, TxMode, UnitOfWork};
use super::{traced, Dao};
use crate::db::DataSource;
use crate::model::entity::EntityId;
use rusqlite::types::Value;
use std::marker::PhantomData;

const BACKEND: &str = "managed";

/// Template running session work in container-managed units of work.
#[derive(Clone, Copy)]
pub struct OrmTemplate<'a> {
    uow: UnitOfWork<'a>,
}

impl<'a> OrmTemplate<'a> {
    pub fn new(source: &'a DataSource) -> Self {
        Self {
            uow: UnitOfWork::new(source),
        }
    }

    pub fn in_scope(source: &'a DataSource, scope: &'a TransactionScope) -> Self {
        Self {
            uow: UnitOfWork::in_scope(source, scope),
        }
    }

    /// Runs a session callback in one read-write unit of work.
    pub fn execute<R>(&self, callback: impl FnOnce(&OrmSession<'_>) -> DaoResult<R>) -> DaoResult<R> {
        self.uow
            .execute(TxMode::ReadWrite, |conn| callback(&OrmSession::new(conn)))
    }

    pub fn get<T: RowMapped>(&self, id: EntityId) -> DaoResult<Option<T>> {
        self.execute(|session| session.get::<T>(id))
    }

    pub fn save<T: RowMapped>(&self, entity: &T) -> DaoResult<EntityId> {
        self.execute(|session| session.save(entity))
    }

    pub fn update<T: RowMapped>(&self, entity: &T) -> DaoResult<()> {
        self.execute(|session| session.update(entity))
    }

    pub fn delete<T: RowMapped>(&self, entity: &T) -> DaoResult<()> {
        self.execute(|session| session.delete(entity))
    }

    pub fn load_all<T: RowMapped>(&self) -> DaoResult<Vec<T>> {
        self.execute(|session| {
            session
                .create_query::<T>(&format!("from {}", T::mapping().entity))?
                .list()
        })
    }

    /// Runs an entity query with positional parameters.
    pub fn find<T: RowMapped>(&self, query: &str, params: Vec<Value>) -> DaoResult<Vec<T>> {
        self.execute(|session| session.create_query::<T>(query)?.bind_all(params).list())
    }

    pub fn find_unique<T: RowMapped>(
        &self,
        query: &str,
        params: Vec<Value>,
    ) -> DaoResult<Option<T>> {
        self.execute(|session| {
            session
                .create_query::<T>(query)?
                .bind_all(params)
                .unique_result()
        })
    }
}

/// DAO adapter delegating to an injected [`OrmTemplate`].
pub struct ManagedDao<'a, T> {
    template: OrmTemplate<'a>,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: RowMapped> ManagedDao<'a, T> {
    pub fn new(template: OrmTemplate<'a>) -> Self {
        Self {
            template,
            _entity: PhantomData,
        }
    }

    pub fn template(&self) -> &OrmTemplate<'a> {
        &self.template
    }

    pub fn execute_single_result(&self, query: &str, params: Vec<Value>) -> DaoResult<Option<T>> {
        traced(BACKEND, "single_result", T::mapping().entity, || {
            self.template.find_unique(query, params)
        })
    }

    pub fn execute_result_list(&self, query: &str, params: Vec<Value>) -> DaoResult<Vec<T>> {
        traced(BACKEND, "result_list", T::mapping().entity, || {
            self.template.find(query, params)
        })
    }
}

impl<T: RowMapped> Dao<T> for ManagedDao<'_, T> {
    fn find_one(&self, id: Option<EntityId>) -> DaoResult<Option<T>> {
        traced(BACKEND, "find_one", T::mapping().entity, || {
            let id = require_id::<T>(id)?;
            self.template.get(id)
        })
    }

    fn save(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "save", T::mapping().entity, || {
            let id = self.template.save(entity)?;
            Ok(entity.clone().with_id(id))
        })
    }

    fn update(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "update", T::mapping().entity, || {
            let id = require_identifier(entity, "update")?;
            self.template.update(entity)?;
            self.template
                .get(id)?
                .ok_or_else(|| DaoError::not_found(T::mapping().entity, id))
        })
    }

    fn delete(&self, entity: &T) -> DaoResult<()> {
        traced(BACKEND, "delete", T::mapping().entity, || {
            require_identifier(entity, "delete")?;
            self.template.delete(entity)
        })
    }

    fn get_all(&self) -> DaoResult<Vec<T>> {
        traced(BACKEND, "get_all", T::mapping().entity, || {
            self.template.load_all()
        })
    }
}
