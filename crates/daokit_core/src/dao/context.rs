//! Managed persistence-context backend.
//!
//! # Responsibility
//! - Offer persistence-context vocabulary (`find`, `persist`, `merge`,
//!   `remove`) and typed criteria queries.
//!
//! # Invariants
//! - `update` and `delete` look the entity up first and fail with
//!   `NotFound` before mutating anything.
//! - Criteria only reference columns known to the table mapping.

use super::error::{DaoError, DaoResult};
use super::mapping::{checked_values, insert_entity, require_id, require_identifier, RowMapped};
use super::reduce::reduce_single;
use super::unit_of_work::{TransactionScope, TxMode, UnitOfWork};
use super::{traced, Dao};
use crate::db::DataSource;
use crate::model::entity::EntityId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::marker::PhantomData;

const BACKEND: &str = "context";

/// Conjunction of column equality restrictions plus an optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    restrictions: Vec<(String, Value)>,
    order: Option<(String, bool)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `column = value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.restrictions.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }
}

/// Persistence context bound to the connection of one unit of work.
pub struct EntityContext<'c> {
    conn: &'c Connection,
}

impl<'c> EntityContext<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn find<T: RowMapped>(&self, id: EntityId) -> DaoResult<Option<T>> {
        let entity = self
            .conn
            .query_row(&T::mapping().select_by_id_sql(), params![id], |row| {
                T::from_row(row)
            })
            .optional()?;
        Ok(entity)
    }

    /// Inserts the entity and stores its identifier on it.
    ///
    /// An entity that already carries an identifier keeps it; if that row
    /// exists the insert fails with a backend error.
    pub fn persist<T: RowMapped>(&self, entity: &mut T) -> DaoResult<()> {
        let id = insert_entity(self.conn, entity)?;
        entity.set_id(id);
        Ok(())
    }

    /// Writes the entity's state over its stored row and returns it.
    pub fn merge<T: RowMapped>(&self, entity: &T) -> DaoResult<T> {
        let id = require_identifier(entity, "merge")?;
        let mut values = checked_values(entity)?;
        values.push(Value::Integer(id));
        let changed = self
            .conn
            .execute(&T::mapping().update_sql(), params_from_iter(values))?;
        if changed == 0 {
            return Err(DaoError::not_found(T::mapping().entity, id));
        }
        Ok(entity.clone())
    }

    pub fn remove<T: RowMapped>(&self, entity: &T) -> DaoResult<()> {
        let id = require_identifier(entity, "remove")?;
        self.conn
            .execute(&T::mapping().delete_sql(), params![id])?;
        Ok(())
    }

    /// Builds a typed query; unknown criteria columns fail with `Mapping`.
    pub fn create_query<T: RowMapped>(&self, criteria: &Criteria) -> DaoResult<TypedQuery<'c, T>> {
        let mapping = T::mapping();
        let mut sql = format!("SELECT {} FROM {}", mapping.select_list(), mapping.table);
        let mut params = Vec::with_capacity(criteria.restrictions.len());

        for (index, (column, value)) in criteria.restrictions.iter().enumerate() {
            ensure_column::<T>(column)?;
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("{column} = ?{}", index + 1));
            params.push(value.clone());
        }

        match criteria.order.as_ref() {
            Some((column, ascending)) => {
                ensure_column::<T>(column)?;
                let direction = if *ascending { "ASC" } else { "DESC" };
                sql.push_str(&format!(" ORDER BY {column} {direction}"));
            }
            None => sql.push_str(&format!(" ORDER BY {}", mapping.id_column)),
        }

        Ok(TypedQuery {
            conn: self.conn,
            sql,
            params,
            _entity: PhantomData,
        })
    }
}

fn ensure_column<T: RowMapped>(column: &str) -> DaoResult<()> {
    if T::mapping().has_column(column) {
        return Ok(());
    }
    Err(DaoError::mapping(format!(
        "`{}` has no mapped column `{column}`",
        T::mapping().entity
    )))
}

/// Query built from [`Criteria`], yielding mapped entities.
pub struct TypedQuery<'c, T> {
    conn: &'c Connection,
    sql: String,
    params: Vec<Value>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: RowMapped> TypedQuery<'_, T> {
    pub fn get_result_list(&self) -> DaoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&self.sql)?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), |row| T::from_row(row))?;
        let entities = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    pub fn get_single_result(&self) -> DaoResult<Option<T>> {
        reduce_single(T::mapping().entity, self.get_result_list()?)
    }
}

/// DAO adapter over [`EntityContext`].
pub struct ContextDao<'a, T> {
    uow: UnitOfWork<'a>,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: RowMapped> ContextDao<'a, T> {
    pub fn new(source: &'a DataSource) -> Self {
        Self {
            uow: UnitOfWork::new(source),
            _entity: PhantomData,
        }
    }

    pub fn with_scope(source: &'a DataSource, scope: &'a TransactionScope) -> Self {
        Self {
            uow: UnitOfWork::in_scope(source, scope),
            _entity: PhantomData,
        }
    }

    pub fn execute_single_result(&self, criteria: &Criteria) -> DaoResult<Option<T>> {
        traced(BACKEND, "single_result", T::mapping().entity, || {
            self.in_context(TxMode::ReadOnly, |context| {
                context.create_query::<T>(criteria)?.get_single_result()
            })
        })
    }

    pub fn execute_result_list(&self, criteria: &Criteria) -> DaoResult<Vec<T>> {
        traced(BACKEND, "result_list", T::mapping().entity, || {
            self.in_context(TxMode::ReadOnly, |context| {
                context.create_query::<T>(criteria)?.get_result_list()
            })
        })
    }

    fn in_context<R>(
        &self,
        mode: TxMode,
        action: impl FnOnce(&EntityContext<'_>) -> DaoResult<R>,
    ) -> DaoResult<R> {
        self.uow
            .execute(mode, |conn| action(&EntityContext::new(conn)))
    }

    fn find_existing(context: &EntityContext<'_>, id: EntityId) -> DaoResult<T> {
        context
            .find::<T>(id)?
            .ok_or_else(|| DaoError::not_found(T::mapping().entity, id))
    }
}

impl<T: RowMapped> Dao<T> for ContextDao<'_, T> {
    fn find_one(&self, id: Option<EntityId>) -> DaoResult<Option<T>> {
        traced(BACKEND, "find_one", T::mapping().entity, || {
            let id = require_id::<T>(id)?;
            self.in_context(TxMode::ReadOnly, |context| context.find::<T>(id))
        })
    }

    fn save(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "save", T::mapping().entity, || {
            self.in_context(TxMode::ReadWrite, |context| {
                let mut persisted = entity.clone();
                context.persist(&mut persisted)?;
                Ok(persisted)
            })
        })
    }

    fn update(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "update", T::mapping().entity, || {
            let id = require_identifier(entity, "update")?;
            self.in_context(TxMode::ReadWrite, |context| {
                Self::find_existing(context, id)?;
                context.merge(entity)
            })
        })
    }

    fn delete(&self, entity: &T) -> DaoResult<()> {
        traced(BACKEND, "delete", T::mapping().entity, || {
            let id = require_identifier(entity, "delete")?;
            self.in_context(TxMode::ReadWrite, |context| {
                let existing = Self::find_existing(context, id)?;
                context.remove(&existing)
            })
        })
    }

    fn get_all(&self) -> DaoResult<Vec<T>> {
        traced(BACKEND, "get_all", T::mapping().entity, || {
            self.in_context(TxMode::ReadOnly, |context| {
                context.create_query::<T>(&Criteria::new())?.get_result_list()
            })
        })
    }
}
