//! Managed SQL-template backend.
//!
//! # Responsibility
//! - Run hand-built parameterized SQL and map rows with a row-mapper
//!   function.
//! - Insert rows from explicit column arrays and return the generated key.
//!
//! # Invariants
//! - A caller-preset identifier is inserted as-is; duplicates surface as
//!   backend errors.

use super::error::{DaoError, DaoResult};
use super::mapping::{checked_values, require_id, require_identifier, RowMapped};
use super::reduce::reduce_single;
use super::unit_of_work::{TransactionScope, TxMode, UnitOfWork};
use super::{traced, Dao};
use crate::db::DataSource;
use crate::model::entity::EntityId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

const BACKEND: &str = "template";

/// Row-mapper function turning one result row into a value.
pub type RowMapper<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// SQL template bound to the connection of one unit of work.
pub struct SqlTemplate<'c> {
    conn: &'c Connection,
}

impl<'c> SqlTemplate<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn query<T>(
        &self,
        sql: &str,
        params: &[Value],
        mut row_mapper: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> DaoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| row_mapper(row))?;
        let values = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }

    /// Runs an `INSERT`, `UPDATE`, or `DELETE` and returns the affected row count.
    pub fn update(&self, sql: &str, params: &[Value]) -> DaoResult<usize> {
        let changed = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(changed)
    }

    /// Inserts one row from column arrays and returns its row id.
    pub fn insert_and_return_key(
        &self,
        table: &str,
        columns: &[&str],
        values: Vec<Value>,
    ) -> DaoResult<EntityId> {
        if columns.is_empty() || columns.len() != values.len() {
            return Err(DaoError::mapping(format!(
                "insert into {table}: {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(self.conn.last_insert_rowid())
    }
}

/// DAO adapter over [`SqlTemplate`].
pub struct TemplateDao<'a, T> {
    uow: UnitOfWork<'a>,
    row_mapper: RowMapper<T>,
}

impl<'a, T: RowMapped> TemplateDao<'a, T> {
    pub fn new(source: &'a DataSource) -> Self {
        Self::with_row_mapper(source, T::from_row)
    }

    pub fn with_row_mapper(source: &'a DataSource, row_mapper: RowMapper<T>) -> Self {
        Self {
            uow: UnitOfWork::new(source),
            row_mapper,
        }
    }

    pub fn with_scope(source: &'a DataSource, scope: &'a TransactionScope) -> Self {
        Self::with_scope_and_row_mapper(source, scope, T::from_row)
    }

    /// Joins the caller's transaction and maps rows with `row_mapper`.
    pub fn with_scope_and_row_mapper(
        source: &'a DataSource,
        scope: &'a TransactionScope,
        row_mapper: RowMapper<T>,
    ) -> Self {
        Self {
            uow: UnitOfWork::in_scope(source, scope),
            row_mapper,
        }
    }

    pub fn execute_single_result(&self, sql: &str, params: &[Value]) -> DaoResult<Option<T>> {
        traced(BACKEND, "single_result", T::mapping().entity, || {
            let rows = self.select(sql, params)?;
            reduce_single(T::mapping().entity, rows)
        })
    }

    pub fn execute_result_list(&self, sql: &str, params: &[Value]) -> DaoResult<Vec<T>> {
        traced(BACKEND, "result_list", T::mapping().entity, || {
            self.select(sql, params)
        })
    }

    fn select(&self, sql: &str, params: &[Value]) -> DaoResult<Vec<T>> {
        self.uow.execute(TxMode::ReadOnly, |conn| {
            SqlTemplate::new(conn).query(sql, params, self.row_mapper)
        })
    }

    fn select_by_id(&self, template: &SqlTemplate<'_>, id: EntityId) -> DaoResult<Option<T>> {
        let mapping = T::mapping();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            mapping.table, mapping.id_column
        );
        let rows = template.query(&sql, &[Value::Integer(id)], self.row_mapper)?;
        reduce_single(mapping.entity, rows)
    }
}

impl<T: RowMapped> Dao<T> for TemplateDao<'_, T> {
    fn find_one(&self, id: Option<EntityId>) -> DaoResult<Option<T>> {
        traced(BACKEND, "find_one", T::mapping().entity, || {
            let id = require_id::<T>(id)?;
            self.uow.execute(TxMode::ReadOnly, |conn| {
                self.select_by_id(&SqlTemplate::new(conn), id)
            })
        })
    }

    fn save(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "save", T::mapping().entity, || {
            let mapping = T::mapping();
            let mut columns = mapping.columns.to_vec();
            let mut values = checked_values(entity)?;
            if let Some(id) = entity.id() {
                columns.push(mapping.id_column);
                values.push(Value::Integer(id));
            }
            self.uow.execute(TxMode::ReadWrite, |conn| {
                let id = SqlTemplate::new(conn).insert_and_return_key(
                    mapping.table,
                    &columns,
                    values,
                )?;
                Ok(entity.clone().with_id(id))
            })
        })
    }

    fn update(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "update", T::mapping().entity, || {
            let id = require_identifier(entity, "update")?;
            let mut values = checked_values(entity)?;
            values.push(Value::Integer(id));
            self.uow.execute(TxMode::ReadWrite, |conn| {
                let template = SqlTemplate::new(conn);
                if self.select_by_id(&template, id)?.is_none() {
                    return Err(DaoError::not_found(T::mapping().entity, id));
                }
                template.update(&T::mapping().update_sql(), &values)?;
                Ok(entity.clone())
            })
        })
    }

    fn delete(&self, entity: &T) -> DaoResult<()> {
        traced(BACKEND, "delete", T::mapping().entity, || {
            let id = require_identifier(entity, "delete")?;
            self.uow.execute(TxMode::ReadWrite, |conn| {
                let changed = SqlTemplate::new(conn)
                    .update(&T::mapping().delete_sql(), &[Value::Integer(id)])?;
                if changed == 0 {
                    return Err(DaoError::not_found(T::mapping().entity, id));
                }
                Ok(())
            })
        })
    }

    fn get_all(&self) -> DaoResult<Vec<T>> {
        traced(BACKEND, "get_all", T::mapping().entity, || {
            let mapping = T::mapping();
            self.select(
                &format!(
                    "SELECT * FROM {} ORDER BY {}",
                    mapping.table, mapping.id_column
                ),
                &[],
            )
        })
    }
}
