//! Static table mappings and row conversion.
//!
//! # Responsibility
//! - Describe how an entity type maps to a table (name, key, data columns).
//! - Build the small CRUD statements shared by the SQL-flavoured backends.
//! - Convert between entities and rows without runtime introspection.
//!
//! # Invariants
//! - `columns` lists data columns only, in the order `column_values` emits.
//! - The identifier column is never part of `columns`.

use super::error::{DaoError, DaoResult};
use crate::model::entity::{Entity, EntityId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

/// Table configuration for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMapping {
    pub entity: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: &'static [&'static str],
}

impl TableMapping {
    /// Comma-separated select list: identifier first, then data columns.
    pub fn select_list(&self) -> String {
        let mut list = String::from(self.id_column);
        for column in self.columns {
            list.push_str(", ");
            list.push_str(column);
        }
        list
    }

    pub fn select_by_id_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.select_list(),
            self.table,
            self.id_column
        )
    }

    /// `INSERT` over data columns only; the backend assigns the key.
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            positional(1, self.columns.len())
        )
    }

    /// `INSERT` of a caller-chosen identifier (first parameter) plus data columns.
    pub fn insert_with_id_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}, {}) VALUES ({})",
            self.table,
            self.id_column,
            self.columns.join(", "),
            positional(1, self.columns.len() + 1)
        )
    }

    /// `UPDATE` of all data columns; the identifier is the last parameter.
    pub fn update_sql(&self) -> String {
        let assignments = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table,
            assignments,
            self.id_column,
            self.columns.len() + 1
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?1", self.table, self.id_column)
    }

    /// Returns whether `column` is the identifier or a mapped data column.
    pub fn has_column(&self, column: &str) -> bool {
        column == self.id_column || self.columns.contains(&column)
    }
}

fn positional(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Entity convertible to and from rows of its mapped table.
pub trait RowMapped: Entity + Clone + Sized {
    fn mapping() -> &'static TableMapping;

    /// Data column values in `mapping().columns` order.
    fn column_values(&self) -> Vec<Value>;

    /// Reads an entity from a row selected with `mapping().select_list()`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Returns the entity's column values after checking them against the mapping.
pub(crate) fn checked_values<T: RowMapped>(entity: &T) -> DaoResult<Vec<Value>> {
    let mapping = T::mapping();
    let values = entity.column_values();
    if mapping.columns.is_empty() || values.len() != mapping.columns.len() {
        return Err(DaoError::mapping(format!(
            "{} maps {} columns but produced {} values",
            mapping.entity,
            mapping.columns.len(),
            values.len()
        )));
    }
    Ok(values)
}

/// Inserts one entity row and returns its identifier.
///
/// A preset identifier is written as-is, so saving an entity whose row
/// already exists fails on the primary key instead of re-keying it.
pub(crate) fn insert_entity<T: RowMapped>(conn: &Connection, entity: &T) -> DaoResult<EntityId> {
    let mapping = T::mapping();
    let mut values = checked_values(entity)?;
    match entity.id() {
        Some(id) => {
            values.insert(0, Value::Integer(id));
            conn.execute(&mapping.insert_with_id_sql(), params_from_iter(values))?;
            Ok(id)
        }
        None => {
            conn.execute(&mapping.insert_sql(), params_from_iter(values))?;
            Ok(conn.last_insert_rowid())
        }
    }
}

/// Returns the identifier of an entity that must already be persisted.
pub(crate) fn require_identifier<T: Entity>(entity: &T, operation: &str) -> DaoResult<EntityId> {
    entity.id().ok_or_else(|| {
        DaoError::invalid_argument(format!(
            "{operation} {} requires an entity identifier",
            T::entity_name()
        ))
    })
}

/// Returns the identifier argument of a lookup, rejecting an absent one.
pub(crate) fn require_id<T: Entity>(id: Option<EntityId>) -> DaoResult<EntityId> {
    id.ok_or_else(|| {
        DaoError::invalid_argument(format!("find {} requires an identifier", T::entity_name()))
    })
}
