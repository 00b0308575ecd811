//! Native ORM session backend.
//!
//! # Responsibility
//! - Offer session vocabulary (`get`, `save`, `update`, `delete`) over a
//!   connection owned by the current unit of work.
//! - Translate a small entity query language into SQL:
//!   `from <Entity> [[as] alias] [where <filter>] [order by <order>]`,
//!   where `alias.column` references are checked against the table mapping
//!   and `?` marks positional parameters.
//!
//! # Invariants
//! - Every session call runs in a read-write unit of work.
//! - `save` and `update` return the row as re-read after the write.

use super::error::{DaoError, DaoResult};
use super::mapping::{
    checked_values, insert_entity, require_id, require_identifier, RowMapped, TableMapping,
};
use super::reduce::reduce_single;
use super::unit_of_work::{TransactionScope, TxMode, UnitOfWork};
use super::{traced, Dao};
use crate::db::DataSource;
use crate::model::entity::EntityId;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::marker::PhantomData;

const BACKEND: &str = "session";

static QUERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*from\s+(?P<entity>\w+)(?:\s+(?:as\s+)?(?P<alias>\w+))?(?:\s+where\s+(?P<filter>.+?))?(?:\s+order\s+by\s+(?P<order>.+?))?\s*;?\s*$",
    )
    .expect("entity query regex must compile")
});

static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?P<alias>[A-Za-z_]\w*)\.(?P<column>[A-Za-z_]\w*)\b")
        .expect("property path regex must compile")
});

static LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^']|'')*'").expect("string literal regex must compile")
});

/// Session bound to the connection of one unit of work.
pub struct OrmSession<'c> {
    conn: &'c Connection,
}

impl<'c> OrmSession<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn get<T: RowMapped>(&self, id: EntityId) -> DaoResult<Option<T>> {
        let entity = self
            .conn
            .query_row(&T::mapping().select_by_id_sql(), params![id], |row| {
                T::from_row(row)
            })
            .optional()?;
        Ok(entity)
    }

    /// Inserts the entity and returns its identifier, generated unless preset.
    pub fn save<T: RowMapped>(&self, entity: &T) -> DaoResult<EntityId> {
        insert_entity(self.conn, entity)
    }

    pub fn update<T: RowMapped>(&self, entity: &T) -> DaoResult<()> {
        let id = require_identifier(entity, "update")?;
        let mut values = checked_values(entity)?;
        values.push(Value::Integer(id));
        let changed = self
            .conn
            .execute(&T::mapping().update_sql(), params_from_iter(values))?;
        if changed == 0 {
            return Err(DaoError::not_found(T::mapping().entity, id));
        }
        Ok(())
    }

    pub fn delete<T: RowMapped>(&self, entity: &T) -> DaoResult<()> {
        let id = require_identifier(entity, "delete")?;
        let changed = self
            .conn
            .execute(&T::mapping().delete_sql(), params![id])?;
        if changed == 0 {
            return Err(DaoError::not_found(T::mapping().entity, id));
        }
        Ok(())
    }

    /// Parses an entity query; parameters are bound on the returned query.
    pub fn create_query<T: RowMapped>(&self, query: &str) -> DaoResult<OrmQuery<'c, T>> {
        let sql = translate_query(T::mapping(), query)?;
        Ok(OrmQuery {
            conn: self.conn,
            sql,
            params: Vec::new(),
            _entity: PhantomData,
        })
    }
}

/// Entity query with positional parameters.
pub struct OrmQuery<'c, T> {
    conn: &'c Connection,
    sql: String,
    params: Vec<Value>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: RowMapped> OrmQuery<'_, T> {
    /// Binds the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn bind_all(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.params.extend(values);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn list(&self) -> DaoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&self.sql)?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), |row| T::from_row(row))?;
        let entities = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    pub fn unique_result(&self) -> DaoResult<Option<T>> {
        reduce_single(T::mapping().entity, self.list()?)
    }
}

fn translate_query(mapping: &TableMapping, query: &str) -> DaoResult<String> {
    let captures = QUERY_RE
        .captures(query)
        .ok_or_else(|| DaoError::mapping(format!("unsupported entity query `{query}`")))?;

    let entity = &captures["entity"];
    if entity != mapping.entity {
        return Err(DaoError::mapping(format!(
            "query targets `{entity}` but session maps `{}`",
            mapping.entity
        )));
    }

    let alias = captures.name("alias").map(|m| m.as_str());
    let mut sql = format!("SELECT {} FROM {}", mapping.select_list(), mapping.table);
    if let Some(filter) = captures.name("filter") {
        sql.push_str(" WHERE ");
        sql.push_str(&translate_paths(mapping, alias, filter.as_str())?);
    }
    sql.push_str(" ORDER BY ");
    match captures.name("order") {
        Some(order) => sql.push_str(&translate_paths(mapping, alias, order.as_str())?),
        None => sql.push_str(mapping.id_column),
    }
    Ok(sql)
}

/// Rewrites `alias.column` paths outside quoted string literals.
fn translate_paths(mapping: &TableMapping, alias: Option<&str>, clause: &str) -> DaoResult<String> {
    let mut translated = String::with_capacity(clause.len());
    let mut rest = 0;
    for literal in LITERAL_RE.find_iter(clause) {
        translated.push_str(&translate_segment(mapping, alias, &clause[rest..literal.start()])?);
        translated.push_str(literal.as_str());
        rest = literal.end();
    }
    translated.push_str(&translate_segment(mapping, alias, &clause[rest..])?);
    Ok(translated)
}

fn translate_segment(mapping: &TableMapping, alias: Option<&str>, clause: &str) -> DaoResult<String> {
    for path in PATH_RE.captures_iter(clause) {
        let (path_alias, column) = (&path["alias"], &path["column"]);
        if Some(path_alias) != alias {
            return Err(DaoError::mapping(format!(
                "unknown alias `{path_alias}` in entity query"
            )));
        }
        if !mapping.has_column(column) {
            return Err(DaoError::mapping(format!(
                "`{}` has no mapped column `{column}`",
                mapping.entity
            )));
        }
    }
    Ok(PATH_RE.replace_all(clause, "${column}").into_owned())
}

/// DAO adapter over [`OrmSession`].
pub struct SessionDao<'a, T> {
    uow: UnitOfWork<'a>,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: RowMapped> SessionDao<'a, T> {
    pub fn new(source: &'a DataSource) -> Self {
        Self {
            uow: UnitOfWork::new(source),
            _entity: PhantomData,
        }
    }

    /// Joins the caller's transaction instead of opening one per call.
    pub fn with_scope(source: &'a DataSource, scope: &'a TransactionScope) -> Self {
        Self {
            uow: UnitOfWork::in_scope(source, scope),
            _entity: PhantomData,
        }
    }

    /// Runs an arbitrary session action in one read-write unit of work.
    pub fn execute_action<R>(
        &self,
        action: impl FnOnce(&OrmSession<'_>) -> DaoResult<R>,
    ) -> DaoResult<R> {
        traced(BACKEND, "execute_action", T::mapping().entity, || {
            self.in_session(action)
        })
    }

    /// Runs an entity query and reduces it to at most one entity.
    pub fn execute_single_result(&self, query: &str, params: Vec<Value>) -> DaoResult<Option<T>> {
        traced(BACKEND, "single_result", T::mapping().entity, || {
            self.in_session(|session| {
                session
                    .create_query::<T>(query)?
                    .bind_all(params)
                    .unique_result()
            })
        })
    }

    /// Runs an entity query and returns every matching entity.
    pub fn execute_result_list(&self, query: &str, params: Vec<Value>) -> DaoResult<Vec<T>> {
        traced(BACKEND, "result_list", T::mapping().entity, || {
            self.in_session(|session| session.create_query::<T>(query)?.bind_all(params).list())
        })
    }

    fn in_session<R>(&self, action: impl FnOnce(&OrmSession<'_>) -> DaoResult<R>) -> DaoResult<R> {
        self.uow
            .execute(TxMode::ReadWrite, |conn| action(&OrmSession::new(conn)))
    }

    fn reload(session: &OrmSession<'_>, id: EntityId) -> DaoResult<T> {
        session
            .get::<T>(id)?
            .ok_or_else(|| DaoError::not_found(T::mapping().entity, id))
    }
}

impl<T: RowMapped> Dao<T> for SessionDao<'_, T> {
    fn find_one(&self, id: Option<EntityId>) -> DaoResult<Option<T>> {
        traced(BACKEND, "find_one", T::mapping().entity, || {
            let id = require_id::<T>(id)?;
            self.in_session(|session| session.get::<T>(id))
        })
    }

    fn save(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "save", T::mapping().entity, || {
            self.in_session(|session| {
                let id = session.save(entity)?;
                Self::reload(session, id)
            })
        })
    }

    fn update(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "update", T::mapping().entity, || {
            let id = require_identifier(entity, "update")?;
            self.in_session(|session| {
                session.update(entity)?;
                Self::reload(session, id)
            })
        })
    }

    fn delete(&self, entity: &T) -> DaoResult<()> {
        traced(BACKEND, "delete", T::mapping().entity, || {
            require_identifier(entity, "delete")?;
            self.in_session(|session| session.delete(entity))
        })
    }

    fn get_all(&self) -> DaoResult<Vec<T>> {
        traced(BACKEND, "get_all", T::mapping().entity, || {
            self.in_session(|session| {
                session
                    .create_query::<T>(&format!("from {}", T::mapping().entity))?
                    .list()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::translate_query;
    use crate::dao::mapping::TableMapping;

    const MAPPING: TableMapping = TableMapping {
        entity: "Bet",
        table: "bet",
        id_column: "id",
        columns: &["team1", "team2", "score", "bet_date"],
    };

    #[test]
    fn translates_aliased_filter() {
        let sql = translate_query(&MAPPING, "from Bet b where b.team1 = ? and b.team2 = ?").unwrap();
        assert_eq!(
            sql,
            "SELECT id, team1, team2, score, bet_date FROM bet WHERE team1 = ? and team2 = ? ORDER BY id"
        );
    }

    #[test]
    fn translates_order_clause() {
        let sql = translate_query(&MAPPING, "FROM Bet as b order by b.bet_date desc").unwrap();
        assert!(sql.ends_with("FROM bet ORDER BY bet_date desc"));
    }

    #[test]
    fn leaves_quoted_literals_untouched() {
        let sql =
            translate_query(&MAPPING, "from Bet b where b.team1 = 'x.y' and b.team2 = 'it''s b.z'")
                .unwrap();
        assert!(sql.contains("WHERE team1 = 'x.y' and team2 = 'it''s b.z' ORDER BY id"));
    }

    #[test]
    fn rejects_unknown_entity_alias_and_column() {
        assert!(translate_query(&MAPPING, "from Match m").is_err());
        assert!(translate_query(&MAPPING, "from Bet b where x.team1 = ?").is_err());
        assert!(translate_query(&MAPPING, "from Bet b where b.stake = ?").is_err());
        assert!(translate_query(&MAPPING, "select * from bet").is_err());
    }
}
