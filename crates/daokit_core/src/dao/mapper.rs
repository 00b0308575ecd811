//! Statement-mapper backend.
//!
//! # Responsibility
//! - Keep a registry of named SQL statements written with `#{name}`
//!   placeholders, resolved by `{verb}{Entity}` ids such as `findBet`.
//! - Bind parameter maps built from explicit column-name / column-value
//!   arrays.
//!
//! # Invariants
//! - Statement ids are identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
//! - Every placeholder of a statement must be present in the parameter map.
//! - Reads run read-only; writes run in a read-write unit of work.

use super::error::{DaoError, DaoResult};
use super::mapping::{checked_values, require_id, require_identifier, RowMapped, TableMapping};
use super::reduce::reduce_single;
use super::unit_of_work::{TransactionScope, TxMode, UnitOfWork};
use super::{traced, Dao};
use crate::db::DataSource;
use crate::model::entity::EntityId;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{ToSql, Value};
use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

const BACKEND: &str = "mapper";

static STATEMENT_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("statement id regex must compile")
});

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").expect("placeholder regex must compile")
});

/// Named statement parameters.
pub type ParamMap = BTreeMap<String, Value>;

/// Builds the statement id for `verb` on `entity`, e.g. `findAllBet`.
pub fn statement_id(verb: &str, entity: &str) -> String {
    format!("{verb}{entity}")
}

/// Zips column names with values into a parameter map.
///
/// # Errors
/// - `Mapping` when the arrays are empty or differ in length.
pub fn param_map(columns: &[&str], values: Vec<Value>) -> DaoResult<ParamMap> {
    if columns.is_empty() || columns.len() != values.len() {
        return Err(DaoError::mapping(format!(
            "{} column names do not match {} column values",
            columns.len(),
            values.len()
        )));
    }
    Ok(columns
        .iter()
        .map(|column| (*column).to_string())
        .zip(values)
        .collect())
}

/// Parameter map of an entity: data columns plus its (possibly null) identifier.
pub fn entity_params<T: RowMapped>(entity: &T) -> DaoResult<ParamMap> {
    let mapping = T::mapping();
    let mut params = param_map(mapping.columns, checked_values(entity)?)?;
    let id = entity.id().map_or(Value::Null, Value::Integer);
    params.insert(mapping.id_column.to_string(), id);
    Ok(params)
}

/// Statement compiled from a `#{name}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<String>,
    bindings: Vec<String>,
}

impl Statement {
    fn compile(template: &str) -> DaoResult<Self> {
        let mut params: Vec<String> = Vec::new();
        for captures in PLACEHOLDER_RE.captures_iter(template) {
            let name = captures[1].to_string();
            if !params.contains(&name) {
                params.push(name);
            }
        }

        let sql = PLACEHOLDER_RE.replace_all(template, ":$1").into_owned();
        if sql.contains("#{") {
            return Err(DaoError::mapping(format!(
                "malformed placeholder in statement `{template}`"
            )));
        }
        let bindings = params.iter().map(|name| format!(":{name}")).collect();
        Ok(Self {
            sql,
            params,
            bindings,
        })
    }

    /// SQL with `#{name}` rewritten to `:name`.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in first-use order.
    pub fn params(&self) -> &[String] {
        &self.params
    }
}

/// Registry of named statements.
#[derive(Debug, Clone, Default)]
pub struct StatementRegistry {
    statements: HashMap<String, Statement>,
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `find`, `findAll`, `create`, `update`, and `delete`
    /// statements for the mapped table.
    pub fn for_table(mapping: &TableMapping) -> DaoResult<Self> {
        let mut registry = Self::new();
        let entity = mapping.entity;
        let select_list = mapping.select_list();
        let id = mapping.id_column;

        registry.register(
            &statement_id("find", entity),
            &format!(
                "SELECT {select_list} FROM {} WHERE {id} = #{{{id}}}",
                mapping.table
            ),
        )?;
        registry.register(
            &statement_id("findAll", entity),
            &format!("SELECT {select_list} FROM {} ORDER BY {id}", mapping.table),
        )?;
        registry.register(
            &statement_id("create", entity),
            &format!(
                "INSERT INTO {} ({id}, {}) VALUES (#{{{id}}}, {})",
                mapping.table,
                mapping.columns.join(", "),
                placeholders(mapping.columns).join(", ")
            ),
        )?;
        registry.register(
            &statement_id("update", entity),
            &format!(
                "UPDATE {} SET {} WHERE {id} = #{{{id}}}",
                mapping.table,
                mapping
                    .columns
                    .iter()
                    .zip(placeholders(mapping.columns))
                    .map(|(column, placeholder)| format!("{column} = {placeholder}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )?;
        registry.register(
            &statement_id("delete", entity),
            &format!("DELETE FROM {} WHERE {id} = #{{{id}}}", mapping.table),
        )?;

        Ok(registry)
    }

    /// Compiles and stores a statement, replacing any previous one with the id.
    pub fn register(&mut self, id: &str, template: &str) -> DaoResult<()> {
        if !STATEMENT_ID_RE.is_match(id) {
            return Err(DaoError::mapping(format!("invalid statement id `{id}`")));
        }
        let statement = Statement::compile(template)?;
        self.statements.insert(id.to_string(), statement);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    pub fn get(&self, id: &str) -> DaoResult<&Statement> {
        self.statements
            .get(id)
            .ok_or_else(|| DaoError::mapping(format!("unknown statement `{id}`")))
    }
}

fn placeholders(columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .map(|column| format!("#{{{column}}}"))
        .collect()
}

/// Statement executor bound to the connection of one unit of work.
pub struct StatementMapper<'c> {
    conn: &'c Connection,
    registry: &'c StatementRegistry,
}

impl<'c> StatementMapper<'c> {
    pub fn new(conn: &'c Connection, registry: &'c StatementRegistry) -> Self {
        Self { conn, registry }
    }

    pub fn select_list<T: RowMapped>(&self, id: &str, params: &ParamMap) -> DaoResult<Vec<T>> {
        let statement = self.registry.get(id)?;
        let bound = bind(statement, params)?;
        let mut stmt = self.conn.prepare(statement.sql())?;
        let rows = stmt.query_map(bound.as_slice(), |row| T::from_row(row))?;
        let entities = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    pub fn select_one<T: RowMapped>(&self, id: &str, params: &ParamMap) -> DaoResult<Option<T>> {
        reduce_single(T::mapping().entity, self.select_list(id, params)?)
    }

    /// Runs an insert statement and returns the row id it produced.
    pub fn insert(&self, id: &str, params: &ParamMap) -> DaoResult<EntityId> {
        self.execute(id, params)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, id: &str, params: &ParamMap) -> DaoResult<usize> {
        self.execute(id, params)
    }

    pub fn delete(&self, id: &str, params: &ParamMap) -> DaoResult<usize> {
        self.execute(id, params)
    }

    fn execute(&self, id: &str, params: &ParamMap) -> DaoResult<usize> {
        let statement = self.registry.get(id)?;
        let bound = bind(statement, params)?;
        let mut stmt = self.conn.prepare(statement.sql())?;
        let changed = stmt.execute(bound.as_slice())?;
        Ok(changed)
    }
}

fn bind<'s, 'p>(
    statement: &'s Statement,
    params: &'p ParamMap,
) -> DaoResult<Vec<(&'s str, &'p dyn ToSql)>> {
    statement
        .params
        .iter()
        .zip(&statement.bindings)
        .map(|(name, binding)| {
            let value = params
                .get(name)
                .ok_or_else(|| DaoError::mapping(format!("missing statement parameter `{name}`")))?;
            Ok((binding.as_str(), value as &dyn ToSql))
        })
        .collect()
}

/// DAO adapter over [`StatementMapper`].
pub struct MapperDao<'a, T> {
    uow: UnitOfWork<'a>,
    registry: StatementRegistry,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: RowMapped> MapperDao<'a, T> {
    pub fn new(source: &'a DataSource, registry: StatementRegistry) -> Self {
        Self {
            uow: UnitOfWork::new(source),
            registry,
            _entity: PhantomData,
        }
    }

    pub fn with_scope(
        source: &'a DataSource,
        scope: &'a TransactionScope,
        registry: StatementRegistry,
    ) -> Self {
        Self {
            uow: UnitOfWork::in_scope(source, scope),
            registry,
            _entity: PhantomData,
        }
    }

    pub fn registry(&self) -> &StatementRegistry {
        &self.registry
    }

    pub fn execute_single_result(&self, id: &str, params: &ParamMap) -> DaoResult<Option<T>> {
        traced(BACKEND, "single_result", T::mapping().entity, || {
            self.in_mapper(TxMode::ReadOnly, |mapper| mapper.select_one(id, params))
        })
    }

    pub fn execute_result_list(&self, id: &str, params: &ParamMap) -> DaoResult<Vec<T>> {
        traced(BACKEND, "result_list", T::mapping().entity, || {
            self.in_mapper(TxMode::ReadOnly, |mapper| mapper.select_list(id, params))
        })
    }

    fn in_mapper<R>(
        &self,
        mode: TxMode,
        action: impl FnOnce(&StatementMapper<'_>) -> DaoResult<R>,
    ) -> DaoResult<R> {
        self.uow.execute(mode, |conn| {
            action(&StatementMapper::new(conn, &self.registry))
        })
    }

    fn id_params(id: EntityId) -> ParamMap {
        ParamMap::from([(T::mapping().id_column.to_string(), Value::Integer(id))])
    }

    fn verb(verb: &str) -> String {
        statement_id(verb, T::mapping().entity)
    }
}

impl<T: RowMapped> Dao<T> for MapperDao<'_, T> {
    fn find_one(&self, id: Option<EntityId>) -> DaoResult<Option<T>> {
        traced(BACKEND, "find_one", T::mapping().entity, || {
            let id = require_id::<T>(id)?;
            self.in_mapper(TxMode::ReadOnly, |mapper| {
                mapper.select_one(&Self::verb("find"), &Self::id_params(id))
            })
        })
    }

    fn save(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "save", T::mapping().entity, || {
            let params = entity_params(entity)?;
            self.in_mapper(TxMode::ReadWrite, |mapper| {
                let id = mapper.insert(&Self::verb("create"), &params)?;
                Ok(entity.clone().with_id(id))
            })
        })
    }

    fn update(&self, entity: &T) -> DaoResult<T> {
        traced(BACKEND, "update", T::mapping().entity, || {
            let id = require_identifier(entity, "update")?;
            let params = entity_params(entity)?;
            self.in_mapper(TxMode::ReadWrite, |mapper| {
                mapper
                    .select_one::<T>(&Self::verb("find"), &Self::id_params(id))?
                    .ok_or_else(|| DaoError::not_found(T::mapping().entity, id))?;
                mapper.update(&Self::verb("update"), &params)?;
                Ok(entity.clone())
            })
        })
    }

    fn delete(&self, entity: &T) -> DaoResult<()> {
        traced(BACKEND, "delete", T::mapping().entity, || {
            let id = require_identifier(entity, "delete")?;
            self.in_mapper(TxMode::ReadWrite, |mapper| {
                let changed = mapper.delete(&Self::verb("delete"), &Self::id_params(id))?;
                if changed == 0 {
                    return Err(DaoError::not_found(T::mapping().entity, id));
                }
                Ok(())
            })
        })
    }

    fn get_all(&self) -> DaoResult<Vec<T>> {
        traced(BACKEND, "get_all", T::mapping().entity, || {
            self.in_mapper(TxMode::ReadOnly, |mapper| {
                mapper.select_list(&Self::verb("findAll"), &ParamMap::new())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{param_map, statement_id, Statement, StatementRegistry};
    use rusqlite::types::Value;

    #[test]
    fn compiles_placeholders_to_named_parameters() {
        let statement =
            Statement::compile("SELECT * FROM bet WHERE team1 = #{team1} AND team2 = #{ team2 } OR team1 = #{team1}")
                .unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT * FROM bet WHERE team1 = :team1 AND team2 = :team2 OR team1 = :team1"
        );
        assert_eq!(
            statement.params().to_vec(),
            vec!["team1".to_string(), "team2".to_string()]
        );
    }

    #[test]
    fn rejects_malformed_placeholder_and_statement_id() {
        assert!(Statement::compile("SELECT * FROM bet WHERE id = #{1id}").is_err());
        let mut registry = StatementRegistry::new();
        assert!(registry.register("find bet", "SELECT 1").is_err());
        assert!(registry.get("findBet").is_err());
    }

    #[test]
    fn param_map_requires_matching_arrays() {
        assert!(param_map(&["team1", "team2"], vec![Value::Null]).is_err());
        assert!(param_map(&[], Vec::new()).is_err());
        let params = param_map(&["team1"], vec![Value::Text("a".to_string())]).unwrap();
        assert_eq!(params.get("team1"), Some(&Value::Text("a".to_string())));
    }

    #[test]
    fn statement_ids_join_verb_and_entity() {
        assert_eq!(statement_id("findAll", "Bet"), "findAllBet");
    }
}
