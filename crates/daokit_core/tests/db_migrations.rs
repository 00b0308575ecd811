use daokit_core::db::migrations::{latest_version, schema_version};
use daokit_core::db::{open_db, open_db_in_memory, DataSource, DbError};
use rusqlite::Connection;
use std::path::PathBuf;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "bet");
    assert_index_exists(&conn, "idx_bet_teams");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bets.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO bet (team1, team2, score, bet_date) VALUES ('a', 'b', '', '2013-12-18 00:00:00')",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM bet", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    for err in [
        open_db(&path).unwrap_err(),
        DataSource::file(&path).unwrap_err(),
    ] {
        match err {
            DbError::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => {
                assert_eq!(db_version, 999);
                assert_eq!(latest_supported, latest_version());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn data_source_connections_are_configured_and_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let source = DataSource::file(dir.path().join("bets.db")).unwrap();
    assert!(!source.is_in_memory());
    assert!(source.describe().starts_with("file:"));

    let conn = source.connect().unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn in_memory_sources_are_shared_per_source_and_isolated_between_sources() {
    let first = DataSource::in_memory().unwrap();
    let second = DataSource::in_memory().unwrap();
    assert!(first.is_in_memory());

    let writer = first.connect().unwrap();
    writer
        .execute(
            "INSERT INTO bet (team1, team2, score, bet_date) VALUES ('a', 'b', '', '2013-12-18 00:00:00')",
            [],
        )
        .unwrap();
    drop(writer);

    assert_eq!(count_bets(&first.connect().unwrap()), 1);
    assert_eq!(count_bets(&second.connect().unwrap()), 0);
}

#[test]
fn in_memory_source_removes_its_scratch_database_on_drop() {
    let source = DataSource::in_memory().unwrap();
    let description = source.describe();
    let path = PathBuf::from(description.strip_prefix("scratch:").unwrap());
    assert!(path.exists());

    drop(source);
    assert!(!path.exists());
}

fn count_bets(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM bet", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
