//! Bet table mapping and example finders.
//!
//! # Responsibility
//! - Map `Bet` onto the `bet` table for every backend.
//! - Provide the two example finders on each adapter.
//!
//! # Invariants
//! - `bet_date` is stored as `YYYY-MM-DD HH:MM:SS[.fff]` text so equality
//!   filters compare exact instants.

use crate::dao::mapper::{statement_id, StatementRegistry};
use crate::dao::{DaoResult, RowMapped, TableMapping};
use crate::model::bet::Bet;
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::Row;

mod finders;

pub use finders::BetFinder;

pub const BET_TABLE: &str = "bet";
pub const BET_ID: &str = "id";
pub const BET_TEAM1: &str = "team1";
pub const BET_TEAM2: &str = "team2";
pub const BET_SCORE: &str = "score";
pub const BET_DATE: &str = "bet_date";

pub const BET_MAPPING: TableMapping = TableMapping {
    entity: "Bet",
    table: BET_TABLE,
    id_column: BET_ID,
    columns: &[BET_TEAM1, BET_TEAM2, BET_SCORE, BET_DATE],
};

const BET_DATE_FORMAT: &str = "%F %T%.f";

/// Storage value of a bet date.
pub fn date_value(date: NaiveDateTime) -> Value {
    Value::Text(date.format(BET_DATE_FORMAT).to_string())
}

impl RowMapped for Bet {
    fn mapping() -> &'static TableMapping {
        &BET_MAPPING
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.team1.clone()),
            Value::Text(self.team2.clone()),
            Value::Text(self.score.clone()),
            date_value(self.bet_date),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(BET_ID)?),
            team1: row.get(BET_TEAM1)?,
            team2: row.get(BET_TEAM2)?,
            score: row.get(BET_SCORE)?,
            bet_date: row.get(BET_DATE)?,
        })
    }
}

/// Statement registry for `Bet`: the CRUD statements plus the finder
/// statements `selectOneBet` and `selectListBet`.
pub fn bet_mapper_registry() -> DaoResult<StatementRegistry> {
    let mut registry = StatementRegistry::for_table(&BET_MAPPING)?;
    let select = format!("SELECT {} FROM {BET_TABLE}", BET_MAPPING.select_list());
    registry.register(
        &statement_id("selectOne", BET_MAPPING.entity),
        &format!(
            "{select} WHERE {BET_TEAM1} = #{{{BET_TEAM1}}} AND {BET_TEAM2} = #{{{BET_TEAM2}}} \
             AND {BET_DATE} = #{{{BET_DATE}}} ORDER BY {BET_ID}"
        ),
    )?;
    registry.register(
        &statement_id("selectList", BET_MAPPING.entity),
        &format!(
            "{select} WHERE {BET_TEAM1} = #{{{BET_TEAM1}}} AND {BET_TEAM2} = #{{{BET_TEAM2}}} \
             ORDER BY {BET_ID}"
        ),
    )?;
    Ok(registry)
}
