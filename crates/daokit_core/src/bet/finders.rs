//! Example finders implemented in each backend's own vocabulary.

use super::{date_value, BET_DATE, BET_ID, BET_MAPPING, BET_TABLE, BET_TEAM1, BET_TEAM2};
use crate::dao::context::{ContextDao, Criteria};
use crate::dao::managed::ManagedDao;
use crate::dao::mapper::{statement_id, MapperDao, ParamMap};
use crate::dao::session::SessionDao;
use crate::dao::template::TemplateDao;
use crate::dao::DaoResult;
use crate::model::bet::Bet;
use chrono::NaiveDateTime;
use rusqlite::types::Value;

const BY_TEAMS_AND_DATE_QUERY: &str =
    "from Bet b where b.team1 = ? and b.team2 = ? and b.bet_date = ?";
const BY_TEAMS_QUERY: &str = "from Bet b where b.team1 = ? and b.team2 = ?";

/// Bet lookups by match.
pub trait BetFinder {
    /// Returns the single bet on `team1` vs `team2` at `date`.
    ///
    /// # Errors
    /// - `DataAccess(NonUniqueResult)` when several bets match.
    fn find_bet_by_teams_and_date(
        &self,
        team1: &str,
        team2: &str,
        date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>>;

    /// Returns every bet on `team1` vs `team2`, oldest id first.
    fn find_bet_by_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>>;
}

fn teams(team1: &str, team2: &str) -> Vec<Value> {
    vec![Value::Text(team1.to_string()), Value::Text(team2.to_string())]
}

fn teams_and_date(team1: &str, team2: &str, date: NaiveDateTime) -> Vec<Value> {
    let mut values = teams(team1, team2);
    values.push(date_value(date));
    values
}

impl BetFinder for SessionDao<'_, Bet> {
    fn find_bet_by_teams_and_date(
        &self,
        team1: &str,
        team2: &str,
        date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>> {
        self.execute_single_result(BY_TEAMS_AND_DATE_QUERY, teams_and_date(team1, team2, date))
    }

    fn find_bet_by_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>> {
        self.execute_result_list(BY_TEAMS_QUERY, teams(team1, team2))
    }
}

impl BetFinder for ContextDao<'_, Bet> {
    fn find_bet_by_teams_and_date(
        &self,
        team1: &str,
        team2: &str,
        date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>> {
        let criteria = Criteria::new()
            .eq(BET_TEAM1, team1.to_string())
            .eq(BET_TEAM2, team2.to_string())
            .eq(BET_DATE, date_value(date));
        self.execute_single_result(&criteria)
    }

    fn find_bet_by_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>> {
        let criteria = Criteria::new()
            .eq(BET_TEAM1, team1.to_string())
            .eq(BET_TEAM2, team2.to_string());
        self.execute_result_list(&criteria)
    }
}

impl BetFinder for MapperDao<'_, Bet> {
    fn find_bet_by_teams_and_date(
        &self,
        team1: &str,
        team2: &str,
        date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>> {
        let params: ParamMap = [BET_TEAM1, BET_TEAM2, BET_DATE]
            .into_iter()
            .map(str::to_string)
            .zip(teams_and_date(team1, team2, date))
            .collect();
        self.execute_single_result(&statement_id("selectOne", BET_MAPPING.entity), &params)
    }

    fn find_bet_by_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>> {
        let params: ParamMap = [BET_TEAM1, BET_TEAM2]
            .into_iter()
            .map(str::to_string)
            .zip(teams(team1, team2))
            .collect();
        self.execute_result_list(&statement_id("selectList", BET_MAPPING.entity), &params)
    }
}

impl BetFinder for TemplateDao<'_, Bet> {
    fn find_bet_by_teams_and_date(
        &self,
        team1: &str,
        team2: &str,
        date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>> {
        let sql = format!(
            "SELECT * FROM {BET_TABLE} WHERE {BET_TEAM1} = ?1 AND {BET_TEAM2} = ?2 AND {BET_DATE} = ?3"
        );
        self.execute_single_result(&sql, &teams_and_date(team1, team2, date))
    }

    fn find_bet_by_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>> {
        let sql = format!(
            "SELECT * FROM {BET_TABLE} WHERE {BET_TEAM1} = ?1 AND {BET_TEAM2} = ?2 ORDER BY {BET_ID}"
        );
        self.execute_result_list(&sql, &teams(team1, team2))
    }
}

impl BetFinder for ManagedDao<'_, Bet> {
    fn find_bet_by_teams_and_date(
        &self,
        team1: &str,
        team2: &str,
        date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>> {
        self.execute_single_result(BY_TEAMS_AND_DATE_QUERY, teams_and_date(team1, team2, date))
    }

    fn find_bet_by_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>> {
        self.execute_result_list(BY_TEAMS_QUERY, teams(team1, team2))
    }
}
