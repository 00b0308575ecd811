//! Bet use-case service.
//!
//! # Invariants
//! - The service never touches storage directly; every call goes through
//!   the injected DAO.
//! - Team names are trimmed and must be non-empty before any DAO call.

use crate::bet::BetFinder;
use crate::dao::{Dao, DaoError, DaoResult};
use crate::model::bet::Bet;
use crate::model::entity::EntityId;
use chrono::NaiveDateTime;

/// Use-case wrapper for bet bookkeeping over any backend adapter.
pub struct BetService<D> {
    dao: D,
}

impl<D: Dao<Bet> + BetFinder> BetService<D> {
    pub fn new(dao: D) -> Self {
        Self { dao }
    }

    pub fn dao(&self) -> &D {
        &self.dao
    }

    /// Records a new bet and returns it with its assigned identifier.
    pub fn place_bet(
        &self,
        team1: &str,
        team2: &str,
        score: &str,
        bet_date: NaiveDateTime,
    ) -> DaoResult<Bet> {
        let (team1, team2) = normalize_teams(team1, team2)?;
        self.dao
            .save(&Bet::new(team1, team2, score.trim(), bet_date))
    }

    pub fn bet(&self, id: EntityId) -> DaoResult<Option<Bet>> {
        self.dao.find_one(Some(id))
    }

    /// Replaces the score of a stored bet.
    ///
    /// # Errors
    /// - `DataAccess(NotFound)` when no bet has `id`.
    pub fn record_score(&self, id: EntityId, score: &str) -> DaoResult<Bet> {
        let mut bet = self
            .dao
            .find_one(Some(id))?
            .ok_or_else(|| DaoError::not_found("Bet", id))?;
        bet.score = score.trim().to_string();
        self.dao.update(&bet)
    }

    pub fn cancel_bet(&self, bet: &Bet) -> DaoResult<()> {
        self.dao.delete(bet)
    }

    pub fn all_bets(&self) -> DaoResult<Vec<Bet>> {
        self.dao.get_all()
    }

    pub fn bet_for_match(
        &self,
        team1: &str,
        team2: &str,
        bet_date: NaiveDateTime,
    ) -> DaoResult<Option<Bet>> {
        let (team1, team2) = normalize_teams(team1, team2)?;
        self.dao.find_bet_by_teams_and_date(team1, team2, bet_date)
    }

    pub fn bets_between_teams(&self, team1: &str, team2: &str) -> DaoResult<Vec<Bet>> {
        let (team1, team2) = normalize_teams(team1, team2)?;
        self.dao.find_bet_by_teams(team1, team2)
    }
}

fn normalize_teams<'t>(team1: &'t str, team2: &'t str) -> DaoResult<(&'t str, &'t str)> {
    let (team1, team2) = (team1.trim(), team2.trim());
    if team1.is_empty() || team2.is_empty() {
        return Err(DaoError::invalid_argument("team names cannot be empty"));
    }
    Ok((team1, team2))
}
