//! Bet domain model.
//!
//! # Invariants
//! - `id` is `None` until the bet has been saved once; afterwards it
//!   identifies the stored row.

use super::entity::{Entity, EntityId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A wager on a match between two teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: Option<EntityId>,
    pub team1: String,
    pub team2: String,
    pub score: String,
    pub bet_date: NaiveDateTime,
}

impl Bet {
    /// Creates an unsaved bet.
    pub fn new(
        team1: impl Into<String>,
        team2: impl Into<String>,
        score: impl Into<String>,
        bet_date: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            team1: team1.into(),
            team2: team2.into(),
            score: score.into(),
            bet_date,
        }
    }

    /// Returns whether this bet has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl Entity for Bet {
    fn entity_name() -> &'static str {
        "Bet"
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
