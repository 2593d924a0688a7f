use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::ContestResult;

/// One resolved comparison between two of a user's films
///
/// History entries are append-only: they are validated once on creation and
/// never mutated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub comparison_id: Uuid,
    pub user_id: Uuid,
    pub film_a_id: Uuid,
    pub film_b_id: Uuid,
    pub winning_film_id: Option<Uuid>,
    pub was_equal: bool,
    pub compared_at: DateTime<Utc>,
}

impl ComparisonEntry {
    /// Builds a validated entry from a contest result
    pub fn new(
        user_id: Uuid,
        film_a_id: Uuid,
        film_b_id: Uuid,
        result: ContestResult,
    ) -> AppResult<Self> {
        let (winning_film_id, was_equal) = match result {
            ContestResult::Winner(id) => (Some(id), false),
            ContestResult::Equal => (None, true),
        };

        let entry = Self {
            comparison_id: Uuid::new_v4(),
            user_id,
            film_a_id,
            film_b_id,
            winning_film_id,
            was_equal,
            compared_at: Utc::now(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Checks the structural invariants of a history entry
    ///
    /// A pair must name two distinct films, and the winner/equal fields are
    /// mutually exclusive: an equal entry carries no winner, a decided entry
    /// names exactly one of the two films.
    pub fn validate(&self) -> AppResult<()> {
        if self.film_a_id == self.film_b_id {
            return Err(AppError::Validation(
                "comparison requires two distinct films".to_string(),
            ));
        }

        match (self.was_equal, self.winning_film_id) {
            (true, Some(_)) => Err(AppError::Validation(
                "equal comparison must not name a winner".to_string(),
            )),
            (false, None) => Err(AppError::Validation(
                "decided comparison must name a winner".to_string(),
            )),
            (false, Some(winner)) if winner != self.film_a_id && winner != self.film_b_id => {
                Err(AppError::Validation(
                    "winning film must be one of the compared pair".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Returns true if this entry involves the given film
    pub fn involves(&self, film_id: Uuid) -> bool {
        self.film_a_id == film_id || self.film_b_id == film_id
    }

    /// The opponent of `film_id` in this entry, if the film took part
    pub fn opponent_of(&self, film_id: Uuid) -> Option<Uuid> {
        if self.film_a_id == film_id {
            Some(self.film_b_id)
        } else if self.film_b_id == film_id {
            Some(self.film_a_id)
        } else {
            None
        }
    }

    /// Actual match scores for (film A, film B): 1 win, 0 loss, 0.5 draw
    pub fn actual_scores(&self) -> (f64, f64) {
        if self.was_equal {
            (0.5, 0.5)
        } else if self.winning_film_id == Some(self.film_a_id) {
            (1.0, 0.0)
        } else {
            (0.0, 1.0)
        }
    }
}
