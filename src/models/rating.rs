use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One user's Elo rating for one film
///
/// Exactly one record exists per (user, film) pair. `initial_rating` is fixed
/// at creation; `elo_rating` moves with every resolved comparison but never
/// drops below the floor of 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserFilmRating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub film_id: Uuid,
    pub elo_rating: f64,
    pub number_of_comparisons: i32,
    pub initial_rating: f64,
    pub k_constant: f64,
    pub last_updated: DateTime<Utc>,
}

impl UserFilmRating {
    /// Creates a fresh record seeded with the given initial rating and K value
    pub fn new(user_id: Uuid, film_id: Uuid, initial_rating: f64, k_constant: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            film_id,
            elo_rating: initial_rating,
            number_of_comparisons: 0,
            initial_rating,
            k_constant,
            last_updated: Utc::now(),
        }
    }

    /// Creates a record seeded from a user's 0-5 star review rating
    pub fn from_star_rating(
        user_id: Uuid,
        film_id: Uuid,
        star_rating: f64,
        k_constant: f64,
    ) -> AppResult<Self> {
        let initial = initial_elo_for_star_rating(star_rating)?;
        Ok(Self::new(user_id, film_id, initial, k_constant))
    }
}

/// Both sides of a resolved comparison, after the two-sided rating update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPair {
    pub film_a: UserFilmRating,
    pub film_b: UserFilmRating,
}

/// Maps a 0-5 star review rating onto a starting Elo value
pub fn initial_elo_for_star_rating(star_rating: f64) -> AppResult<f64> {
    let elo = match star_rating {
        r if (0.0..2.0).contains(&r) => 950.0,
        r if (2.0..3.0).contains(&r) => 1000.0,
        r if (3.0..4.0).contains(&r) => 1050.0,
        r if (4.0..=5.0).contains(&r) => 1100.0,
        _ => {
            return Err(AppError::Validation(
                "star rating must be between 0 and 5".to_string(),
            ))
        }
    };
    Ok(elo)
}
