use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod comparison;
mod rating;

pub use comparison::ComparisonEntry;
pub use rating::{initial_elo_for_star_rating, ComparisonPair, UserFilmRating};

/// A film as known to the catalog collaborator
///
/// Metadata beyond the id is carried only for presentation; the rating engine
/// keys everything on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: Uuid,
    pub title: String,
    pub release_year: Option<i32>,
    pub poster_path: Option<String>,
}

/// Outcome of a single challenger comparison, relative to the target film
///
/// Serialized on the wire as "better"/"worse"/"same".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Better,
    Worse,
    Same,
}

impl Outcome {
    /// Translates the outcome into a concrete contest result
    ///
    /// This is the only place outcome variants are interpreted; everything
    /// downstream works with a winner id or equality.
    pub fn into_contest_result(
        self,
        target_film_id: Uuid,
        challenger_film_id: Uuid,
    ) -> ContestResult {
        match self {
            Outcome::Better => ContestResult::Winner(target_film_id),
            Outcome::Worse => ContestResult::Winner(challenger_film_id),
            Outcome::Same => ContestResult::Equal,
        }
    }
}

/// Resolved result of a comparison between two films
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestResult {
    /// One of the two films won; carries the winning film id
    Winner(Uuid),
    /// The films were judged about the same
    Equal,
}

/// Session processing mode, persisted as a per-user preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    Sequential,
    Bulk,
}

impl ComparisonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonMode::Sequential => "sequential",
            ComparisonMode::Bulk => "bulk",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sequential" => Some(ComparisonMode::Sequential),
            "bulk" => Some(ComparisonMode::Bulk),
            _ => None,
        }
    }
}
