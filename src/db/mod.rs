use std::collections::HashSet;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ComparisonEntry, ComparisonMode, ComparisonPair, UserFilmRating};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, PostgresStore};
pub use redis::{create_redis_client, RedisPreferenceStore};

/// Seed values for rating records created lazily by a comparison
#[derive(Debug, Clone, Copy)]
pub struct RatingDefaults {
    pub initial_elo_rating: f64,
    pub k_constant: f64,
}

impl Default for RatingDefaults {
    fn default() -> Self {
        Self {
            initial_elo_rating: 1000.0,
            k_constant: 40.0,
        }
    }
}

/// Durable storage for per-(user, film) rating records
///
/// Implementations must serialize concurrent updates touching the same
/// record; `apply_comparison` either persists the history entry together with
/// both rating updates or persists nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// Fetches a rating; `None` means the user has not yet rated the film,
    /// which is a normal outcome rather than an error
    async fn get_rating(&self, user_id: Uuid, film_id: Uuid)
        -> AppResult<Option<UserFilmRating>>;

    /// Fetches the rating for (user, film), creating a default-seeded record
    /// if none exists. This is the only place lazily-created records appear.
    async fn get_or_create_rating(&self, user_id: Uuid, film_id: Uuid)
        -> AppResult<UserFilmRating>;

    /// Inserts an explicitly constructed record (e.g. seeded from a star
    /// rating). Fails with a conflict if the (user, film) pair already has one.
    async fn create_rating(&self, rating: UserFilmRating) -> AppResult<UserFilmRating>;

    /// All of a user's ratings, ordered by descending Elo
    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserFilmRating>>;

    /// Applies one resolved comparison: validates the entry, runs the
    /// two-sided rating update against the pre-update records, and persists
    /// both new ratings plus the history entry atomically. A concurrent
    /// update to either record surfaces as `AppError::Conflict`.
    async fn apply_comparison(&self, entry: &ComparisonEntry) -> AppResult<ComparisonPair>;
}

/// Append-only record of resolved comparisons
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryLog: Send + Sync {
    /// Appends a standalone entry after validating its invariants
    async fn append(&self, entry: ComparisonEntry) -> AppResult<ComparisonEntry>;

    /// Every film the user has ever had compared against the target
    async fn films_compared_against(
        &self,
        user_id: Uuid,
        target_film_id: Uuid,
    ) -> AppResult<HashSet<Uuid>>;

    /// Whether the unordered (a, b) pair already has a history entry
    async fn has_been_compared(
        &self,
        user_id: Uuid,
        film_a_id: Uuid,
        film_b_id: Uuid,
    ) -> AppResult<bool>;

    /// A user's full comparison history, newest first
    async fn history_for_user(&self, user_id: Uuid) -> AppResult<Vec<ComparisonEntry>>;
}

/// Per-user key-value storage for the session-mode preference
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn comparison_mode(&self, user_id: Uuid) -> AppResult<Option<ComparisonMode>>;

    async fn set_comparison_mode(&self, user_id: Uuid, mode: ComparisonMode) -> AppResult<()>;
}
