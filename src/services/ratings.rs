use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::db::{HistoryLog, RatingStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ComparisonEntry, ComparisonPair, ContestResult, Outcome, UserFilmRating,
};
use crate::services::providers::{FilmCatalog, UserStore};

/// Bound on transparent retries of a conflicted rating update
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Ceiling on items accepted in one batch submission
pub const MAX_BATCH_COMPARISONS: usize = 50;

/// Outcome of one item inside a batch submission
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchItemStatus {
    /// The comparison was resolved and both ratings updated
    Applied { pair: ComparisonPair },
    /// The comparison was not applied and needs no retry
    Skipped { reason: String },
    /// The comparison failed; the caller may retry just this item
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub challenger_film_id: Uuid,
    #[serde(flatten)]
    pub status: BatchItemStatus,
}

impl BatchItemResult {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, BatchItemStatus::Applied { .. })
    }
}

/// Service for rating retrieval, creation, and comparison application
///
/// Every resolved comparison flows through here: validation first, then a
/// single atomic store application covering the history entry and both
/// rating updates. Store conflicts are retried transparently up to a small
/// bound before surfacing.
#[derive(Clone)]
pub struct RatingService {
    rating_store: Arc<dyn RatingStore>,
    history: Arc<dyn HistoryLog>,
    catalog: Arc<dyn FilmCatalog>,
    users: Arc<dyn UserStore>,
    k_constant: f64,
}

impl RatingService {
    pub fn new(
        rating_store: Arc<dyn RatingStore>,
        history: Arc<dyn HistoryLog>,
        catalog: Arc<dyn FilmCatalog>,
        users: Arc<dyn UserStore>,
        k_constant: f64,
    ) -> Self {
        Self {
            rating_store,
            history,
            catalog,
            users,
            k_constant,
        }
    }

    /// Fetches a rating; absence means "not yet rated", not failure
    pub async fn get_rating(
        &self,
        user_id: Uuid,
        film_id: Uuid,
    ) -> AppResult<Option<UserFilmRating>> {
        self.rating_store.get_rating(user_id, film_id).await
    }

    /// All of a user's ratings, ranked by descending Elo
    pub async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserFilmRating>> {
        self.rating_store.ratings_for_user(user_id).await
    }

    /// Creates a rating seeded from the user's 0-5 star review rating
    pub async fn create_rating(
        &self,
        user_id: Uuid,
        film_id: Uuid,
        star_rating: f64,
    ) -> AppResult<UserFilmRating> {
        self.ensure_user_exists(user_id).await?;
        self.ensure_film_exists(film_id).await?;

        let rating =
            UserFilmRating::from_star_rating(user_id, film_id, star_rating, self.k_constant)?;
        let created = self.rating_store.create_rating(rating).await?;

        tracing::info!(
            user_id = %user_id,
            film_id = %film_id,
            initial_elo = created.initial_rating,
            "Created star-seeded rating"
        );

        Ok(created)
    }

    /// Resolves one comparison between two films
    ///
    /// Produces exactly one history entry and two rating updates (creating
    /// either record first if the film was never rated), or nothing at all.
    pub async fn compare_one(
        &self,
        user_id: Uuid,
        film_a_id: Uuid,
        film_b_id: Uuid,
        result: ContestResult,
    ) -> AppResult<ComparisonPair> {
        let entry = ComparisonEntry::new(user_id, film_a_id, film_b_id, result)?;

        self.ensure_user_exists(user_id).await?;
        self.ensure_film_exists(film_a_id).await?;
        self.ensure_film_exists(film_b_id).await?;

        let pair = self.apply_with_retry(&entry).await?;

        tracing::info!(
            user_id = %user_id,
            film_a = %film_a_id,
            film_b = %film_b_id,
            rating_a = pair.film_a.elo_rating,
            rating_b = pair.film_b.elo_rating,
            "Comparison resolved"
        );

        Ok(pair)
    }

    /// Applies a batch of challenger outcomes against one target film
    ///
    /// Items run strictly in the given order, each as a full single
    /// comparison, so earlier items feed the ratings later items read. A
    /// failed item does not abort the batch; per-item statuses let the
    /// caller retry failures without re-resolving successes. Pairs that
    /// already have a history entry are skipped rather than re-applied.
    pub async fn compare_batch(
        &self,
        user_id: Uuid,
        target_film_id: Uuid,
        items: &[(Uuid, Outcome)],
    ) -> AppResult<Vec<BatchItemResult>> {
        if items.is_empty() {
            return Err(AppError::Validation(
                "batch submission requires at least one comparison".to_string(),
            ));
        }

        self.ensure_user_exists(user_id).await?;
        self.ensure_film_exists(target_film_id).await?;

        let items = &items[..items.len().min(MAX_BATCH_COMPARISONS)];

        tracing::info!(
            user_id = %user_id,
            target_film = %target_film_id,
            item_count = items.len(),
            "Processing batch comparisons"
        );

        let mut results = Vec::with_capacity(items.len());
        for &(challenger_film_id, outcome) in items {
            let status = self
                .apply_batch_item(user_id, target_film_id, challenger_film_id, outcome)
                .await;
            results.push(BatchItemResult {
                challenger_film_id,
                status,
            });
        }

        let applied = results.iter().filter(|r| r.is_applied()).count();
        if applied < results.len() {
            tracing::warn!(
                user_id = %user_id,
                target_film = %target_film_id,
                applied,
                total = results.len(),
                "Partial batch application"
            );
        }

        Ok(results)
    }

    async fn apply_batch_item(
        &self,
        user_id: Uuid,
        target_film_id: Uuid,
        challenger_film_id: Uuid,
        outcome: Outcome,
    ) -> BatchItemStatus {
        let result = outcome.into_contest_result(target_film_id, challenger_film_id);
        let entry = match ComparisonEntry::new(user_id, target_film_id, challenger_film_id, result)
        {
            Ok(entry) => entry,
            Err(e) => {
                return BatchItemStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        match self
            .history
            .has_been_compared(user_id, target_film_id, challenger_film_id)
            .await
        {
            Ok(true) => {
                return BatchItemStatus::Skipped {
                    reason: "films have already been compared".to_string(),
                }
            }
            Ok(false) => {}
            Err(e) => {
                return BatchItemStatus::Failed {
                    error: e.to_string(),
                }
            }
        }

        match self.apply_with_retry(&entry).await {
            Ok(pair) => BatchItemStatus::Applied { pair },
            Err(e) => BatchItemStatus::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn apply_with_retry(&self, entry: &ComparisonEntry) -> AppResult<ComparisonPair> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.rating_store.apply_comparison(entry).await {
                Err(AppError::Conflict(msg)) if attempt <= MAX_CONFLICT_RETRIES => {
                    tracing::warn!(
                        comparison_id = %entry.comparison_id,
                        attempt,
                        error = %msg,
                        "Conflicting rating update, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> AppResult<()> {
        if !self.users.user_exists(user_id).await? {
            return Err(AppError::NotFound(format!("user {} not found", user_id)));
        }
        Ok(())
    }

    async fn ensure_film_exists(&self, film_id: Uuid) -> AppResult<()> {
        if !self.catalog.film_exists(film_id).await? {
            return Err(AppError::NotFound(format!("film {} not found", film_id)));
        }
        Ok(())
    }
}
