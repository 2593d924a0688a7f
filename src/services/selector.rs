use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::db::{HistoryLog, RatingStore};
use crate::error::AppResult;
use crate::models::Film;
use crate::services::providers::FilmCatalog;

/// Selection policy knobs
#[derive(Debug, Clone, Copy)]
pub struct SelectorPolicy {
    /// Exclude films already compared against the target in earlier sessions.
    /// Cross-session non-repetition is policy, not a guarantee.
    pub exclude_previous_opponents: bool,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self {
            exclude_previous_opponents: true,
        }
    }
}

/// Chooses challenger films to offer against a target film
///
/// Candidates come from the films the user has reviewed, minus the target,
/// minus the caller's exclusion set, minus (by default) films the target has
/// already faced. Least-compared films come first so all of a user's ratings
/// converge evenly; ties break on film id for determinism.
#[derive(Clone)]
pub struct OpponentSelector {
    catalog: Arc<dyn FilmCatalog>,
    history: Arc<dyn HistoryLog>,
    rating_store: Arc<dyn RatingStore>,
    policy: SelectorPolicy,
}

impl OpponentSelector {
    pub fn new(
        catalog: Arc<dyn FilmCatalog>,
        history: Arc<dyn HistoryLog>,
        rating_store: Arc<dyn RatingStore>,
        policy: SelectorPolicy,
    ) -> Self {
        Self {
            catalog,
            history,
            rating_store,
            policy,
        }
    }

    /// Returns at most `limit` challengers for (user, target)
    ///
    /// An empty result is the normal "no more films available" terminal
    /// state, not an error. Load-more is a repeated call with the previously
    /// returned ids folded into `exclude`.
    pub async fn select_challengers(
        &self,
        user_id: Uuid,
        target_film_id: Uuid,
        exclude: &HashSet<Uuid>,
        limit: usize,
    ) -> AppResult<Vec<Film>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let reviewed = self.catalog.films_reviewed_by_user(user_id).await?;

        let previously_faced = if self.policy.exclude_previous_opponents {
            self.history
                .films_compared_against(user_id, target_film_id)
                .await?
        } else {
            HashSet::new()
        };

        let comparison_counts: HashMap<Uuid, i32> = self
            .rating_store
            .ratings_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| (r.film_id, r.number_of_comparisons))
            .collect();

        let mut candidates: Vec<Film> = reviewed
            .into_iter()
            .filter(|film| film.id != target_film_id)
            .filter(|film| !exclude.contains(&film.id))
            .filter(|film| !previously_faced.contains(&film.id))
            .collect();

        // Unrated films count as zero comparisons and sort first.
        candidates.sort_by_key(|film| {
            (
                comparison_counts.get(&film.id).copied().unwrap_or(0),
                film.id,
            )
        });
        candidates.truncate(limit);

        tracing::debug!(
            user_id = %user_id,
            target_film = %target_film_id,
            excluded = exclude.len(),
            selected = candidates.len(),
            "Selected challengers"
        );

        Ok(candidates)
    }
}
