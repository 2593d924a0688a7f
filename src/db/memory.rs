use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{HistoryLog, PreferenceStore, RatingDefaults, RatingStore};
use crate::error::{AppError, AppResult};
use crate::models::{ComparisonEntry, ComparisonMode, ComparisonPair, Film, UserFilmRating};
use crate::services::calculator;
use crate::services::providers::{FilmCatalog, UserStore};

/// In-memory store backing tests and local development wiring
///
/// A single write lock around the inner maps gives `apply_comparison` the
/// same all-or-nothing behavior the postgres transaction provides.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
    defaults: RatingDefaults,
}

struct Inner {
    ratings: HashMap<(Uuid, Uuid), UserFilmRating>,
    history: Vec<ComparisonEntry>,
    modes: HashMap<Uuid, ComparisonMode>,
}

impl InMemoryStore {
    pub fn new(defaults: RatingDefaults) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                ratings: HashMap::new(),
                history: Vec::new(),
                modes: HashMap::new(),
            })),
            defaults,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(RatingDefaults::default())
    }
}

impl Inner {
    fn get_or_create(
        &mut self,
        user_id: Uuid,
        film_id: Uuid,
        defaults: RatingDefaults,
    ) -> UserFilmRating {
        self.ratings
            .entry((user_id, film_id))
            .or_insert_with(|| {
                UserFilmRating::new(
                    user_id,
                    film_id,
                    defaults.initial_elo_rating,
                    defaults.k_constant,
                )
            })
            .clone()
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryStore {
    async fn get_rating(
        &self,
        user_id: Uuid,
        film_id: Uuid,
    ) -> AppResult<Option<UserFilmRating>> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.get(&(user_id, film_id)).cloned())
    }

    async fn get_or_create_rating(
        &self,
        user_id: Uuid,
        film_id: Uuid,
    ) -> AppResult<UserFilmRating> {
        let mut inner = self.inner.write().await;
        Ok(inner.get_or_create(user_id, film_id, self.defaults))
    }

    async fn create_rating(&self, rating: UserFilmRating) -> AppResult<UserFilmRating> {
        let mut inner = self.inner.write().await;
        let key = (rating.user_id, rating.film_id);
        if inner.ratings.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "rating already exists for user {} and film {}",
                rating.user_id, rating.film_id
            )));
        }
        inner.ratings.insert(key, rating.clone());
        Ok(rating)
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserFilmRating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<UserFilmRating> = inner
            .ratings
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| {
            b.elo_rating
                .partial_cmp(&a.elo_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ratings)
    }

    async fn apply_comparison(&self, entry: &ComparisonEntry) -> AppResult<ComparisonPair> {
        entry.validate()?;

        let mut inner = self.inner.write().await;
        let film_a = inner.get_or_create(entry.user_id, entry.film_a_id, self.defaults);
        let film_b = inner.get_or_create(entry.user_id, entry.film_b_id, self.defaults);

        let pair = calculator::resolve_pair(&film_a, &film_b, entry);

        inner
            .ratings
            .insert((entry.user_id, entry.film_a_id), pair.film_a.clone());
        inner
            .ratings
            .insert((entry.user_id, entry.film_b_id), pair.film_b.clone());
        inner.history.push(entry.clone());

        Ok(pair)
    }
}

#[async_trait::async_trait]
impl HistoryLog for InMemoryStore {
    async fn append(&self, entry: ComparisonEntry) -> AppResult<ComparisonEntry> {
        entry.validate()?;
        let mut inner = self.inner.write().await;
        inner.history.push(entry.clone());
        Ok(entry)
    }

    async fn films_compared_against(
        &self,
        user_id: Uuid,
        target_film_id: Uuid,
    ) -> AppResult<HashSet<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .history
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| e.opponent_of(target_film_id))
            .collect())
    }

    async fn has_been_compared(
        &self,
        user_id: Uuid,
        film_a_id: Uuid,
        film_b_id: Uuid,
    ) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.history.iter().any(|e| {
            e.user_id == user_id && e.involves(film_a_id) && e.involves(film_b_id)
        }))
    }

    async fn history_for_user(&self, user_id: Uuid) -> AppResult<Vec<ComparisonEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<ComparisonEntry> = inner
            .history
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.compared_at.cmp(&a.compared_at));
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl PreferenceStore for InMemoryStore {
    async fn comparison_mode(&self, user_id: Uuid) -> AppResult<Option<ComparisonMode>> {
        let inner = self.inner.read().await;
        Ok(inner.modes.get(&user_id).copied())
    }

    async fn set_comparison_mode(&self, user_id: Uuid, mode: ComparisonMode) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.modes.insert(user_id, mode);
        Ok(())
    }
}

/// In-memory film catalog and user registry for tests and local wiring
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<RwLock<CatalogInner>>,
}

#[derive(Default)]
struct CatalogInner {
    films: HashMap<Uuid, Film>,
    reviewed: HashMap<Uuid, Vec<Uuid>>,
    users: HashSet<Uuid>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.users.insert(user_id);
    }

    pub async fn add_film(&self, film: Film) {
        let mut inner = self.inner.write().await;
        inner.films.insert(film.id, film);
    }

    /// Records that `user_id` has reviewed `film_id`
    pub async fn add_review(&self, user_id: Uuid, film_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.reviewed.entry(user_id).or_default().push(film_id);
    }
}

#[async_trait::async_trait]
impl FilmCatalog for InMemoryCatalog {
    async fn films_reviewed_by_user(&self, user_id: Uuid) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        let film_ids = inner.reviewed.get(&user_id).cloned().unwrap_or_default();
        Ok(film_ids
            .iter()
            .filter_map(|id| inner.films.get(id).cloned())
            .collect())
    }

    async fn film_exists(&self, film_id: Uuid) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.films.contains_key(&film_id))
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryCatalog {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.users.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContestResult;

    #[tokio::test]
    async fn test_get_or_create_seeds_defaults_once() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();
        let film = Uuid::new_v4();

        let first = store.get_or_create_rating(user, film).await.unwrap();
        assert_eq!(first.elo_rating, 1000.0);
        assert_eq!(first.number_of_comparisons, 0);

        let second = store.get_or_create_rating(user, film).await.unwrap();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_create_rating_rejects_duplicate_pair() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();
        let film = Uuid::new_v4();

        let rating = UserFilmRating::new(user, film, 1050.0, 40.0);
        store.create_rating(rating.clone()).await.unwrap();

        let err = store
            .create_rating(UserFilmRating::new(user, film, 950.0, 40.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_apply_comparison_writes_history_and_both_ratings() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();
        let film_a = Uuid::new_v4();
        let film_b = Uuid::new_v4();

        let entry =
            ComparisonEntry::new(user, film_a, film_b, ContestResult::Winner(film_a)).unwrap();
        let pair = store.apply_comparison(&entry).await.unwrap();

        assert_eq!(pair.film_a.number_of_comparisons, 1);
        assert_eq!(pair.film_b.number_of_comparisons, 1);

        let history = store.history_for_user(user).await.unwrap();
        assert_eq!(history.len(), 1);

        let stored_a = store.get_rating(user, film_a).await.unwrap().unwrap();
        assert_eq!(stored_a.elo_rating, pair.film_a.elo_rating);
    }

    #[tokio::test]
    async fn test_apply_comparison_rejects_invalid_entry_without_writes() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();
        let film = Uuid::new_v4();

        let mut entry = ComparisonEntry::new(
            user,
            film,
            Uuid::new_v4(),
            ContestResult::Winner(film),
        )
        .unwrap();
        entry.film_b_id = entry.film_a_id;

        assert!(store.apply_comparison(&entry).await.is_err());
        assert!(store.history_for_user(user).await.unwrap().is_empty());
        assert!(store.get_rating(user, film).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_has_been_compared_is_order_insensitive() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let entry = ComparisonEntry::new(user, a, b, ContestResult::Equal).unwrap();
        store.append(entry).await.unwrap();

        assert!(store.has_been_compared(user, a, b).await.unwrap());
        assert!(store.has_been_compared(user, b, a).await.unwrap());
        assert!(!store
            .has_been_compared(user, a, Uuid::new_v4())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_ratings_for_user_ranked_by_elo() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();

        for elo in [950.0, 1100.0, 1000.0] {
            store
                .create_rating(UserFilmRating::new(user, Uuid::new_v4(), elo, 40.0))
                .await
                .unwrap();
        }

        let ratings = store.ratings_for_user(user).await.unwrap();
        let elos: Vec<f64> = ratings.iter().map(|r| r.elo_rating).collect();
        assert_eq!(elos, vec![1100.0, 1000.0, 950.0]);
    }

    #[tokio::test]
    async fn test_mode_preference_round_trip() {
        let store = InMemoryStore::default();
        let user = Uuid::new_v4();

        assert_eq!(store.comparison_mode(user).await.unwrap(), None);

        store
            .set_comparison_mode(user, ComparisonMode::Bulk)
            .await
            .unwrap();
        assert_eq!(
            store.comparison_mode(user).await.unwrap(),
            Some(ComparisonMode::Bulk)
        );
    }
}
