use std::collections::HashSet;

use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::db::{HistoryLog, RatingDefaults, RatingStore};
use crate::error::{AppError, AppResult};
use crate::models::{ComparisonEntry, ComparisonPair, UserFilmRating};
use crate::services::calculator;

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const RATING_COLUMNS: &str =
    "id, user_id, film_id, elo_rating, number_of_comparisons, initial_rating, k_constant, last_updated";

const HISTORY_COLUMNS: &str =
    "comparison_id, user_id, film_a_id, film_b_id, winning_film_id, was_equal, compared_at";

/// Durable store backed by PostgreSQL
///
/// `apply_comparison` runs a single transaction spanning the history insert
/// and both rating updates; each update is guarded by a compare-and-swap on
/// `number_of_comparisons` so a concurrent update to the same record rolls
/// the whole comparison back as a retryable conflict.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    defaults: RatingDefaults,
}

impl PostgresStore {
    pub fn new(pool: PgPool, defaults: RatingDefaults) -> Self {
        Self { pool, defaults }
    }

    async fn get_or_create_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        film_id: Uuid,
    ) -> AppResult<UserFilmRating> {
        let query = format!(
            "SELECT {RATING_COLUMNS} FROM user_film_ratings WHERE user_id = $1 AND film_id = $2"
        );
        let existing = sqlx::query_as::<_, UserFilmRating>(&query)
            .bind(user_id)
            .bind(film_id)
            .fetch_optional(&mut **tx)
            .await?;

        if let Some(rating) = existing {
            return Ok(rating);
        }

        let rating = UserFilmRating::new(
            user_id,
            film_id,
            self.defaults.initial_elo_rating,
            self.defaults.k_constant,
        );
        insert_rating(&mut **tx, &rating).await?;
        Ok(rating)
    }

    async fn update_rating_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        updated: &UserFilmRating,
        expected_comparisons: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE user_film_ratings
             SET elo_rating = $1, number_of_comparisons = $2, k_constant = $3, last_updated = $4
             WHERE id = $5 AND number_of_comparisons = $6",
        )
        .bind(updated.elo_rating)
        .bind(updated.number_of_comparisons)
        .bind(updated.k_constant)
        .bind(updated.last_updated)
        .bind(updated.id)
        .bind(expected_comparisons)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "rating for film {} was updated concurrently",
                updated.film_id
            )));
        }
        Ok(())
    }
}

async fn insert_rating<'e, E>(executor: E, rating: &UserFilmRating) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO user_film_ratings
         (id, user_id, film_id, elo_rating, number_of_comparisons, initial_rating, k_constant, last_updated)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(rating.id)
    .bind(rating.user_id)
    .bind(rating.film_id)
    .bind(rating.elo_rating)
    .bind(rating.number_of_comparisons)
    .bind(rating.initial_rating)
    .bind(rating.k_constant)
    .bind(rating.last_updated)
    .execute(executor)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
            "rating already exists for user {} and film {}",
            rating.user_id, rating.film_id
        )),
        _ => AppError::Database(e),
    })?;
    Ok(())
}

async fn insert_history<'e, E>(executor: E, entry: &ComparisonEntry) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO comparison_histories
         (comparison_id, user_id, film_a_id, film_b_id, winning_film_id, was_equal, compared_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.comparison_id)
    .bind(entry.user_id)
    .bind(entry.film_a_id)
    .bind(entry.film_b_id)
    .bind(entry.winning_film_id)
    .bind(entry.was_equal)
    .bind(entry.compared_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl RatingStore for PostgresStore {
    async fn get_rating(
        &self,
        user_id: Uuid,
        film_id: Uuid,
    ) -> AppResult<Option<UserFilmRating>> {
        let query = format!(
            "SELECT {RATING_COLUMNS} FROM user_film_ratings WHERE user_id = $1 AND film_id = $2"
        );
        let rating = sqlx::query_as::<_, UserFilmRating>(&query)
            .bind(user_id)
            .bind(film_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rating)
    }

    async fn get_or_create_rating(
        &self,
        user_id: Uuid,
        film_id: Uuid,
    ) -> AppResult<UserFilmRating> {
        let mut tx = self.pool.begin().await?;
        let rating = self.get_or_create_in_tx(&mut tx, user_id, film_id).await?;
        tx.commit().await?;
        Ok(rating)
    }

    async fn create_rating(&self, rating: UserFilmRating) -> AppResult<UserFilmRating> {
        insert_rating(&self.pool, &rating).await?;
        Ok(rating)
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserFilmRating>> {
        let query = format!(
            "SELECT {RATING_COLUMNS} FROM user_film_ratings WHERE user_id = $1 ORDER BY elo_rating DESC"
        );
        let ratings = sqlx::query_as::<_, UserFilmRating>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ratings)
    }

    async fn apply_comparison(&self, entry: &ComparisonEntry) -> AppResult<ComparisonPair> {
        entry.validate()?;

        let mut tx = self.pool.begin().await?;

        let film_a = self
            .get_or_create_in_tx(&mut tx, entry.user_id, entry.film_a_id)
            .await?;
        let film_b = self
            .get_or_create_in_tx(&mut tx, entry.user_id, entry.film_b_id)
            .await?;

        let pair = calculator::resolve_pair(&film_a, &film_b, entry);

        insert_history(&mut *tx, entry).await?;
        self.update_rating_in_tx(&mut tx, &pair.film_a, film_a.number_of_comparisons)
            .await?;
        self.update_rating_in_tx(&mut tx, &pair.film_b, film_b.number_of_comparisons)
            .await?;

        tx.commit().await?;
        Ok(pair)
    }
}

#[async_trait::async_trait]
impl HistoryLog for PostgresStore {
    async fn append(&self, entry: ComparisonEntry) -> AppResult<ComparisonEntry> {
        entry.validate()?;
        insert_history(&self.pool, &entry).await?;
        Ok(entry)
    }

    async fn films_compared_against(
        &self,
        user_id: Uuid,
        target_film_id: Uuid,
    ) -> AppResult<HashSet<Uuid>> {
        let rows = sqlx::query(
            "SELECT film_a_id, film_b_id
             FROM comparison_histories
             WHERE user_id = $1 AND (film_a_id = $2 OR film_b_id = $2)",
        )
        .bind(user_id)
        .bind(target_film_id)
        .fetch_all(&self.pool)
        .await?;

        let mut opponents = HashSet::new();
        for row in rows {
            let film_a: Uuid = row.try_get("film_a_id")?;
            let film_b: Uuid = row.try_get("film_b_id")?;
            opponents.insert(if film_a == target_film_id { film_b } else { film_a });
        }
        Ok(opponents)
    }

    async fn has_been_compared(
        &self,
        user_id: Uuid,
        film_a_id: Uuid,
        film_b_id: Uuid,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count
             FROM comparison_histories
             WHERE user_id = $1
             AND (
                 (film_a_id = $2 AND film_b_id = $3)
                 OR
                 (film_a_id = $3 AND film_b_id = $2)
             )",
        )
        .bind(user_id)
        .bind(film_a_id)
        .bind(film_b_id)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    async fn history_for_user(&self, user_id: Uuid) -> AppResult<Vec<ComparisonEntry>> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM comparison_histories WHERE user_id = $1 ORDER BY compared_at DESC"
        );
        let entries = sqlx::query_as::<_, ComparisonEntry>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}
