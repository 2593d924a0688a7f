use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Film;
use crate::services::providers::{FilmCatalog, UserStore};

/// Catalog collaborator backed by the application's films and reviews tables
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FilmCatalog for PostgresCatalog {
    async fn films_reviewed_by_user(&self, user_id: Uuid) -> AppResult<Vec<Film>> {
        let films = sqlx::query_as::<_, Film>(
            "SELECT f.id, f.title, f.release_year, f.poster_path
             FROM films f
             JOIN reviews r ON r.film_id = f.id
             WHERE r.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(films)
    }

    async fn film_exists(&self, film_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM films WHERE id = $1")
            .bind(film_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresCatalog {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }
}
