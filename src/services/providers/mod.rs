//! External collaborator abstractions
//!
//! The rating engine does not own film metadata or user accounts; it consumes
//! them through these traits. Review ingestion and catalog search live in the
//! surrounding application.

use uuid::Uuid;

use crate::{error::AppResult, models::Film};

pub mod postgres;

/// Source of film metadata and per-user review sets
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmCatalog: Send + Sync {
    /// Every film the user has reviewed; the opponent selector draws its
    /// candidates from this set
    async fn films_reviewed_by_user(&self, user_id: Uuid) -> AppResult<Vec<Film>>;

    /// Whether the film is known to the catalog
    async fn film_exists(&self, film_id: Uuid) -> AppResult<bool>;
}

/// Source of user account existence checks
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool>;
}
