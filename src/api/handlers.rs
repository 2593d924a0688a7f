use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ComparisonMode, Film, Outcome, UserFilmRating};
use crate::services::BatchItemResult;

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub user_id: Uuid,
    pub film_id: Uuid,
    pub star_rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub user_id: Uuid,
    pub target_film_id: Uuid,
    pub challenger_film_id: Uuid,
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub target_rating: UserFilmRating,
    pub challenger_rating: UserFilmRating,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchComparisonItem {
    pub challenger_film_id: Uuid,
    pub outcome: Outcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareBatchRequest {
    pub user_id: Uuid,
    pub target_film_id: Uuid,
    pub comparisons: Vec<BatchComparisonItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareBatchResponse {
    pub results: Vec<BatchItemResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengersQuery {
    pub user_id: Uuid,
    /// Comma-separated film ids already offered in this session
    pub exclude: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComparisonModeResponse {
    pub mode: ComparisonMode,
}

#[derive(Debug, Deserialize)]
pub struct SetComparisonModeRequest {
    pub mode: ComparisonMode,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Fetch one user's rating for one film
pub async fn get_rating(
    State(state): State<AppState>,
    Path((user_id, film_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<UserFilmRating>> {
    let rating = state
        .ratings
        .get_rating(user_id, film_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("no rating for user {} and film {}", user_id, film_id))
        })?;
    Ok(Json(rating))
}

/// All of a user's ratings, ranked best first
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<UserFilmRating>>> {
    let ratings = state.ratings.ratings_for_user(user_id).await?;
    Ok(Json(ratings))
}

/// Create a rating seeded from a 0-5 star review rating
pub async fn create_rating(
    State(state): State<AppState>,
    Json(request): Json<CreateRatingRequest>,
) -> AppResult<(StatusCode, Json<UserFilmRating>)> {
    let rating = state
        .ratings
        .create_rating(request.user_id, request.film_id, request.star_rating)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// Resolve a single target-vs-challenger comparison
pub async fn compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> AppResult<Json<CompareResponse>> {
    let result = request
        .outcome
        .into_contest_result(request.target_film_id, request.challenger_film_id);
    let pair = state
        .ratings
        .compare_one(
            request.user_id,
            request.target_film_id,
            request.challenger_film_id,
            result,
        )
        .await?;

    Ok(Json(CompareResponse {
        target_rating: pair.film_a,
        challenger_rating: pair.film_b,
    }))
}

/// Apply a batch of challenger outcomes in submission order
pub async fn compare_batch(
    State(state): State<AppState>,
    Json(request): Json<CompareBatchRequest>,
) -> AppResult<Json<CompareBatchResponse>> {
    let items: Vec<(Uuid, Outcome)> = request
        .comparisons
        .iter()
        .map(|c| (c.challenger_film_id, c.outcome))
        .collect();

    let results = state
        .ratings
        .compare_batch(request.user_id, request.target_film_id, &items)
        .await?;

    Ok(Json(CompareBatchResponse { results }))
}

/// Select challenger films to compare against a target
pub async fn get_challengers(
    State(state): State<AppState>,
    Path(film_id): Path<Uuid>,
    Query(params): Query<ChallengersQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let exclude = parse_exclusions(params.exclude.as_deref())?;
    let limit = params
        .limit
        .unwrap_or(state.config.challenger_page_size)
        .min(state.config.max_challengers_per_target);

    let challengers = state
        .selector
        .select_challengers(params.user_id, film_id, &exclude, limit)
        .await?;
    Ok(Json(challengers))
}

/// Fetch the user's session-mode preference, defaulting to sequential
pub async fn get_comparison_mode(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ComparisonModeResponse>> {
    let mode = state
        .preferences
        .comparison_mode(user_id)
        .await?
        .unwrap_or(ComparisonMode::Sequential);
    Ok(Json(ComparisonModeResponse { mode }))
}

/// Persist the user's session-mode preference
pub async fn set_comparison_mode(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SetComparisonModeRequest>,
) -> AppResult<Json<ComparisonModeResponse>> {
    state
        .preferences
        .set_comparison_mode(user_id, request.mode)
        .await?;
    Ok(Json(ComparisonModeResponse { mode: request.mode }))
}

fn parse_exclusions(raw: Option<&str>) -> AppResult<HashSet<Uuid>> {
    let mut exclude = HashSet::new();
    if let Some(raw) = raw {
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let id = Uuid::parse_str(part.trim()).map_err(|_| {
                AppError::Validation(format!("invalid film id in exclude list: {}", part))
            })?;
            exclude.insert(id);
        }
    }
    Ok(exclude)
}
