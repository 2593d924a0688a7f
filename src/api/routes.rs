use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            TraceLayer::new_for_http().make_span_with(make_span_with_request_id),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Ratings
        .route("/ratings", post(handlers::create_rating))
        .route("/ratings/:user_id", get(handlers::list_ratings))
        .route("/ratings/:user_id/:film_id", get(handlers::get_rating))
        // Comparisons
        .route("/comparisons/compare", post(handlers::compare))
        .route("/comparisons/compare-batch", post(handlers::compare_batch))
        // Challenger selection
        .route("/films/:film_id/challengers", get(handlers::get_challengers))
        // Preferences
        .route(
            "/users/:user_id/preferences/comparison-mode",
            get(handlers::get_comparison_mode),
        )
        .route(
            "/users/:user_id/preferences/comparison-mode",
            put(handlers::set_comparison_mode),
        )
}
