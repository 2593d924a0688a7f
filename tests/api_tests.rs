use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

use cinelog_api::api::{create_router, AppState};
use cinelog_api::config::Config;
use cinelog_api::db::memory::InMemoryCatalog;
use cinelog_api::db::InMemoryStore;
use cinelog_api::models::Film;
use cinelog_api::services::{OpponentSelector, RatingService, SelectorPolicy};

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: String::new(),
        host: "127.0.0.1".to_string(),
        port: 0,
        initial_elo_rating: 1000.0,
        initial_k_constant: 40.0,
        challenger_page_size: 10,
        max_challengers_per_target: 50,
        exclude_previous_opponents: true,
    }
}

/// In-memory wiring for one user with `film_count` reviewed films
async fn create_test_server(film_count: usize) -> (TestServer, Uuid, Vec<Uuid>) {
    let user = Uuid::new_v4();
    let store = Arc::new(InMemoryStore::default());
    let catalog = Arc::new(InMemoryCatalog::new());

    catalog.add_user(user).await;
    let mut films: Vec<Uuid> = (0..film_count).map(|_| Uuid::new_v4()).collect();
    films.sort();
    for (i, id) in films.iter().enumerate() {
        catalog
            .add_film(Film {
                id: *id,
                title: format!("Film {}", i),
                release_year: Some(1990 + i as i32),
                poster_path: None,
            })
            .await;
        catalog.add_review(user, *id).await;
    }

    let ratings = RatingService::new(
        store.clone(),
        store.clone(),
        catalog.clone(),
        catalog.clone(),
        40.0,
    );
    let selector = OpponentSelector::new(
        catalog,
        store.clone(),
        store.clone(),
        SelectorPolicy::default(),
    );

    let state = AppState::new(ratings, selector, store, test_config());
    let server = TestServer::new(create_router(state)).unwrap();
    (server, user, films)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _, _) = create_test_server(0).await;
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_star_seeded_rating() {
    let (server, user, films) = create_test_server(1).await;

    let response = server
        .post("/api/v1/ratings")
        .json(&json!({
            "userId": user,
            "filmId": films[0],
            "starRating": 3.5
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["eloRating"], 1050.0);
    assert_eq!(created["numberOfComparisons"], 0);

    // The (user, film) pair already has a rating now.
    let response = server
        .post("/api/v1/ratings")
        .json(&json!({
            "userId": user,
            "filmId": films[0],
            "starRating": 2.0
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_rating_rejects_out_of_range_stars() {
    let (server, user, films) = create_test_server(1).await;

    let response = server
        .post("/api/v1/ratings")
        .json(&json!({
            "userId": user,
            "filmId": films[0],
            "starRating": 6.0
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_rating_is_not_found_until_first_comparison() {
    let (server, user, films) = create_test_server(2).await;

    let response = server
        .get(&format!("/api/v1/ratings/{}/{}", user, films[0]))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/v1/comparisons/compare")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "challengerFilmId": films[1],
            "outcome": "better"
        }))
        .await
        .assert_status_ok();

    let response = server
        .get(&format!("/api/v1/ratings/{}/{}", user, films[0]))
        .await;
    response.assert_status_ok();
    let rating: serde_json::Value = response.json();
    assert_eq!(rating["eloRating"], 1020.0);
    assert_eq!(rating["numberOfComparisons"], 1);
}

#[tokio::test]
async fn test_compare_updates_both_sides() {
    let (server, user, films) = create_test_server(2).await;

    let response = server
        .post("/api/v1/comparisons/compare")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "challengerFilmId": films[1],
            "outcome": "worse"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["targetRating"]["eloRating"], 980.0);
    assert_eq!(body["challengerRating"]["eloRating"], 1020.0);
}

#[tokio::test]
async fn test_compare_unknown_film_is_not_found() {
    let (server, user, films) = create_test_server(1).await;

    let response = server
        .post("/api/v1/comparisons/compare")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "challengerFilmId": Uuid::new_v4(),
            "outcome": "same"
        }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_compare_film_against_itself_is_rejected() {
    let (server, user, films) = create_test_server(1).await;

    let response = server
        .post("/api/v1/comparisons/compare")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "challengerFilmId": films[0],
            "outcome": "better"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_batch_reports_per_item_statuses() {
    let (server, user, films) = create_test_server(3).await;

    // Item two repeats the target film and fails; the other two apply.
    let response = server
        .post("/api/v1/comparisons/compare-batch")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "comparisons": [
                { "challengerFilmId": films[1], "outcome": "better" },
                { "challengerFilmId": films[0], "outcome": "worse" },
                { "challengerFilmId": films[2], "outcome": "same" }
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], "applied");
    assert_eq!(results[1]["status"], "failed");
    assert_eq!(results[2]["status"], "applied");
}

#[tokio::test]
async fn test_compare_batch_skips_already_compared_pairs() {
    let (server, user, films) = create_test_server(2).await;

    server
        .post("/api/v1/comparisons/compare")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "challengerFilmId": films[1],
            "outcome": "better"
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/v1/comparisons/compare-batch")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "comparisons": [
                { "challengerFilmId": films[1], "outcome": "worse" }
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["results"][0]["status"], "skipped");

    // The rating is untouched by the skipped item.
    let rating: serde_json::Value = server
        .get(&format!("/api/v1/ratings/{}/{}", user, films[0]))
        .await
        .json();
    assert_eq!(rating["numberOfComparisons"], 1);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let (server, user, films) = create_test_server(1).await;

    let response = server
        .post("/api/v1/comparisons/compare-batch")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "comparisons": []
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_ratings_ranked_best_first() {
    let (server, user, films) = create_test_server(3).await;

    // films[0] beats films[1] and films[2]; its rating ends highest.
    for (challenger, outcome) in [(films[1], "better"), (films[2], "better")] {
        server
            .post("/api/v1/comparisons/compare")
            .json(&json!({
                "userId": user,
                "targetFilmId": films[0],
                "challengerFilmId": challenger,
                "outcome": outcome
            }))
            .await
            .assert_status_ok();
    }

    let response = server.get(&format!("/api/v1/ratings/{}", user)).await;
    response.assert_status_ok();
    let ratings: Vec<serde_json::Value> = response.json();
    assert_eq!(ratings.len(), 3);
    assert_eq!(ratings[0]["filmId"], json!(films[0]));

    let elos: Vec<f64> = ratings.iter().map(|r| r["eloRating"].as_f64().unwrap()).collect();
    assert!(elos.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_challengers_exclude_target_and_listed_films() {
    let (server, user, films) = create_test_server(4).await;

    let response = server
        .get(&format!("/api/v1/films/{}/challengers", films[0]))
        .add_query_param("userId", user)
        .add_query_param("exclude", films[1].to_string())
        .await;

    response.assert_status_ok();
    let challengers: Vec<serde_json::Value> = response.json();
    let ids: Vec<String> = challengers
        .iter()
        .map(|f| f["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&films[0].to_string()));
    assert!(!ids.contains(&films[1].to_string()));
}

#[tokio::test]
async fn test_challengers_honor_limit() {
    let (server, user, films) = create_test_server(5).await;

    let response = server
        .get(&format!("/api/v1/films/{}/challengers", films[0]))
        .add_query_param("userId", user)
        .add_query_param("limit", 2)
        .await;

    response.assert_status_ok();
    let challengers: Vec<serde_json::Value> = response.json();
    assert_eq!(challengers.len(), 2);
}

#[tokio::test]
async fn test_challengers_omit_previously_faced_films() {
    let (server, user, films) = create_test_server(3).await;

    server
        .post("/api/v1/comparisons/compare")
        .json(&json!({
            "userId": user,
            "targetFilmId": films[0],
            "challengerFilmId": films[1],
            "outcome": "same"
        }))
        .await
        .assert_status_ok();

    let response = server
        .get(&format!("/api/v1/films/{}/challengers", films[0]))
        .add_query_param("userId", user)
        .await;

    response.assert_status_ok();
    let challengers: Vec<serde_json::Value> = response.json();
    assert_eq!(challengers.len(), 1);
    assert_eq!(challengers[0]["id"], json!(films[2]));
}

#[tokio::test]
async fn test_comparison_mode_defaults_to_sequential_and_round_trips() {
    let (server, user, _) = create_test_server(0).await;

    let response = server
        .get(&format!("/api/v1/users/{}/preferences/comparison-mode", user))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["mode"], "sequential");

    server
        .put(&format!("/api/v1/users/{}/preferences/comparison-mode", user))
        .json(&json!({ "mode": "bulk" }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server
        .get(&format!("/api/v1/users/{}/preferences/comparison-mode", user))
        .await
        .json();
    assert_eq!(body["mode"], "bulk");
}

#[tokio::test]
async fn test_request_id_is_echoed_on_responses() {
    let (server, _, _) = create_test_server(0).await;

    let id = Uuid::new_v4();
    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_str(&id.to_string()).unwrap(),
        )
        .await;

    response.assert_status_ok();
    let echoed = response.headers().get("x-request-id").unwrap();
    assert_eq!(echoed.to_str().unwrap(), id.to_string());
}
