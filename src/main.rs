use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinelog_api::api::{create_router, AppState};
use cinelog_api::config::Config;
use cinelog_api::db::{
    create_pool, create_redis_client, PostgresStore, RatingDefaults, RedisPreferenceStore,
};
use cinelog_api::services::providers::postgres::PostgresCatalog;
use cinelog_api::services::{OpponentSelector, RatingService, SelectorPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinelog_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Connected to PostgreSQL");

    let redis_client = create_redis_client(&config.redis_url)?;
    tracing::info!("Connected to Redis");

    let defaults = RatingDefaults {
        initial_elo_rating: config.initial_elo_rating,
        k_constant: config.initial_k_constant,
    };
    let store = Arc::new(PostgresStore::new(pool.clone(), defaults));
    let catalog = Arc::new(PostgresCatalog::new(pool));
    let preferences = Arc::new(RedisPreferenceStore::new(redis_client));

    let ratings = RatingService::new(
        store.clone(),
        store.clone(),
        catalog.clone(),
        catalog.clone(),
        config.initial_k_constant,
    );
    let selector = OpponentSelector::new(
        catalog,
        store.clone(),
        store,
        SelectorPolicy {
            exclude_previous_opponents: config.exclude_previous_opponents,
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(ratings, selector, preferences, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
