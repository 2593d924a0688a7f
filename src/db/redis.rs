use std::fmt::Display;

use redis::{AsyncCommands, Client};
use uuid::Uuid;

use crate::db::PreferenceStore;
use crate::error::AppResult;
use crate::models::ComparisonMode;

/// Creates a Redis client for preference storage
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PreferenceKey {
    ComparisonMode(Uuid),
}

impl Display for PreferenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceKey::ComparisonMode(user_id) => write!(f, "cmpmode:{}", user_id),
        }
    }
}

/// Redis-backed store for the per-user comparison-mode preference
///
/// The preference survives across sessions but is not core rating state; a
/// lost value only means the client falls back to its default mode.
#[derive(Clone)]
pub struct RedisPreferenceStore {
    redis_client: Client,
}

impl RedisPreferenceStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl PreferenceStore for RedisPreferenceStore {
    async fn comparison_mode(&self, user_id: Uuid) -> AppResult<Option<ComparisonMode>> {
        let key = PreferenceKey::ComparisonMode(user_id).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let stored: Option<String> = conn.get(&key).await.map_err(|e| {
            tracing::warn!(error = %e, "Redis get failed");
            e
        })?;

        Ok(stored.as_deref().and_then(ComparisonMode::parse))
    }

    async fn set_comparison_mode(&self, user_id: Uuid, mode: ComparisonMode) -> AppResult<()> {
        let key = PreferenceKey::ComparisonMode(user_id).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let _: () = conn.set(&key, mode.as_str()).await.map_err(|e| {
            tracing::warn!(error = %e, "Redis set failed");
            e
        })?;

        tracing::debug!(user_id = %user_id, mode = mode.as_str(), "Stored comparison mode");

        Ok(())
    }
}
