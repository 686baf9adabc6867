//! Repository for the `system_metadata` key/value store.

use sqlx::PgPool;

use mediasearch_models::{system_metadata_keys, AiModelId};

use crate::error::DbResult;

pub struct SystemMetadataRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SystemMetadataRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM system_metadata WHERE key = $1")
                .bind(key)
                .fetch_optional(self.pool)
                .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO system_metadata (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn default_ai_model_id(&self) -> DbResult<Option<AiModelId>> {
        let raw = self.get(system_metadata_keys::DEFAULT_AI_MODEL_ID).await?;
        Ok(raw.and_then(|v| v.parse::<i64>().ok()).map(AiModelId::new))
    }

    pub async fn set_default_ai_model_id(&self, id: AiModelId) -> DbResult<()> {
        self.set(
            system_metadata_keys::DEFAULT_AI_MODEL_ID,
            &id.as_i64().to_string(),
        )
        .await
    }
}
