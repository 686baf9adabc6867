//! Repository for the `ai_models` registry.

use sqlx::PgPool;

use mediasearch_models::{AiModel, AiModelId};

use crate::error::{DbError, DbResult};

#[derive(sqlx::FromRow)]
struct AiModelRow {
    id: i64,
    name: String,
    version: String,
}

impl From<AiModelRow> for AiModel {
    fn from(row: AiModelRow) -> Self {
        AiModel {
            id: AiModelId::new(row.id),
            name: row.name,
            version: row.version,
        }
    }
}

pub struct AiModelRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AiModelRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a model if it's new, or return the existing one.
    pub async fn find_or_create(&self, name: &str, version: &str) -> DbResult<AiModel> {
        if let Some(existing) = self.find_by_name_version(name, version).await? {
            return Ok(existing);
        }

        let row = sqlx::query_as::<_, AiModelRow>(
            "INSERT INTO ai_models (name, version) VALUES ($1, $2) \
             ON CONFLICT (name, version) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, name, version",
        )
        .bind(name)
        .bind(version)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn find_by_name_version(
        &self,
        name: &str,
        version: &str,
    ) -> DbResult<Option<AiModel>> {
        let row = sqlx::query_as::<_, AiModelRow>(
            "SELECT id, name, version FROM ai_models WHERE name = $1 AND version = $2",
        )
        .bind(name)
        .bind(version)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find(&self, id: AiModelId) -> DbResult<AiModel> {
        let row = sqlx::query_as::<_, AiModelRow>(
            "SELECT id, name, version FROM ai_models WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;
        row.map(Into::into)
            .ok_or_else(|| DbError::LibraryNotFound(format!("ai_model id {}", id.as_i64())))
    }

    pub async fn list(&self) -> DbResult<Vec<AiModel>> {
        let rows =
            sqlx::query_as::<_, AiModelRow>("SELECT id, name, version FROM ai_models ORDER BY id")
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
