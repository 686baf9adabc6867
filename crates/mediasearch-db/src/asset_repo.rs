//! Repository for the `assets` table, including the atomic claim/reclaim
//! contract that is the core of the queue/lease engine.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mediasearch_models::{
    AiModelId, Asset, AssetId, AssetStatus, DiscoveredFile, LibrarySlug, MediaKind, PipelineStage,
    WorkerId, MAX_RETRIES,
};

use crate::error::{DbError, DbResult};
use crate::scope::QueryScope;

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: i64,
    library_slug: String,
    rel_path: String,
    kind: String,
    mtime: f64,
    size_bytes: i64,
    status: String,
    tags_model_id: Option<i64>,
    full_analysis_model_id: Option<i64>,
    last_error: Option<String>,
    worker_id: Option<String>,
    lease_expires_at: Option<DateTime<Utc>>,
    claimed_stage: Option<String>,
    retry_count: i32,
    preview_clip_path: Option<String>,
    segmentation_version: Option<String>,
    description: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Asset {
            id: AssetId::new(row.id),
            library_slug: LibrarySlug(row.library_slug),
            rel_path: row.rel_path,
            kind: row.kind.parse().unwrap_or(MediaKind::Image),
            mtime: row.mtime,
            size_bytes: row.size_bytes,
            status: row.status.parse().unwrap_or(AssetStatus::Pending),
            tags_model_id: row.tags_model_id.map(AiModelId::new),
            full_analysis_model_id: row.full_analysis_model_id.map(AiModelId::new),
            last_error: row.last_error,
            worker_id: row.worker_id.map(WorkerId),
            lease_expires_at: row.lease_expires_at,
            claimed_stage: row.claimed_stage.and_then(|s| s.parse().ok()),
            retry_count: row.retry_count,
            preview_clip_path: row.preview_clip_path,
            segmentation_version: row.segmentation_version,
            description: row.description,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ASSET_COLUMNS: &str = "id, library_slug, rel_path, kind, mtime, size_bytes, status, \
     tags_model_id, full_analysis_model_id, last_error, worker_id, lease_expires_at, \
     claimed_stage, retry_count, preview_clip_path, segmentation_version, description, \
     metadata, created_at, updated_at";

/// Narrows a claim to a single worker's library scope and target model.
#[derive(Debug, Clone)]
pub struct ClaimFilter {
    pub stage: PipelineStage,
    pub kind: Option<MediaKind>,
    pub library_slug: Option<LibrarySlug>,
    /// Required for AI stages: the asset's effective target model must
    /// match, so a worker never steals work targeted at another model.
    pub effective_model_id: Option<AiModelId>,
}

pub struct AssetRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AssetRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: AssetId) -> DbResult<Asset> {
        let row = sqlx::query_as::<_, AssetRow>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(Asset::from)
            .ok_or(DbError::AssetNotFound(id.as_i64()))
    }

    pub async fn list(
        &self,
        library_slug: Option<&LibrarySlug>,
        status: Option<AssetStatus>,
    ) -> DbResult<Vec<Asset>> {
        let mut qb = sqlx::QueryBuilder::new(format!("SELECT {ASSET_COLUMNS} FROM assets"));
        let mut first = true;
        if let Some(slug) = library_slug {
            qb.push(" WHERE library_slug = ");
            qb.push_bind(slug.as_str());
            first = false;
        }
        if let Some(status) = status {
            qb.push(if first { " WHERE " } else { " AND " });
            qb.push("status = ");
            qb.push_bind(status.as_db_str());
        }
        qb.push(" ORDER BY id");

        let rows = qb.build_query_as::<AssetRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Asset::from).collect())
    }

    /// Scanner upsert: insert or, on `(library_slug, rel_path)` conflict,
    /// reset the row to `pending` and clear derived model references only
    /// if `mtime`/`size_bytes` actually changed (dirty detection). This is
    /// the only path that returns a completed asset to the queue.
    pub async fn upsert_discovered(
        &self,
        library_slug: &LibrarySlug,
        file: &DiscoveredFile,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO assets (library_slug, rel_path, kind, mtime, size_bytes, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (library_slug, rel_path) DO UPDATE SET
                kind = EXCLUDED.kind,
                mtime = EXCLUDED.mtime,
                size_bytes = EXCLUDED.size_bytes,
                status = CASE
                    WHEN assets.mtime IS DISTINCT FROM EXCLUDED.mtime
                      OR assets.size_bytes IS DISTINCT FROM EXCLUDED.size_bytes
                    THEN 'pending'
                    ELSE assets.status
                END,
                tags_model_id = CASE
                    WHEN assets.mtime IS DISTINCT FROM EXCLUDED.mtime
                      OR assets.size_bytes IS DISTINCT FROM EXCLUDED.size_bytes
                    THEN NULL ELSE assets.tags_model_id
                END,
                full_analysis_model_id = CASE
                    WHEN assets.mtime IS DISTINCT FROM EXCLUDED.mtime
                      OR assets.size_bytes IS DISTINCT FROM EXCLUDED.size_bytes
                    THEN NULL ELSE assets.full_analysis_model_id
                END,
                retry_count = CASE
                    WHEN assets.mtime IS DISTINCT FROM EXCLUDED.mtime
                      OR assets.size_bytes IS DISTINCT FROM EXCLUDED.size_bytes
                    THEN 0 ELSE assets.retry_count
                END,
                updated_at = now()
            "#,
        )
        .bind(library_slug.as_str())
        .bind(&file.rel_path)
        .bind(file.kind.as_db_str())
        .bind(file.mtime)
        .bind(file.size_bytes)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Atomic claim: select one eligible row `FOR UPDATE SKIP LOCKED`,
    /// transition it to `processing`, and commit, all in one transaction.
    /// Returns `None` when no eligible row exists ("no work").
    pub async fn claim(
        &self,
        filter: &ClaimFilter,
        worker_id: &WorkerId,
        lease_ttl: chrono::Duration,
    ) -> DbResult<Option<Asset>> {
        let mut tx = self.pool.begin().await?;

        let mut qb = sqlx::QueryBuilder::new(format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE status = "
        ));
        let claimable = filter.stage.claimable_from();
        qb.push_bind(claimable[0].as_db_str());
        for extra in &claimable[1..] {
            qb.push(" OR status = ");
            qb.push_bind(extra.as_db_str());
        }

        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind.as_db_str());
        }
        if let Some(slug) = &filter.library_slug {
            qb.push(" AND library_slug = ");
            qb.push_bind(slug.as_str());
        }
        if let Some(model_id) = filter.effective_model_id {
            // model_id is the claiming worker's own resolved analyzer
            // model (spec §4.1 point 1), passed in by the caller. Only
            // rows whose library's effective target (library override,
            // falling back to the system default) equals it are eligible,
            // so a worker never claims or stamps work meant for another
            // model's pass.
            qb.push(" AND library_slug IN (SELECT slug FROM libraries WHERE COALESCE(target_ai_model_id, (SELECT value::BIGINT FROM system_metadata WHERE key = 'default_ai_model_id')) = ");
            qb.push_bind(model_id.as_i64());
            qb.push(")");
        }

        qb.push(" ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED");

        let row = qb
            .build_query_as::<AssetRow>()
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let claimed: Asset = sqlx::query_as::<_, AssetRow>(&format!(
            r#"
            UPDATE assets SET
                status = 'processing',
                worker_id = $1,
                lease_expires_at = now() + $2::interval,
                claimed_stage = $3,
                retry_count = retry_count + 1,
                last_error = NULL,
                updated_at = now()
            WHERE id = $4
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(worker_id.as_str())
        .bind(format!("{} seconds", lease_ttl.num_seconds()))
        .bind(filter.stage.as_db_str())
        .bind(row.id)
        .fetch_one(&mut *tx)
        .await?
        .into();

        tx.commit().await?;
        Ok(Some(claimed))
    }

    /// Mark a claimed asset as successfully advanced to its stage's
    /// success status, releasing the lease. `retry_count` resets to 0 on
    /// every successful transition (spec §8 invariant 6: monotonically
    /// non-decreasing except on success).
    pub async fn mark_stage_success(
        &self,
        id: AssetId,
        stage: PipelineStage,
        model_id: Option<AiModelId>,
    ) -> DbResult<()> {
        let success = stage.success_status();
        match stage {
            PipelineStage::Proxy => {
                sqlx::query(
                    "UPDATE assets SET status = $1, worker_id = NULL, lease_expires_at = NULL, \
                     claimed_stage = NULL, retry_count = 0, updated_at = now() WHERE id = $2",
                )
                .bind(success.as_db_str())
                .bind(id.as_i64())
                .execute(self.pool)
                .await?;
            }
            PipelineStage::AiLight => {
                sqlx::query(
                    "UPDATE assets SET status = $1, tags_model_id = $2, worker_id = NULL, \
                     lease_expires_at = NULL, claimed_stage = NULL, retry_count = 0, updated_at = now() \
                     WHERE id = $3",
                )
                .bind(success.as_db_str())
                .bind(model_id.map(|m| m.as_i64()))
                .bind(id.as_i64())
                .execute(self.pool)
                .await?;
            }
            PipelineStage::AiFull => {
                sqlx::query(
                    "UPDATE assets SET status = $1, full_analysis_model_id = $2, worker_id = NULL, \
                     lease_expires_at = NULL, claimed_stage = NULL, retry_count = 0, updated_at = now() \
                     WHERE id = $3",
                )
                .bind(success.as_db_str())
                .bind(model_id.map(|m| m.as_i64()))
                .bind(id.as_i64())
                .execute(self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Strict-merge vision write for image assets (spec §4.5.6): only
    /// called right after a fresh re-read, so a concurrent re-run with a
    /// newer model never gets clobbered by a stale one. Light mode passes
    /// `description`; full mode passes only `ocr_text` merged into the
    /// existing `metadata` object.
    pub async fn write_vision_fields(
        &self,
        id: AssetId,
        description: Option<&str>,
        metadata_patch: Option<&serde_json::Value>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE assets SET description = COALESCE($1, description), \
             metadata = COALESCE(metadata, '{}'::jsonb) || COALESCE($2, '{}'::jsonb), \
             updated_at = now() WHERE id = $3",
        )
        .bind(description)
        .bind(metadata_patch)
        .bind(id.as_i64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Mark a claim attempt as failed: bump `retry_count` beyond what the
    /// claim already incremented is not needed (claim already did it);
    /// this records the error and either returns the row to its pre-claim
    /// status (retryable) or poisons it (cap exceeded).
    ///
    /// `AssetStatus::Failed` is deliberately never written here: the asset
    /// is only ever "failed" for the instant between a worker's error and
    /// this single requeue write, and collapsing that into one statement
    /// keeps the transition atomic rather than needing a second round trip
    /// to clear it again. `last_error` is the durable record of the failure.
    pub async fn mark_stage_failure(
        &self,
        id: AssetId,
        stage: PipelineStage,
        error_message: &str,
    ) -> DbResult<()> {
        let asset = self.find(id).await?;
        let next_status = if asset.retry_count > MAX_RETRIES {
            AssetStatus::Poisoned
        } else {
            stage.pre_claim_status()
        };

        sqlx::query(
            "UPDATE assets SET status = $1, last_error = $2, worker_id = NULL, \
             lease_expires_at = NULL, claimed_stage = NULL, updated_at = now() WHERE id = $3",
        )
        .bind(next_status.as_db_str())
        .bind(error_message)
        .bind(id.as_i64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Release a lease back to its pre-claim status without touching
    /// `retry_count` or `last_error` — used on graceful worker shutdown.
    pub async fn release_lease(&self, id: AssetId, stage: PipelineStage) -> DbResult<()> {
        sqlx::query(
            "UPDATE assets SET status = $1, worker_id = NULL, lease_expires_at = NULL, \
             claimed_stage = NULL, updated_at = now() WHERE id = $2",
        )
        .bind(stage.pre_claim_status().as_db_str())
        .bind(id.as_i64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Sweep rows with an expired lease: revert retryable ones to their
    /// pre-claim status, poison the rest. Returns the number reclaimed.
    ///
    /// Same collapse as `mark_stage_failure`: this never writes the
    /// transient `failed` status, only the requeued or poisoned outcome.
    pub async fn reclaim_expired_leases(&self) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET
                status = CASE
                    WHEN retry_count > $1 THEN 'poisoned'
                    WHEN claimed_stage = 'proxy' THEN 'pending'
                    WHEN claimed_stage = 'ai_light' THEN 'proxied'
                    WHEN claimed_stage = 'ai_full' THEN 'analyzed_light'
                    ELSE 'pending'
                END,
                last_error = CASE WHEN retry_count > $1 THEN 'lease expired: worker did not renew in time' ELSE last_error END,
                worker_id = NULL,
                lease_expires_at = NULL,
                claimed_stage = NULL,
                updated_at = now()
            WHERE status = 'processing' AND lease_expires_at < now()
            "#,
        )
        .bind(MAX_RETRIES)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Renew the lease of an in-flight stage (long-running video jobs).
    pub async fn renew_lease(
        &self,
        id: AssetId,
        worker_id: &WorkerId,
        lease_ttl: chrono::Duration,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE assets SET lease_expires_at = now() + $1::interval, updated_at = now() \
             WHERE id = $2 AND worker_id = $3 AND status = 'processing'",
        )
        .bind(format!("{} seconds", lease_ttl.num_seconds()))
        .bind(id.as_i64())
        .bind(worker_id.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::AssetNotFound(id.as_i64()));
        }
        Ok(())
    }

    /// `--repair` support: assets past the proxy stage whose derivative
    /// files are missing on disk are reset to `pending` by the caller
    /// after it inspects the filesystem; this just performs the reset.
    pub async fn reset_for_repair(&self, id: AssetId) -> DbResult<()> {
        sqlx::query(
            "UPDATE assets SET status = 'pending', tags_model_id = NULL, \
             full_analysis_model_id = NULL, preview_clip_path = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_i64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_segmentation_version(&self, id: AssetId, version: &str) -> DbResult<()> {
        sqlx::query("UPDATE assets SET segmentation_version = $1, updated_at = now() WHERE id = $2")
            .bind(version)
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_preview_clip_path(&self, id: AssetId, path: &str) -> DbResult<()> {
        sqlx::query("UPDATE assets SET preview_clip_path = $1, updated_at = now() WHERE id = $2")
            .bind(path)
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Counts by status, for admin-visible fleet summaries.
    pub async fn count_by_status(
        &self,
        library_slug: Option<&LibrarySlug>,
    ) -> DbResult<Vec<(AssetStatus, i64)>> {
        let mut qb = sqlx::QueryBuilder::new(
            "SELECT status, COUNT(*) as n FROM assets",
        );
        if let Some(slug) = library_slug {
            qb.push(" WHERE library_slug = ");
            qb.push_bind(slug.as_str());
        }
        qb.push(" GROUP BY status");

        let rows: Vec<(String, i64)> = qb
            .build_query_as()
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(s, n)| s.parse().ok().map(|s| (s, n)))
            .collect())
    }

    /// `maintenance retry-poisoned` (spec §7/§8): poisoned assets are never
    /// reclaimed by the lease sweep, only by explicit operator action. This
    /// restarts them from the top of the pipeline rather than guessing
    /// which stage poisoned them, since `claimed_stage` is cleared on
    /// poison. Returns the number of rows reset.
    pub async fn retry_poisoned(&self, library_slug: Option<&LibrarySlug>) -> DbResult<u64> {
        let mut qb = sqlx::QueryBuilder::new(
            "UPDATE assets SET status = 'pending', retry_count = 0, last_error = NULL, \
             updated_at = now() WHERE status = 'poisoned'",
        );
        if let Some(slug) = library_slug {
            qb.push(" AND library_slug = ");
            qb.push_bind(slug.as_str());
        }
        let result = qb.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete up to `batch_size` asset rows under a library (`trash empty`,
    /// spec §6.1: "chunked hard-delete"). `video_scenes`/`video_active_state`
    /// cascade via their FK to `assets`. Returns how many rows were removed,
    /// so the caller knows when to stop looping.
    pub async fn delete_batch_for_library(&self, slug: &LibrarySlug, batch_size: i64) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM assets WHERE id IN \
             (SELECT id FROM assets WHERE library_slug = $1 LIMIT $2)",
        )
        .bind(slug.as_str())
        .bind(batch_size)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
