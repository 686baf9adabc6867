//! Repository for `video_scenes` and the `video_active_state` checkpoint.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mediasearch_models::{AssetId, CloseReason, VideoActiveState, VideoScene, VideoSceneId, WorkerId};

use crate::error::DbResult;

#[derive(sqlx::FromRow)]
struct VideoSceneRow {
    id: i64,
    asset_id: i64,
    start_ts: f64,
    end_ts: f64,
    rep_frame_path: String,
    sharpness: f64,
    close_reason: String,
    description: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<VideoSceneRow> for VideoScene {
    fn from(row: VideoSceneRow) -> Self {
        VideoScene {
            id: VideoSceneId::new(row.id),
            asset_id: AssetId::new(row.asset_id),
            start_ts: row.start_ts,
            end_ts: row.end_ts,
            rep_frame_path: row.rep_frame_path,
            sharpness: row.sharpness,
            close_reason: match row.close_reason.as_str() {
                "phash" => CloseReason::Phash,
                "forced" => CloseReason::Forced,
                _ => CloseReason::Temporal,
            },
            description: row.description,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

const SCENE_COLUMNS: &str =
    "id, asset_id, start_ts, end_ts, rep_frame_path, sharpness, close_reason, description, metadata, created_at";

pub struct VideoSceneRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> VideoSceneRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_asset(&self, asset_id: AssetId) -> DbResult<Vec<VideoScene>> {
        let rows = sqlx::query_as::<_, VideoSceneRow>(&format!(
            "SELECT {SCENE_COLUMNS} FROM video_scenes WHERE asset_id = $1 ORDER BY start_ts"
        ))
        .bind(asset_id.as_i64())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(VideoScene::from).collect())
    }

    /// Re-read a single scene right before a vision-pass write (spec
    /// §4.5.6 strict-merge): the freshest row decides whether this pass is
    /// already satisfied by a newer model run.
    pub async fn find(&self, id: VideoSceneId) -> DbResult<Option<VideoScene>> {
        let row = sqlx::query_as::<_, VideoSceneRow>(&format!(
            "SELECT {SCENE_COLUMNS} FROM video_scenes WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(VideoScene::from))
    }

    /// Highest `end_ts` persisted so far for this asset, used by the
    /// resume algorithm to compute the checkpoint seek target.
    pub async fn max_end_ts(&self, asset_id: AssetId) -> DbResult<Option<f64>> {
        let max: Option<f64> =
            sqlx::query_scalar("SELECT MAX(end_ts) FROM video_scenes WHERE asset_id = $1")
                .bind(asset_id.as_i64())
                .fetch_one(self.pool)
                .await?;
        Ok(max)
    }

    /// Atomically performs the three writes spec §4.5.4 requires to happen
    /// together on every scene close: insert the closed `VideoScene`, UPSERT
    /// the next open scene's `VideoActiveState` checkpoint (or delete it, at
    /// stream end), and renew the asset's lease. A crash between any two of
    /// these three as separate round trips would leave the checkpoint
    /// inconsistent with the persisted scenes, breaking resume-equivalence.
    #[allow(clippy::too_many_arguments)]
    pub async fn close_scene_and_checkpoint(
        &self,
        asset_id: AssetId,
        start_ts: f64,
        end_ts: f64,
        rep_frame_path: &str,
        sharpness: f64,
        close_reason: CloseReason,
        next_active_state: Option<&VideoActiveState>,
        worker_id: &WorkerId,
        lease_ttl: chrono::Duration,
    ) -> DbResult<VideoScene> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, VideoSceneRow>(&format!(
            r#"
            INSERT INTO video_scenes (asset_id, start_ts, end_ts, rep_frame_path, sharpness, close_reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SCENE_COLUMNS}
            "#
        ))
        .bind(asset_id.as_i64())
        .bind(start_ts)
        .bind(end_ts)
        .bind(rep_frame_path)
        .bind(sharpness)
        .bind(close_reason.as_db_str())
        .fetch_one(&mut *tx)
        .await?;

        match next_active_state {
            Some(state) => {
                sqlx::query(
                    r#"
                    INSERT INTO video_active_state
                        (asset_id, anchor_phash, scene_start_ts, best_frame_ts, best_frame_sharpness, last_cut_ts, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, now())
                    ON CONFLICT (asset_id) DO UPDATE SET
                        anchor_phash = EXCLUDED.anchor_phash,
                        scene_start_ts = EXCLUDED.scene_start_ts,
                        best_frame_ts = EXCLUDED.best_frame_ts,
                        best_frame_sharpness = EXCLUDED.best_frame_sharpness,
                        last_cut_ts = EXCLUDED.last_cut_ts,
                        updated_at = now()
                    "#,
                )
                .bind(asset_id.as_i64())
                .bind(&state.anchor_phash)
                .bind(state.scene_start_ts)
                .bind(state.best_frame_ts)
                .bind(state.best_frame_sharpness)
                .bind(state.last_cut_ts)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM video_active_state WHERE asset_id = $1")
                    .bind(asset_id.as_i64())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query(
            "UPDATE assets SET lease_expires_at = now() + $1::interval, updated_at = now() \
             WHERE id = $2 AND worker_id = $3 AND status = 'processing'",
        )
        .bind(format!("{} seconds", lease_ttl.num_seconds()))
        .bind(asset_id.as_i64())
        .bind(worker_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Strict-merge write: only called after a fresh re-read confirmed the
    /// scene has no conflicting model-version field already set.
    pub async fn write_vision_fields(
        &self,
        scene_id: VideoSceneId,
        description: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE video_scenes SET description = COALESCE($1, description), \
             metadata = COALESCE(metadata, '{}'::jsonb) || COALESCE($2, '{}'::jsonb) \
             WHERE id = $3",
        )
        .bind(description)
        .bind(metadata)
        .bind(scene_id.as_i64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Invalidation on `segmentation_version` mismatch: delete all scenes
    /// for this asset so re-segmentation starts clean.
    pub async fn delete_for_asset(&self, asset_id: AssetId) -> DbResult<()> {
        sqlx::query("DELETE FROM video_scenes WHERE asset_id = $1")
            .bind(asset_id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn load_active_state(&self, asset_id: AssetId) -> DbResult<Option<VideoActiveState>> {
        let row: Option<(i64, String, f64, Option<f64>, Option<f64>, f64, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT asset_id, anchor_phash, scene_start_ts, best_frame_ts, \
                 best_frame_sharpness, last_cut_ts, updated_at FROM video_active_state \
                 WHERE asset_id = $1",
            )
            .bind(asset_id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(
            |(asset_id, anchor_phash, scene_start_ts, best_frame_ts, best_frame_sharpness, last_cut_ts, updated_at)| {
                VideoActiveState {
                    asset_id: AssetId::new(asset_id),
                    anchor_phash,
                    scene_start_ts,
                    best_frame_ts,
                    best_frame_sharpness,
                    last_cut_ts,
                    updated_at,
                }
            },
        ))
    }

    pub async fn save_active_state(&self, state: &VideoActiveState) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO video_active_state
                (asset_id, anchor_phash, scene_start_ts, best_frame_ts, best_frame_sharpness, last_cut_ts, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (asset_id) DO UPDATE SET
                anchor_phash = EXCLUDED.anchor_phash,
                scene_start_ts = EXCLUDED.scene_start_ts,
                best_frame_ts = EXCLUDED.best_frame_ts,
                best_frame_sharpness = EXCLUDED.best_frame_sharpness,
                last_cut_ts = EXCLUDED.last_cut_ts,
                updated_at = now()
            "#,
        )
        .bind(state.asset_id.as_i64())
        .bind(&state.anchor_phash)
        .bind(state.scene_start_ts)
        .bind(state.best_frame_ts)
        .bind(state.best_frame_sharpness)
        .bind(state.last_cut_ts)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_active_state(&self, asset_id: AssetId) -> DbResult<()> {
        sqlx::query("DELETE FROM video_active_state WHERE asset_id = $1")
            .bind(asset_id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
