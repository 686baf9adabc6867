//! The claim/lease engine a worker's run-loop drives each iteration.

use sqlx::PgPool;
use tracing::{debug, warn};

use mediasearch_db::{AssetRepo, ClaimFilter};
use mediasearch_models::{
    Asset, AssetId, AiModelId, LibrarySlug, MediaKind, PipelineStage, WorkerId,
};

use crate::config::LeaseConfig;
use crate::error::QueueResult;

/// One worker process's handle onto the shared queue.
pub struct ClaimEngine<'a> {
    pool: &'a PgPool,
    config: LeaseConfig,
}

impl<'a> ClaimEngine<'a> {
    pub fn new(pool: &'a PgPool, config: LeaseConfig) -> Self {
        Self { pool, config }
    }

    /// Attempt to claim exactly one eligible asset for this stage. `None`
    /// means no work was available this poll ("no work", not an error).
    ///
    /// `worker_model_id` is the *worker's own* resolved analyzer model
    /// (spec §4.1 point 1), not a library's. For AI stages it is bound
    /// straight into the claim predicate's `COALESCE(library.target_ai_model_id,
    /// default) = worker_model_id` comparison, in `library_slug`-scoped runs
    /// and `--all` runs alike, so a worker only ever claims assets whose
    /// effective target model matches the one it's actually running.
    pub async fn claim_next(
        &self,
        stage: PipelineStage,
        kind: Option<MediaKind>,
        library_slug: Option<&LibrarySlug>,
        worker_id: &WorkerId,
        worker_model_id: Option<AiModelId>,
    ) -> QueueResult<Option<Asset>> {
        let effective_model_id = match stage {
            PipelineStage::AiLight | PipelineStage::AiFull => worker_model_id,
            _ => None,
        };

        let filter = ClaimFilter {
            stage,
            kind,
            library_slug: library_slug.cloned(),
            effective_model_id,
        };

        let repo = AssetRepo::new(self.pool);
        let claimed = repo.claim(&filter, worker_id, self.config.lease_ttl).await?;

        if let Some(asset) = &claimed {
            debug!(asset_id = asset.id.as_i64(), stage = ?stage, "claimed asset");
        }

        Ok(claimed)
    }

    pub async fn renew(&self, asset_id: AssetId, worker_id: &WorkerId) -> QueueResult<()> {
        AssetRepo::new(self.pool)
            .renew_lease(asset_id, worker_id, self.config.lease_ttl)
            .await?;
        Ok(())
    }

    pub async fn mark_success(
        &self,
        asset_id: AssetId,
        stage: PipelineStage,
        model_id: Option<mediasearch_models::AiModelId>,
    ) -> QueueResult<()> {
        AssetRepo::new(self.pool)
            .mark_stage_success(asset_id, stage, model_id)
            .await?;
        Ok(())
    }

    pub async fn mark_failure(
        &self,
        asset_id: AssetId,
        stage: PipelineStage,
        error_message: &str,
    ) -> QueueResult<()> {
        AssetRepo::new(self.pool)
            .mark_stage_failure(asset_id, stage, error_message)
            .await?;
        Ok(())
    }

    pub async fn release_on_shutdown(
        &self,
        asset_id: AssetId,
        stage: PipelineStage,
    ) -> QueueResult<()> {
        AssetRepo::new(self.pool).release_lease(asset_id, stage).await?;
        Ok(())
    }

    /// Run one reclaim sweep. Callable opportunistically from any worker's
    /// poll loop (cheap) or from the `maintenance run` CLI subcommand.
    pub async fn reclaim_sweep(&self) -> QueueResult<u64> {
        let reclaimed = AssetRepo::new(self.pool).reclaim_expired_leases().await?;
        if reclaimed > 0 {
            warn!(count = reclaimed, "reclaimed expired leases");
        }
        Ok(reclaimed)
    }
}
