//! Image AI stage (C4.5.6, spec §4.5.6 generalized to images): no scenes to
//! iterate, so the strict-merge policy applies directly to the asset row,
//! fed from its already-generated proxy image rather than the original
//! source file.

use mediasearch_cache::{proxy_path, CacheConfig};
use mediasearch_db::AiModelRepo;
use mediasearch_models::{AnalysisMode, AssetId, LibrarySlug, MediaKind, PipelineStage};
use mediasearch_queue::ClaimEngine;
use mediasearch_vision::VisionAnalyzer;
use tracing::warn;

use crate::error::WorkerResult;
use crate::lifecycle::Lifecycle;
use crate::logging::AssetLogger;
use crate::vision_pass;

/// Claim and run one light-or-full vision pass over a pending image.
/// `Ok(false)` means there was no eligible work this poll.
pub async fn run_once(
    lifecycle: &Lifecycle,
    claim_engine: &ClaimEngine<'_>,
    cache_config: &CacheConfig,
    analyzer: &dyn VisionAnalyzer,
    mode: AnalysisMode,
    library_slug: Option<&LibrarySlug>,
) -> WorkerResult<bool> {
    let stage = match mode {
        AnalysisMode::Light => PipelineStage::AiLight,
        AnalysisMode::Full => PipelineStage::AiFull,
    };

    // Resolve the worker's own model before claiming: the claim predicate
    // must filter by this, not by a library's own effective model, or a
    // worker running one analyzer happily steals work targeted at another.
    let model = AiModelRepo::new(lifecycle.pool())
        .find_or_create(&analyzer.model_card().name, &analyzer.model_card().version)
        .await?;

    let Some(asset) = claim_engine
        .claim_next(
            stage,
            Some(MediaKind::Image),
            library_slug,
            lifecycle.worker_id(),
            Some(model.id),
        )
        .await?
    else {
        return Ok(false);
    };

    let logger = AssetLogger::new(asset.id, "image-ai");
    let _span = logger.create_span().entered();
    logger.log_start(&asset.rel_path);
    lifecycle.set_state(mediasearch_models::WorkerState::Processing);

    let result = process_one(lifecycle, &asset, cache_config, analyzer, mode, model.id).await;

    match result {
        Ok(()) => {
            claim_engine
                .mark_success(asset.id, stage, Some(model.id))
                .await?;
            logger.log_completion(&asset.rel_path);
        }
        Err(e) => {
            warn!(asset_id = asset.id.as_i64(), error = %e, "image AI pass failed");
            claim_engine.mark_failure(asset.id, stage, &e.to_string()).await?;
            logger.log_error(&e.to_string());
        }
    }

    lifecycle.set_state(mediasearch_models::WorkerState::Idle);
    Ok(true)
}

async fn process_one(
    lifecycle: &Lifecycle,
    asset: &mediasearch_models::Asset,
    cache_config: &CacheConfig,
    analyzer: &dyn VisionAnalyzer,
    mode: AnalysisMode,
    worker_model_id: mediasearch_models::AiModelId,
) -> WorkerResult<()> {
    let asset_repo = mediasearch_db::AssetRepo::new(lifecycle.pool());
    let frame_path = cache_config.resolve(&proxy_path(asset.library_slug.as_str(), asset.id));

    match mode {
        AnalysisMode::Light => run_light(&asset_repo, asset.id, &frame_path, analyzer, worker_model_id).await,
        AnalysisMode::Full => run_full(&asset_repo, asset.id, &frame_path, analyzer, worker_model_id).await,
    }
}

async fn run_light(
    asset_repo: &mediasearch_db::AssetRepo<'_>,
    asset_id: AssetId,
    frame_path: &std::path::Path,
    analyzer: &dyn VisionAnalyzer,
    worker_model_id: mediasearch_models::AiModelId,
) -> WorkerResult<()> {
    let fresh = asset_repo.find(asset_id).await?;
    if !vision_pass::needs_rerun(fresh.tags_model_id, worker_model_id, fresh.has_light_fields()) {
        return Ok(());
    }

    let described = vision_pass::describe(analyzer, frame_path).await?;

    // Re-read right before writing: strict merge never trusts the copy
    // fetched before the (possibly slow) analyzer call.
    let fresh = asset_repo.find(asset_id).await?;
    if !vision_pass::needs_rerun(fresh.tags_model_id, worker_model_id, fresh.has_light_fields()) {
        return Ok(());
    }

    asset_repo
        .write_vision_fields(
            asset_id,
            Some(&described.description),
            Some(&vision_pass::tags_patch(&described.tags)),
        )
        .await?;

    let verified = asset_repo.find(asset_id).await?;
    if !verified.has_light_fields() {
        return Err(crate::error::WorkerError::Configuration(format!(
            "light vision write did not persist for asset {}",
            asset_id.as_i64()
        )));
    }
    Ok(())
}

async fn run_full(
    asset_repo: &mediasearch_db::AssetRepo<'_>,
    asset_id: AssetId,
    frame_path: &std::path::Path,
    analyzer: &dyn VisionAnalyzer,
    worker_model_id: mediasearch_models::AiModelId,
) -> WorkerResult<()> {
    let fresh = asset_repo.find(asset_id).await?;
    if !vision_pass::needs_rerun(fresh.full_analysis_model_id, worker_model_id, fresh.has_ocr_field()) {
        return Ok(());
    }

    let ocr = vision_pass::ocr(analyzer, frame_path).await?;

    let fresh = asset_repo.find(asset_id).await?;
    if !vision_pass::needs_rerun(fresh.full_analysis_model_id, worker_model_id, fresh.has_ocr_field()) {
        return Ok(());
    }

    asset_repo
        .write_vision_fields(asset_id, None, Some(&vision_pass::ocr_patch(&ocr.ocr_text)))
        .await?;

    let verified = asset_repo.find(asset_id).await?;
    if !verified.has_ocr_field() {
        return Err(crate::error::WorkerError::Configuration(format!(
            "full vision write did not persist for asset {}",
            asset_id.as_i64()
        )));
    }
    Ok(())
}
