//! Video AI stage (C4.5.6, spec §4.5.6): claims a video that already has
//! scenes (segmentation always runs inline during the proxy stage) and
//! applies the strict-merge vision pass per scene, fed from each scene's
//! already-extracted `rep_frame_path` rather than re-decoding the source.

use mediasearch_cache::CacheConfig;
use mediasearch_db::{AiModelRepo, AssetRepo, VideoSceneRepo};
use mediasearch_models::{AnalysisMode, AssetId, LibrarySlug, MediaKind, PipelineStage, VideoSceneId};
use mediasearch_queue::ClaimEngine;
use mediasearch_vision::VisionAnalyzer;
use tracing::warn;

use crate::error::{WorkerError, WorkerResult};
use crate::lifecycle::Lifecycle;
use crate::logging::AssetLogger;
use crate::vision_pass;

/// Claim and run one light-or-full vision pass over every scene of a
/// pending video asset. `Ok(false)` means no eligible work this poll.
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
    let card = analyzer.model_card();
    let model = AiModelRepo::new(lifecycle.pool())
        .find_or_create(&card.name, &card.version)
        .await?;

    let Some(asset) = claim_engine
        .claim_next(
            stage,
            Some(MediaKind::Video),
            library_slug,
            lifecycle.worker_id(),
            Some(model.id),
        )
        .await?
    else {
        return Ok(false);
    };

    let logger = AssetLogger::new(asset.id, "video-ai");
    let _span = logger.create_span().entered();
    logger.log_start(&asset.rel_path);
    lifecycle.set_state(mediasearch_models::WorkerState::Processing);

    let result = process_asset(lifecycle, asset.id, cache_config, analyzer, mode, model.id).await;

    match result {
        Ok(()) => {
            claim_engine
                .mark_success(asset.id, stage, Some(model.id))
                .await?;
            logger.log_completion(&asset.rel_path);
        }
        Err(e) => {
            warn!(asset_id = asset.id.as_i64(), error = %e, "video AI pass failed");
            claim_engine.mark_failure(asset.id, stage, &e.to_string()).await?;
            logger.log_error(&e.to_string());
        }
    }

    lifecycle.set_state(mediasearch_models::WorkerState::Idle);
    Ok(true)
}

async fn process_asset(
    lifecycle: &Lifecycle,
    asset_id: AssetId,
    cache_config: &CacheConfig,
    analyzer: &dyn VisionAnalyzer,
    mode: AnalysisMode,
    worker_model_id: mediasearch_models::AiModelId,
) -> WorkerResult<()> {
    let asset_repo = AssetRepo::new(lifecycle.pool());
    let scene_repo = VideoSceneRepo::new(lifecycle.pool());

    let asset = asset_repo.find(asset_id).await?;
    let stored_model_id = match mode {
        AnalysisMode::Light => asset.tags_model_id,
        AnalysisMode::Full => asset.full_analysis_model_id,
    };

    let scenes = scene_repo.list_for_asset(asset_id).await?;
    if scenes.is_empty() {
        return Err(WorkerError::Configuration(format!(
            "asset {} has no scenes to analyze",
            asset_id.as_i64()
        )));
    }

    for scene in &scenes {
        process_scene(&scene_repo, scene.id, cache_config, analyzer, mode, stored_model_id, worker_model_id).await?;
    }

    // Verify-before-complete (spec §4.5.6 point 4): a fresh re-read of every
    // scene, rerunning anything the loop above somehow left unsatisfied.
    let rechecked = scene_repo.list_for_asset(asset_id).await?;
    for scene in &rechecked {
        let satisfied = match mode {
            AnalysisMode::Light => scene.has_light_fields(),
            AnalysisMode::Full => scene.has_ocr_field(),
        };
        if !satisfied {
            process_scene(&scene_repo, scene.id, cache_config, analyzer, mode, stored_model_id, worker_model_id)
                .await?;
            let verified = scene_repo
                .find(scene.id)
                .await?
                .ok_or_else(|| WorkerError::Configuration(format!("scene {} vanished mid-pass", scene.id.as_i64())))?;
            let ok = match mode {
                AnalysisMode::Light => verified.has_light_fields(),
                AnalysisMode::Full => verified.has_ocr_field(),
            };
            if !ok {
                return Err(WorkerError::Configuration(format!(
                    "scene {} missing expected vision fields after rerun",
                    scene.id.as_i64()
                )));
            }
        }
    }

    Ok(())
}

async fn process_scene(
    scene_repo: &VideoSceneRepo<'_>,
    scene_id: VideoSceneId,
    cache_config: &CacheConfig,
    analyzer: &dyn VisionAnalyzer,
    mode: AnalysisMode,
    stored_model_id: Option<mediasearch_models::AiModelId>,
    worker_model_id: mediasearch_models::AiModelId,
) -> WorkerResult<()> {
    let scene = scene_repo
        .find(scene_id)
        .await?
        .ok_or_else(|| WorkerError::Configuration(format!("scene {} vanished mid-pass", scene_id.as_i64())))?;

    let has_fields = match mode {
        AnalysisMode::Light => scene.has_light_fields(),
        AnalysisMode::Full => scene.has_ocr_field(),
    };
    if !vision_pass::needs_rerun(stored_model_id, worker_model_id, has_fields) {
        return Ok(());
    }

    let frame_path = cache_config.resolve(std::path::Path::new(&scene.rep_frame_path));

    match mode {
        AnalysisMode::Light => {
            let described = vision_pass::describe(analyzer, &frame_path).await?;

            let fresh = scene_repo
                .find(scene_id)
                .await?
                .ok_or_else(|| WorkerError::Configuration(format!("scene {} vanished mid-pass", scene_id.as_i64())))?;
            if !vision_pass::needs_rerun(stored_model_id, worker_model_id, fresh.has_light_fields()) {
                return Ok(());
            }

            scene_repo
                .write_vision_fields(
                    scene_id,
                    Some(&described.description),
                    Some(&vision_pass::tags_patch(&described.tags)),
                )
                .await?;
        }
        AnalysisMode::Full => {
            let ocr = vision_pass::ocr(analyzer, &frame_path).await?;

            let fresh = scene_repo
                .find(scene_id)
                .await?
                .ok_or_else(|| WorkerError::Configuration(format!("scene {} vanished mid-pass", scene_id.as_i64())))?;
            if !vision_pass::needs_rerun(stored_model_id, worker_model_id, fresh.has_ocr_field()) {
                return Ok(());
            }

            scene_repo
                .write_vision_fields(scene_id, None, Some(&vision_pass::ocr_patch(&ocr.ocr_text)))
                .await?;
        }
    }

    Ok(())
}
