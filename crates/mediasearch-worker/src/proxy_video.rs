//! Video proxy stage (C4, spec §4.4): one ephemeral 720p transcode, one
//! static thumbnail, one stream-copied head clip, then handoff to the
//! scene engine (§4.5) so the whole pipeline advances on a single claim.

use mediasearch_cache::{tmp_transcode_path, video_head_clip_path, CacheConfig};
use mediasearch_db::{LibraryRepo, QueryScope};
use mediasearch_media::{extract_head_clip, generate_thumbnail, probe_video, transcode_720p};
use mediasearch_models::{Asset, HeartbeatStats, LibrarySlug, MediaKind, PipelineStage};
use mediasearch_queue::ClaimEngine;
use tracing::warn;

use crate::error::{WorkerError, WorkerResult};
use crate::lifecycle::Lifecycle;
use crate::logging::AssetLogger;
use crate::video_engine;

/// Claim and fully process one pending video: transcode, head clip,
/// thumbnail, then scene segmentation. `Ok(false)` means no work this poll.
pub async fn run_once(
    lifecycle: &Lifecycle,
    claim_engine: &ClaimEngine<'_>,
    cache_config: &CacheConfig,
    library_slug: Option<&LibrarySlug>,
) -> WorkerResult<bool> {
    let Some(asset) = claim_engine
        .claim_next(
            PipelineStage::Proxy,
            Some(MediaKind::Video),
            library_slug,
            lifecycle.worker_id(),
            None,
        )
        .await?
    else {
        return Ok(false);
    };

    let logger = AssetLogger::new(asset.id, "video-proxy");
    let _span = logger.create_span().entered();
    logger.log_start(&asset.rel_path);
    lifecycle.set_state(mediasearch_models::WorkerState::Processing);

    let library = LibraryRepo::new(lifecycle.pool())
        .find(&asset.library_slug, QueryScope::visible_only())
        .await?;

    let result = process_one(lifecycle, claim_engine, &asset, library.as_ref().map(|l| l.source_root.as_str()), cache_config).await;

    match result {
        Ok(()) => logger.log_completion(&asset.rel_path),
        Err(WorkerError::Cancelled) => {
            logger.log_warning("interrupted by shutdown, releasing lease");
            claim_engine
                .release_on_shutdown(asset.id, PipelineStage::Proxy)
                .await?;
        }
        Err(e) => {
            warn!(asset_id = asset.id.as_i64(), error = %e, "video proxy failed");
            claim_engine
                .mark_failure(asset.id, PipelineStage::Proxy, &e.to_string())
                .await?;
            logger.log_error(&e.to_string());
        }
    }

    lifecycle.set_state(mediasearch_models::WorkerState::Idle);
    Ok(true)
}

async fn process_one(
    lifecycle: &Lifecycle,
    claim_engine: &ClaimEngine<'_>,
    asset: &Asset,
    source_root: Option<&str>,
    cache_config: &CacheConfig,
) -> WorkerResult<()> {
    let source_root = source_root.ok_or_else(|| {
        WorkerError::Configuration(format!(
            "library {} not found for asset {}",
            asset.library_slug,
            asset.id.as_i64()
        ))
    })?;
    let source = std::path::Path::new(source_root).join(&asset.rel_path);

    let tmp_rel = tmp_transcode_path(asset.library_slug.as_str(), &asset.id.as_i64().to_string());
    let tmp_abs = cache_config.resolve(&tmp_rel);
    if let Some(parent) = tmp_abs.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Heartbeat hint for the cross-host temp-GC guard (spec §9): while this
    // ephemeral file exists on disk, a sweep on this host must not treat it
    // as an abandoned temp file.
    lifecycle
        .set_stats(
            serde_json::to_value(HeartbeatStats {
                transcoding: true,
                current_asset_id: Some(asset.id.as_i64()),
                ..Default::default()
            })
            .expect("HeartbeatStats serializes"),
        )
        .await;

    transcode_720p(&source, &tmp_abs).await?;

    let head_clip_rel = video_head_clip_path(asset.library_slug.as_str(), asset.id);
    let head_clip_abs = cache_config.resolve(&head_clip_rel);
    if let Some(parent) = head_clip_abs.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    extract_head_clip(&tmp_abs, &head_clip_abs).await?;

    let thumbnail_rel = mediasearch_cache::thumbnail_path(asset.library_slug.as_str(), asset.id);
    let thumbnail_abs = cache_config.resolve(&thumbnail_rel);
    generate_thumbnail(&tmp_abs, &thumbnail_abs).await?;

    let info = probe_video(&source).await?;

    let scenes_result = video_engine::run_segmentation(
        lifecycle,
        asset,
        &source,
        info.width,
        info.height,
        info.duration,
        cache_config,
    )
    .await;

    let _ = tokio::fs::remove_file(&tmp_abs).await;
    lifecycle
        .set_stats(
            serde_json::to_value(HeartbeatStats::default()).expect("HeartbeatStats serializes"),
        )
        .await;

    scenes_result?;

    claim_engine
        .mark_success(asset.id, PipelineStage::Proxy, None)
        .await?;
    mediasearch_db::AssetRepo::new(lifecycle.pool())
        .set_preview_clip_path(asset.id, &head_clip_rel.to_string_lossy())
        .await?;

    Ok(())
}
