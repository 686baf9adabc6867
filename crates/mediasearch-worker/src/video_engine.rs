//! Scene segmentation engine orchestration (C5, spec §4.5): wires the
//! persistent frame extractor, the composite cut detector, and the
//! resumable checkpoint together over one video asset.

use mediasearch_cache::{video_scene_frame_path, CacheConfig};
use mediasearch_db::VideoSceneRepo;
use mediasearch_media::{
    extract_rep_frame, laplacian_variance, phash_rgb24, to_luma, BestFrameSeed, FrameExtractor,
    PHash, Segmenter, SegmenterConfig,
};
use mediasearch_models::{Asset, VideoActiveState};
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::lifecycle::Lifecycle;

/// Completion tolerance: the last observed PTS may fall this far short of
/// the probed duration before the run is declared truncated (spec §4.5.1).
const COMPLETION_EPSILON_SECS: f64 = 2.0;

/// Run (or resume) scene segmentation for `asset`, persisting every closed
/// scene and checkpointing after each one so a crash never loses more than
/// the currently open scene.
pub async fn run_segmentation(
    lifecycle: &Lifecycle,
    asset: &Asset,
    source: &std::path::Path,
    source_width: u32,
    source_height: u32,
    source_duration: f64,
    cache_config: &CacheConfig,
) -> WorkerResult<()> {
    let scene_repo = VideoSceneRepo::new(lifecycle.pool());
    let config = SegmenterConfig::default();
    let version_tag = config.version_tag();

    if asset
        .segmentation_version
        .as_deref()
        .is_some_and(|v| v != version_tag)
    {
        info!(asset_id = asset.id.as_i64(), "segmentation_version mismatch, discarding prior scenes");
        scene_repo.delete_for_asset(asset.id).await?;
        scene_repo.clear_active_state(asset.id).await?;
    }

    let watermark = scene_repo.max_end_ts(asset.id).await?.unwrap_or(0.0);
    let active_state = scene_repo.load_active_state(asset.id).await?;

    let (seek_to, discard_until, segmenter) = match active_state {
        Some(state) => {
            let seek_to = (watermark - mediasearch_models::defaults::RESUME_OVERLAP_SECS).max(0.0);
            let anchor = PHash::from_hex(&state.anchor_phash).ok_or_else(|| {
                WorkerError::Configuration(format!(
                    "corrupt anchor_phash checkpoint for asset {}",
                    asset.id.as_i64()
                ))
            })?;
            let best_frame = match (state.best_frame_ts, state.best_frame_sharpness) {
                (Some(pts), Some(sharpness)) => Some(BestFrameSeed { pts, sharpness }),
                _ => None,
            };
            let segmenter =
                Segmenter::primed(config, anchor, state.scene_start_ts, state.last_cut_ts, best_frame);
            (seek_to, Some(watermark), segmenter)
        }
        None => (0.0, None, Segmenter::new(config)),
    };

    let mut extractor = FrameExtractor::open(source, seek_to, source_width, source_height).await?;
    let mut segmenter = segmenter;
    let mut discard_until = discard_until;
    let mut last_pts = seek_to;
    let mut frames_since_checkpoint: u32 = 0;

    loop {
        let Some(frame) = extractor.next_frame().await? else {
            break;
        };

        if let Some(floor) = discard_until {
            if frame.pts < floor {
                continue;
            }
            discard_until = None;
        }

        last_pts = frame.pts;

        let (frame_width, frame_height) = extractor.frame_dimensions();
        let gray = to_luma(&frame.rgb, frame_width, frame_height);
        let phash = phash_rgb24(&frame.rgb, frame_width, frame_height);
        let sharpness = laplacian_variance(&gray);

        if let Some(closed) = segmenter.push_frame(phash, sharpness, frame.pts) {
            persist_closed_scene(lifecycle, &scene_repo, asset, source, source_width, source_height, &closed, &segmenter, cache_config)
                .await?;
            frames_since_checkpoint = 0;
        } else {
            frames_since_checkpoint += 1;
        }

        // Between scene closes the lease is already safe (TEMPORAL_CEILING
        // guarantees a close — and therefore a renewal — well inside the
        // default lease TTL), so this periodic checkpoint only needs to
        // keep the best-frame seed current for a crash mid-scene; it does
        // not need the same cross-table atomicity as a scene close.
        if frames_since_checkpoint != 0 && frames_since_checkpoint % 25 == 0 {
            checkpoint(&scene_repo, asset, &segmenter).await?;
        }

        if lifecycle.should_stop() {
            info!(asset_id = asset.id.as_i64(), "segmentation interrupted at scene boundary");
            checkpoint(&scene_repo, asset, &segmenter).await?;
            extractor.finish().await?;
            return Err(WorkerError::Cancelled);
        }
    }

    extractor.finish().await?;

    if source_duration > 0.0 && last_pts + COMPLETION_EPSILON_SECS < source_duration {
        warn!(
            asset_id = asset.id.as_i64(),
            expected = source_duration,
            observed = last_pts,
            "video stream truncated"
        );
        return Err(mediasearch_media::MediaError::Truncated(format!(
            "expected duration {source_duration}s, observed {last_pts}s"
        ))
        .into());
    }

    if let Some(closed) = segmenter.flush(last_pts, Some(source_duration)) {
        persist_final_scene(lifecycle, &scene_repo, asset, source, source_width, source_height, &closed, cache_config)
            .await?;
    } else {
        scene_repo.clear_active_state(asset.id).await?;
    }

    mediasearch_db::AssetRepo::new(lifecycle.pool())
        .set_segmentation_version(asset.id, &version_tag)
        .await?;

    Ok(())
}

/// Closes a non-terminal scene: the segmenter has already opened the next
/// one by the time this runs, so its state becomes the new checkpoint row
/// persisted in the same transaction as the scene insert and lease renewal.
async fn persist_closed_scene(
    lifecycle: &Lifecycle,
    scene_repo: &VideoSceneRepo<'_>,
    asset: &Asset,
    source: &std::path::Path,
    source_width: u32,
    source_height: u32,
    closed: &mediasearch_media::ClosedScene,
    segmenter: &Segmenter,
    cache_config: &CacheConfig,
) -> WorkerResult<()> {
    let rel_path = video_scene_frame_path(asset.library_slug.as_str(), asset.id, closed.start_ts, closed.end_ts);
    let abs_path = cache_config.resolve(&rel_path);
    extract_rep_frame(source, closed.rep_frame_pts, source_width, source_height, &abs_path).await?;

    let next_state = segmenter.open_scene().map(|open| {
        let best = open.best_frame();
        VideoActiveState {
            asset_id: asset.id,
            anchor_phash: open.anchor_phash.to_hex(),
            scene_start_ts: open.start_ts,
            best_frame_ts: best.map(|b| b.pts),
            best_frame_sharpness: best.map(|b| b.sharpness),
            last_cut_ts: open.last_cut_ts,
            updated_at: chrono::Utc::now(),
        }
    });

    scene_repo
        .close_scene_and_checkpoint(
            asset.id,
            closed.start_ts,
            closed.end_ts,
            &rel_path.to_string_lossy(),
            closed.sharpness,
            closed.close_reason,
            next_state.as_ref(),
            lifecycle.worker_id(),
            mediasearch_queue::LeaseConfig::from_env().lease_ttl,
        )
        .await?;

    Ok(())
}

/// Closes the terminal scene at end-of-stream: no next open scene exists,
/// so the checkpoint row is deleted in the same transaction (spec §4.5.4:
/// "VideoActiveState for that asset is deleted in the same transaction that
/// closes the final scene").
async fn persist_final_scene(
    lifecycle: &Lifecycle,
    scene_repo: &VideoSceneRepo<'_>,
    asset: &Asset,
    source: &std::path::Path,
    source_width: u32,
    source_height: u32,
    closed: &mediasearch_media::ClosedScene,
    cache_config: &CacheConfig,
) -> WorkerResult<()> {
    let rel_path = video_scene_frame_path(asset.library_slug.as_str(), asset.id, closed.start_ts, closed.end_ts);
    let abs_path = cache_config.resolve(&rel_path);
    extract_rep_frame(source, closed.rep_frame_pts, source_width, source_height, &abs_path).await?;

    scene_repo
        .close_scene_and_checkpoint(
            asset.id,
            closed.start_ts,
            closed.end_ts,
            &rel_path.to_string_lossy(),
            closed.sharpness,
            closed.close_reason,
            None,
            lifecycle.worker_id(),
            mediasearch_queue::LeaseConfig::from_env().lease_ttl,
        )
        .await?;

    Ok(())
}

async fn checkpoint(scene_repo: &VideoSceneRepo<'_>, asset: &Asset, segmenter: &Segmenter) -> WorkerResult<()> {
    let Some(open) = segmenter.open_scene() else {
        return Ok(());
    };
    let best = open.best_frame();
    let state = VideoActiveState {
        asset_id: asset.id,
        anchor_phash: open.anchor_phash.to_hex(),
        scene_start_ts: open.start_ts,
        best_frame_ts: best.map(|b| b.pts),
        best_frame_sharpness: best.map(|b| b.sharpness),
        last_cut_ts: open.last_cut_ts,
        updated_at: chrono::Utc::now(),
    };
    scene_repo.save_active_state(&state).await?;
    Ok(())
}
