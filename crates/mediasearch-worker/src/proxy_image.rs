//! Image proxy stage (C4, spec §4.4): decode once, cascade a WebP proxy and
//! a JPEG thumbnail, write both under the cache root, mark the asset
//! `proxied`.

use mediasearch_cache::{build_image_cascade, proxy_path, thumbnail_path, CacheConfig};
use mediasearch_db::{LibraryRepo, QueryScope};
use mediasearch_models::{LibrarySlug, MediaKind, PipelineStage};
use mediasearch_queue::ClaimEngine;
use tracing::warn;

use crate::error::WorkerResult;
use crate::lifecycle::Lifecycle;
use crate::logging::AssetLogger;

/// Claim and process one pending image. `Ok(false)` means there was no
/// work available this poll. `library_slug` narrows the claim to one
/// library when the worker was launched with `--library` rather than
/// `--all` (spec §6.1).
pub async fn run_once(
    lifecycle: &Lifecycle,
    claim_engine: &ClaimEngine<'_>,
    cache_config: &CacheConfig,
    library_slug: Option<&LibrarySlug>,
) -> WorkerResult<bool> {
    let Some(asset) = claim_engine
        .claim_next(
            PipelineStage::Proxy,
            Some(MediaKind::Image),
            library_slug,
            lifecycle.worker_id(),
            None,
        )
        .await?
    else {
        return Ok(false);
    };

    let logger = AssetLogger::new(asset.id, "image-proxy");
    let _span = logger.create_span().entered();
    logger.log_start(&asset.rel_path);
    lifecycle.set_state(mediasearch_models::WorkerState::Processing);

    let library = LibraryRepo::new(lifecycle.pool())
        .find(&asset.library_slug, QueryScope::visible_only())
        .await?;

    let result = process_one(&asset, library.as_ref().map(|l| l.source_root.as_str()), cache_config).await;

    match result {
        Ok(()) => {
            claim_engine
                .mark_success(asset.id, PipelineStage::Proxy, None)
                .await?;
            logger.log_completion(&asset.rel_path);
        }
        Err(e) => {
            warn!(asset_id = asset.id.as_i64(), error = %e, "image proxy failed");
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
    asset: &mediasearch_models::Asset,
    source_root: Option<&str>,
    cache_config: &CacheConfig,
) -> WorkerResult<()> {
    let source_root = source_root.ok_or_else(|| {
        crate::error::WorkerError::Configuration(format!(
            "library {} not found for asset {}",
            asset.library_slug,
            asset.id.as_i64()
        ))
    })?;
    let source = std::path::Path::new(source_root).join(&asset.rel_path);

    let derivatives = tokio::task::spawn_blocking(move || build_image_cascade(&source))
        .await
        .map_err(|e| crate::error::WorkerError::Configuration(e.to_string()))??;

    let proxy_rel = proxy_path(asset.library_slug.as_str(), asset.id);
    let thumb_rel = thumbnail_path(asset.library_slug.as_str(), asset.id);
    let proxy_abs = cache_config.resolve(&proxy_rel);
    let thumb_abs = cache_config.resolve(&thumb_rel);

    if let Some(parent) = proxy_abs.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if let Some(parent) = thumb_abs.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(&proxy_abs, &derivatives.proxy_bytes).await?;
    tokio::fs::write(&thumb_abs, &derivatives.thumbnail_bytes).await?;

    Ok(())
}
