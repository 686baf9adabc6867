//! Maintenance sweep (`maintenance run`): reclaim expired leases, prune
//! stale worker rows, and garbage-collect ephemeral temp files. Also hosts
//! the `--repair` scan shared by every stage's claim loop.

use std::path::Path;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use mediasearch_cache::{proxy_path, thumbnail_path, video_head_clip_path, CacheConfig};
use mediasearch_db::{AssetRepo, WorkerStatusRepo};
use mediasearch_models::{defaults, AssetStatus, HeartbeatStats, LibrarySlug, MediaKind};
use mediasearch_queue::{ClaimEngine, LeaseConfig};

use crate::error::WorkerResult;

#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub leases_reclaimed: u64,
    pub stale_workers_pruned: u64,
    pub temp_files_deleted: u64,
    pub temp_gc_skipped_live_transcode: bool,
}

/// One full `maintenance run` pass. `dry_run` logs what would happen
/// without mutating anything; `library_slug` narrows the temp GC to one
/// library's tmp subtree (reclaim and stale-worker pruning are always
/// fleet-wide — leases and worker rows aren't partitioned by library).
pub async fn run(
    pool: &PgPool,
    cache_config: &CacheConfig,
    library_slug: Option<&LibrarySlug>,
    hostname: &str,
    dry_run: bool,
) -> WorkerResult<MaintenanceReport> {
    let mut report = MaintenanceReport::default();

    if dry_run {
        info!("dry run: no changes will be made");
    } else {
        report.leases_reclaimed = reclaim_leases(pool).await?;
    }
    if !dry_run {
        report.stale_workers_pruned = prune_stale_workers(pool).await?;
    }

    let (deleted, skipped) = temp_gc(pool, cache_config, library_slug, hostname, dry_run).await?;
    report.temp_files_deleted = deleted;
    report.temp_gc_skipped_live_transcode = skipped;

    Ok(report)
}

pub async fn reclaim_leases(pool: &PgPool) -> WorkerResult<u64> {
    let claim_engine = ClaimEngine::new(pool, LeaseConfig::from_env());
    Ok(claim_engine.reclaim_sweep().await?)
}

pub async fn prune_stale_workers(pool: &PgPool) -> WorkerResult<u64> {
    let repo = WorkerStatusRepo::new(pool);
    let staleness = chrono::Duration::hours(defaults::WORKER_STALE_AFTER_HOURS);
    let stale = repo.list_stale(staleness).await?;
    for worker in &stale {
        warn!(worker_id = %worker.worker_id, "pruning stale worker");
        repo.delete(&worker.worker_id).await?;
    }
    Ok(stale.len() as u64)
}

/// Temp files older than `TEMP_FILE_MAX_AGE_HOURS` are removed unless some
/// worker on this same host reports `transcoding: true` in its heartbeat
/// stats — in that case the whole sweep is skipped rather than risk
/// deleting a file a live transcode still holds open (spec §5 Shared
/// resource policy).
pub async fn temp_gc(
    pool: &PgPool,
    cache_config: &CacheConfig,
    library_slug: Option<&LibrarySlug>,
    hostname: &str,
    dry_run: bool,
) -> WorkerResult<(u64, bool)> {
    let workers = WorkerStatusRepo::new(pool).list().await?;
    let live_transcode_on_host = workers.iter().any(|w| {
        w.hostname == hostname
            && w.stats
                .as_ref()
                .and_then(|s| serde_json::from_value::<HeartbeatStats>(s.clone()).ok())
                .map(|s| s.transcoding)
                .unwrap_or(false)
    });

    if live_transcode_on_host {
        warn!(hostname, "skipping temp GC: live transcode in progress on this host");
        return Ok((0, true));
    }

    let max_age = chrono::Duration::hours(defaults::TEMP_FILE_MAX_AGE_HOURS);
    let cutoff = Utc::now() - max_age;

    let roots: Vec<std::path::PathBuf> = match library_slug {
        Some(slug) => vec![cache_config.tmp_dir(slug.as_str())],
        None => {
            let tmp_root = cache_config.data_dir.join("tmp");
            if !tmp_root.is_dir() {
                return Ok((0, false));
            }
            std::fs::read_dir(&tmp_root)
                .map_err(crate::error::WorkerError::Io)?
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .map(|e| e.path())
                .collect()
        }
    };

    let mut deleted = 0u64;
    for root in roots {
        deleted += gc_dir(&root, cutoff, dry_run)?;
    }
    Ok((deleted, false))
}

fn gc_dir(dir: &Path, cutoff: chrono::DateTime<Utc>, dry_run: bool) -> WorkerResult<u64> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut deleted = 0u64;
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::<Utc>::from);
        let Some(modified) = modified else { continue };
        if modified >= cutoff {
            continue;
        }
        if dry_run {
            info!(path = %entry.path().display(), "would delete temp file");
        } else {
            std::fs::remove_file(entry.path()).map_err(crate::error::WorkerError::Io)?;
        }
        deleted += 1;
    }
    Ok(deleted)
}

/// `maintenance retry-poisoned`: the only path that returns a poisoned
/// asset to the queue (spec §7). Scoped to one library when given.
pub async fn retry_poisoned(pool: &PgPool, library_slug: Option<&LibrarySlug>) -> WorkerResult<u64> {
    let n = AssetRepo::new(pool).retry_poisoned(library_slug).await?;
    if n > 0 {
        info!(count = n, "reset poisoned assets to pending");
    }
    Ok(n)
}

/// `--repair` (spec §4.4): assets past the proxy stage whose derivative
/// files are missing on disk are reset to `pending`. Pure *resetter* —
/// regeneration runs through the normal claim path afterward.
pub async fn repair_library(
    pool: &PgPool,
    cache_config: &CacheConfig,
    library_slug: &LibrarySlug,
    kind: MediaKind,
) -> WorkerResult<u64> {
    let asset_repo = AssetRepo::new(pool);
    let mut repaired = 0u64;

    for status in [AssetStatus::Proxied, AssetStatus::AnalyzedLight, AssetStatus::Completed] {
        let assets = asset_repo.list(Some(library_slug), Some(status)).await?;
        for asset in assets.into_iter().filter(|a| a.kind == kind) {
            let missing = match kind {
                MediaKind::Image => {
                    let proxy = cache_config.resolve(&proxy_path(library_slug.as_str(), asset.id));
                    let thumb = cache_config.resolve(&thumbnail_path(library_slug.as_str(), asset.id));
                    !proxy.exists() || !thumb.exists()
                }
                MediaKind::Video => {
                    let head_clip = cache_config.resolve(&video_head_clip_path(library_slug.as_str(), asset.id));
                    !head_clip.exists()
                }
            };

            if missing {
                warn!(asset_id = asset.id.as_i64(), "repair: missing derivative, resetting to pending");
                asset_repo.reset_for_repair(asset.id).await?;
                repaired += 1;
            }
        }
    }

    Ok(repaired)
}
