//! Scanner reconciler (C3, spec §4.3): walks a library's source root and
//! upserts every recognized media file, reverting changed files to
//! `pending` via the dirty-detection CASE in `AssetRepo::upsert_discovered`.

use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use mediasearch_db::{AssetRepo, LibraryRepo};
use mediasearch_models::{
    defaults::SCAN_UPSERT_BATCH_SIZE, DiscoveredFile, HeartbeatStats, Library, MediaKind,
};

use crate::error::{WorkerError, WorkerResult};
use crate::lifecycle::Lifecycle;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff", "cr2", "cr3", "crw", "nef", "nrw", "arw",
    "sr2", "srf", "raf", "orf", "rw2", "raw", "rwl", "dng",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov"];

fn classify_extension(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Walk `library`'s source root and upsert every recognized file, batching
/// the chunk-of-500 upsert so a transaction never spans the entire walk on
/// a NAS-scale tree. Returns the number of files upserted.
pub async fn scan_library(
    lifecycle: &Lifecycle,
    library: &Library,
) -> WorkerResult<u64> {
    let asset_repo = AssetRepo::new(lifecycle.pool());
    let mut batch: Vec<DiscoveredFile> = Vec::with_capacity(SCAN_UPSERT_BATCH_SIZE);
    let mut total: u64 = 0;
    let mut entries_since_check: u32 = 0;
    let mut directories_visited: u64 = 0;

    let walker = WalkDir::new(&library.source_root).into_iter();
    for entry in walker {
        let entry = entry.map_err(|source| WorkerError::Walk {
            path: library.source_root.clone().into(),
            source,
        })?;

        if entry.file_type().is_dir() {
            directories_visited += 1;
            report_progress(lifecycle, total, directories_visited).await;
            if lifecycle.should_stop() {
                info!(library = %library.slug, "scan interrupted at directory boundary");
                flush_batch(&asset_repo, &library.slug, &mut batch).await?;
                return Ok(total);
            }
            continue;
        }

        entries_since_check += 1;
        if entries_since_check >= 100 {
            entries_since_check = 0;
            report_progress(lifecycle, total, directories_visited).await;
            if lifecycle.should_stop() {
                info!(library = %library.slug, "scan interrupted mid-directory");
                flush_batch(&asset_repo, &library.slug, &mut batch).await?;
                return Ok(total);
            }
        }

        let Some(kind) = classify_extension(entry.path()) else {
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let rel_path = match entry.path().strip_prefix(&library.source_root) {
            Ok(p) => p.to_string_lossy().into_owned(),
            Err(_) => continue,
        };

        batch.push(DiscoveredFile {
            rel_path,
            kind,
            mtime,
            size_bytes: metadata.len() as i64,
        });

        if batch.len() >= SCAN_UPSERT_BATCH_SIZE {
            total += batch.len() as u64;
            flush_batch(&asset_repo, &library.slug, &mut batch).await?;
        }
    }

    total += batch.len() as u64;
    flush_batch(&asset_repo, &library.slug, &mut batch).await?;
    report_progress(lifecycle, total, directories_visited).await;

    info!(library = %library.slug, files = total, "scan complete");
    Ok(total)
}

/// Progress (files processed, directories visited) exposed via heartbeat
/// stats (spec §4.3); purely observational, never read back by this worker.
async fn report_progress(lifecycle: &Lifecycle, files_processed: u64, directories_visited: u64) {
    lifecycle
        .set_stats(
            serde_json::to_value(HeartbeatStats {
                files_processed: Some(files_processed),
                directories_visited: Some(directories_visited),
                ..Default::default()
            })
            .expect("HeartbeatStats serializes"),
        )
        .await;
}

async fn flush_batch(
    asset_repo: &AssetRepo<'_>,
    library_slug: &mediasearch_models::LibrarySlug,
    batch: &mut Vec<DiscoveredFile>,
) -> WorkerResult<()> {
    for file in batch.drain(..) {
        asset_repo.upsert_discovered(library_slug, &file).await?;
    }
    Ok(())
}

/// One pass of the scanner worker's run-loop: claim every library with a
/// pending scan request, walk it, and release the claim.
pub async fn run_once(lifecycle: &Lifecycle) -> WorkerResult<()> {
    let library_repo = LibraryRepo::new(lifecycle.pool());
    let pending = library_repo.list_scan_requested().await?;

    for library in pending {
        if lifecycle.should_stop() {
            break;
        }
        if !library_repo.try_claim_for_scan(&library.slug).await? {
            continue;
        }

        lifecycle.set_state(mediasearch_models::WorkerState::Processing);
        let result = scan_library(lifecycle, &library).await;
        library_repo.finish_scan(&library.slug).await?;
        lifecycle.set_state(mediasearch_models::WorkerState::Idle);

        if let Err(e) = result {
            warn!(library = %library.slug, error = %e, "scan failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_known_image_and_video_extensions() {
        assert_eq!(classify_extension(&PathBuf::from("a.JPG")), Some(MediaKind::Image));
        assert_eq!(classify_extension(&PathBuf::from("b.dng")), Some(MediaKind::Image));
        assert_eq!(classify_extension(&PathBuf::from("c.MOV")), Some(MediaKind::Video));
        assert_eq!(classify_extension(&PathBuf::from("d.txt")), None);
        assert_eq!(classify_extension(&PathBuf::from("no_extension")), None);
    }
}
