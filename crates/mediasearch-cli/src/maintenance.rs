//! `maintenance run` / `maintenance retry-poisoned` (spec §4.1, §6.1, §7):
//! reclaim expired leases, prune stale worker rows, GC ephemeral temp
//! files, and (on explicit operator request only) un-poison assets.

use anyhow::Result;
use sqlx::PgPool;

use mediasearch_cache::CacheConfig;
use mediasearch_models::LibrarySlug;

pub async fn run(
    pool: &PgPool,
    cache_config: &CacheConfig,
    library: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let slug = library
        .map(|s| LibrarySlug::parse(s).map_err(|e| anyhow::anyhow!("{e}")))
        .transpose()?;
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string());

    let report = mediasearch_worker::maintenance::run(pool, cache_config, slug.as_ref(), &hostname, dry_run).await?;

    println!("leases reclaimed:       {}", report.leases_reclaimed);
    println!("stale workers pruned:   {}", report.stale_workers_pruned);
    println!("temp files deleted:     {}", report.temp_files_deleted);
    if report.temp_gc_skipped_live_transcode {
        println!("temp GC skipped: a live transcode is in progress on this host");
    }
    Ok(())
}

pub async fn retry_poisoned(pool: &PgPool, library: Option<String>) -> Result<()> {
    let slug = library
        .map(|s| LibrarySlug::parse(s).map_err(|e| anyhow::anyhow!("{e}")))
        .transpose()?;
    let n = mediasearch_worker::maintenance::retry_poisoned(pool, slug.as_ref()).await?;
    println!("reset {n} poisoned asset(s) to pending");
    Ok(())
}
