//! `scan <slug>` (spec §4.3, §6.1): a one-shot scanner run over a single
//! library, reusing the same reconciler and SKIP LOCKED scan-claim the
//! long-running scanner worker uses, so a manual scan and a fleet scanner
//! can never walk the same library concurrently.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sqlx::PgPool;

use mediasearch_db::{LibraryRepo, QueryScope};
use mediasearch_models::LibrarySlug;
use mediasearch_worker::{scanner, Lifecycle};

pub async fn run(lifecycle: &Arc<Lifecycle>, pool: &PgPool, slug: &str, verbose: bool) -> Result<()> {
    let slug = LibrarySlug::parse(slug).map_err(|e| anyhow::anyhow!("{e}"))?;
    let library_repo = LibraryRepo::new(pool);

    let library = library_repo
        .find(&slug, QueryScope::visible_only())
        .await?
        .with_context(|| format!("library {slug} not found; run `library list` to check"))?;

    if !library_repo.try_claim_for_scan(&slug).await? {
        bail!("library {slug} is already being scanned by another worker");
    }

    if verbose {
        println!("scanning {} ({})", library.slug, library.source_root);
    }

    let result = scanner::scan_library(lifecycle, &library).await;
    library_repo.finish_scan(&slug).await?;

    let count = result?;
    println!("scan complete: {count} files reconciled in {slug}");
    Ok(())
}
