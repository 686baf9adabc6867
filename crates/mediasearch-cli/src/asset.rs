//! `asset list` (spec §6.1): admin-visible listing of one library's assets,
//! optionally filtered by pipeline status.

use anyhow::Result;
use sqlx::PgPool;

use mediasearch_db::AssetRepo;
use mediasearch_models::{AssetStatus, LibrarySlug};

pub async fn list(pool: &PgPool, slug: &str, status: Option<String>, limit: usize) -> Result<()> {
    let slug = LibrarySlug::parse(slug).map_err(|e| anyhow::anyhow!("{e}"))?;
    let status: Option<AssetStatus> = status
        .map(|s| s.parse())
        .transpose()
        .map_err(|e: mediasearch_models::UnknownStatus| anyhow::anyhow!("{e}"))?;

    let assets = AssetRepo::new(pool).list(Some(&slug), status).await?;

    if assets.is_empty() {
        println!("no assets match");
        return Ok(());
    }

    println!(
        "{:<8} {:<50} {:<8} {:<15} {:<8} {}",
        "ID", "REL PATH", "KIND", "STATUS", "RETRIES", "ERROR"
    );
    for asset in assets.into_iter().take(limit) {
        println!(
            "{:<8} {:<50} {:<8} {:<15} {:<8} {}",
            asset.id.as_i64(),
            truncate(&asset.rel_path, 50),
            asset.kind,
            asset.status,
            asset.retry_count,
            asset.last_error.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
