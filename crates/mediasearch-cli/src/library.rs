//! `library` and `trash` subcommands (spec §6.1): registration, soft
//! delete/restore, and the chunked hard-delete that empties the trash.

use anyhow::{bail, Context, Result};
use sqlx::PgPool;

use mediasearch_db::{AssetRepo, LibraryRepo, QueryScope};
use mediasearch_models::{defaults::TRASH_EMPTY_BATCH_SIZE, LibrarySlug, NewLibrary};

/// Derive a URL-safe slug from a display name: lowercase, non-alphanumerics
/// collapsed to single hyphens, leading/trailing hyphens trimmed.
fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppresses a leading hyphen
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

pub async fn add(pool: &PgPool, name: &str, path: &str) -> Result<()> {
    let slug = LibrarySlug::parse(slugify(name))
        .with_context(|| format!("could not derive a valid slug from {name:?}"))?;
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("source path does not exist: {path}"))?;

    let new = NewLibrary {
        slug: slug.clone(),
        display_name: name.to_string(),
        source_root: absolute.to_string_lossy().into_owned(),
        target_ai_model_id: None,
    };

    let repo = LibraryRepo::new(pool);
    let library = repo.create(&new).await.with_context(|| {
        format!("failed to register library {slug} (slug uniqueness also covers trashed libraries)")
    })?;

    println!("registered library {} -> {}", library.slug, library.source_root);
    Ok(())
}

pub async fn remove(pool: &PgPool, slug: &str) -> Result<()> {
    let slug = parse_slug(slug)?;
    LibraryRepo::new(pool)
        .soft_delete(&slug)
        .await
        .with_context(|| not_found_hint(&slug))?;
    println!("soft-deleted library {slug}");
    Ok(())
}

pub async fn restore(pool: &PgPool, slug: &str) -> Result<()> {
    let slug = parse_slug(slug)?;
    LibraryRepo::new(pool)
        .restore(&slug)
        .await
        .with_context(|| not_found_hint(&slug))?;
    println!("restored library {slug}");
    Ok(())
}

pub async fn list(pool: &PgPool, include_deleted: bool) -> Result<()> {
    let scope = if include_deleted {
        QueryScope::with_deleted()
    } else {
        QueryScope::visible_only()
    };
    let libraries = LibraryRepo::new(pool).list(scope).await?;

    if libraries.is_empty() {
        println!("no libraries registered");
        return Ok(());
    }

    println!(
        "{:<24} {:<28} {:<10} {:<16} {}",
        "SLUG", "DISPLAY NAME", "ACTIVE", "SCAN STATE", "SOURCE ROOT"
    );
    for library in libraries {
        let marker = if library.is_deleted() { " (trashed)" } else { "" };
        println!(
            "{:<24} {:<28} {:<10} {:<16} {}{}",
            library.slug,
            library.display_name,
            library.active,
            library.scan_state,
            library.source_root,
            marker,
        );
    }
    Ok(())
}

pub async fn trash_empty(pool: &PgPool, slug: &str, force: bool) -> Result<()> {
    let slug = parse_slug(slug)?;
    let library = LibraryRepo::new(pool)
        .find(&slug, QueryScope::with_deleted())
        .await?
        .with_context(|| not_found_hint(&slug))?;

    if !library.is_deleted() {
        bail!("library {slug} is not trashed; run `library remove {slug}` first");
    }
    if !force {
        bail!("refusing to empty trash for {slug} without --force");
    }

    let removed = empty_one(pool, &slug).await?;
    println!("emptied trash for {slug}: {removed} assets, library removed");
    Ok(())
}

pub async fn trash_empty_all(pool: &PgPool, force: bool, verbose: bool) -> Result<()> {
    if !force {
        bail!("refusing to empty all trash without --force");
    }

    let trashed = LibraryRepo::new(pool).list_trashed().await?;
    if trashed.is_empty() {
        println!("no trashed libraries");
        return Ok(());
    }

    let mut total = 0u64;
    for library in trashed {
        let removed = empty_one(pool, &library.slug).await?;
        total += removed;
        if verbose {
            println!("  {}: {removed} assets", library.slug);
        }
    }
    println!("emptied trash for all libraries: {total} assets total");
    Ok(())
}

/// Delete every asset row under `slug` in batches of
/// `TRASH_EMPTY_BATCH_SIZE`, then the (now-empty) library row itself.
async fn empty_one(pool: &PgPool, slug: &LibrarySlug) -> Result<u64> {
    let asset_repo = AssetRepo::new(pool);
    let mut total = 0u64;
    loop {
        let deleted = asset_repo
            .delete_batch_for_library(slug, TRASH_EMPTY_BATCH_SIZE)
            .await?;
        total += deleted;
        if deleted < TRASH_EMPTY_BATCH_SIZE as u64 {
            break;
        }
    }
    LibraryRepo::new(pool).hard_delete(slug).await?;
    Ok(total)
}

fn parse_slug(raw: &str) -> Result<LibrarySlug> {
    LibrarySlug::parse(raw).map_err(|e| anyhow::anyhow!("{e}"))
}

fn not_found_hint(slug: &LibrarySlug) -> String {
    format!("library {slug} not found; run `library list --include-deleted` to check")
}
