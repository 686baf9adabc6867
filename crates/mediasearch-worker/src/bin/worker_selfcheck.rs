//! Standalone preflight check run before a worker process joins the fleet:
//! the cache root is writable, `ffmpeg` is on `PATH`, and the database is
//! reachable at the expected schema version.

use std::path::Path;
use std::process::Command;

use mediasearch_cache::CacheConfig;
use mediasearch_db::{check_schema_version, connect, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cache_config = CacheConfig::from_env();

    println!(
        "worker-selfcheck: starting with data_dir={}",
        cache_config.data_dir.display()
    );
    ensure_dir(&cache_config.data_dir).await?;
    ensure_dir(&cache_config.forensics_dir).await?;
    ensure_ffmpeg()?;

    let db_config = DbConfig::from_env()
        .map_err(|e| anyhow::anyhow!("database configuration error: {e}"))?;
    let pool = connect(&db_config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to database: {e}"))?;
    check_schema_version(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("schema check failed: {e}"))?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffmpeg -version failed: {:?}", output.status));
    }
    Ok(())
}
