//! Connection pool setup and startup schema check.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{DbError, DbResult};

/// Schema version this build of the worker expects. Checked against
/// `system_metadata.schema_version` on startup (spec §4.2).
pub const SCHEMA_VERSION: &str = "1";

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> DbResult<Self> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            DbError::SchemaMismatch {
                found: "DATABASE_URL not set".to_string(),
                expected: "a postgres:// connection string".to_string(),
            }
        })?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

/// Connect to Postgres and run pending migrations.
pub async fn connect(config: &DbConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Connected to database and applied migrations");

    Ok(pool)
}

/// Verify the database's recorded schema version matches what this binary
/// was built against. A mismatch is a configuration error: fatal for the
/// whole worker process (spec §7).
pub async fn check_schema_version(pool: &PgPool) -> DbResult<()> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT value FROM system_metadata WHERE key = 'schema_version'")
            .fetch_optional(pool)
            .await?;

    match found {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(v) => Err(DbError::SchemaMismatch {
            found: v,
            expected: SCHEMA_VERSION.to_string(),
        }),
        None => Err(DbError::SchemaMismatch {
            found: "<missing>".to_string(),
            expected: SCHEMA_VERSION.to_string(),
        }),
    }
}
