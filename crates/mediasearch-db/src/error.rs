//! Database error types.

use mediasearch_models::ErrorClass;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("slug already in use (including trashed libraries): {0}")]
    SlugConflict(String),

    #[error("library not found: {0}")]
    LibraryNotFound(String),

    #[error("asset not found: {0}")]
    AssetNotFound(i64),

    #[error("schema version mismatch: database has {found}, worker expects {expected}")]
    SchemaMismatch { found: String, expected: String },
}

impl DbError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            DbError::Query(_) => ErrorClass::Transient,
            DbError::Migration(_) | DbError::SchemaMismatch { .. } => ErrorClass::Configuration,
            DbError::SlugConflict(_) | DbError::LibraryNotFound(_) | DbError::AssetNotFound(_) => {
                ErrorClass::Corrupt
            }
        }
    }

    /// True when the underlying error is a unique-constraint violation on
    /// the `(library_slug, rel_path)` or library slug keys.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Query(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
