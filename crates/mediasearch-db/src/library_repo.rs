//! Repository for the `libraries` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mediasearch_models::{AiModelId, InvalidSlug, Library, LibrarySlug, NewLibrary, ScanState};

use crate::error::{DbError, DbResult};
use crate::scope::QueryScope;

#[derive(sqlx::FromRow)]
struct LibraryRow {
    slug: String,
    display_name: String,
    source_root: String,
    active: bool,
    scan_state: String,
    target_ai_model_id: Option<i64>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LibraryRow> for Library {
    type Error = InvalidSlug;

    fn try_from(row: LibraryRow) -> Result<Self, Self::Error> {
        Ok(Library {
            slug: LibrarySlug::parse(row.slug)?,
            display_name: row.display_name,
            source_root: row.source_root,
            active: row.active,
            scan_state: row.scan_state.parse().unwrap_or_default(),
            target_ai_model_id: row.target_ai_model_id.map(AiModelId::new),
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct LibraryRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LibraryRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new library. Rejects the slug if it collides with any
    /// library including trashed ones — slug uniqueness has no partial
    /// predicate by design.
    pub async fn create(&self, new: &NewLibrary) -> DbResult<Library> {
        let row = sqlx::query_as::<_, LibraryRow>(
            r#"
            INSERT INTO libraries (slug, display_name, source_root, target_ai_model_id)
            VALUES ($1, $2, $3, $4)
            RETURNING slug, display_name, source_root, active, scan_state,
                      target_ai_model_id, deleted_at, created_at, updated_at
            "#,
        )
        .bind(new.slug.as_str())
        .bind(&new.display_name)
        .bind(&new.source_root)
        .bind(new.target_ai_model_id.map(|id| id.as_i64()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            let e = DbError::from(e);
            if e.is_unique_violation() {
                DbError::SlugConflict(new.slug.to_string())
            } else {
                e
            }
        })?;

        row.try_into()
            .map_err(|_| DbError::LibraryNotFound(new.slug.to_string()))
    }

    pub async fn find(&self, slug: &LibrarySlug, scope: QueryScope) -> DbResult<Option<Library>> {
        let sql = format!(
            r#"
            SELECT slug, display_name, source_root, active, scan_state,
                   target_ai_model_id, deleted_at, created_at, updated_at
            FROM libraries
            WHERE slug = $1 AND {}
            "#,
            scope.predicate()
        );
        let row = sqlx::query_as::<_, LibraryRow>(&sql)
            .bind(slug.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into)
            .transpose()
            .map_err(|_| DbError::LibraryNotFound(slug.to_string()))
    }

    pub async fn list(&self, scope: QueryScope) -> DbResult<Vec<Library>> {
        let sql = format!(
            r#"
            SELECT slug, display_name, source_root, active, scan_state,
                   target_ai_model_id, deleted_at, created_at, updated_at
            FROM libraries
            WHERE {}
            ORDER BY slug
            "#,
            scope.predicate()
        );
        let rows = sqlx::query_as::<_, LibraryRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::LibraryNotFound(e.0))
    }

    /// Soft-delete: sets `deleted_at`, leaves assets untouched (chunk
    /// deletion is a separate maintenance concern per the "trash" commands).
    pub async fn soft_delete(&self, slug: &LibrarySlug) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE libraries SET deleted_at = now(), updated_at = now() \
             WHERE slug = $1 AND deleted_at IS NULL",
        )
        .bind(slug.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::LibraryNotFound(slug.to_string()));
        }
        Ok(())
    }

    pub async fn restore(&self, slug: &LibrarySlug) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE libraries SET deleted_at = NULL, updated_at = now() \
             WHERE slug = $1 AND deleted_at IS NOT NULL",
        )
        .bind(slug.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::LibraryNotFound(slug.to_string()));
        }
        Ok(())
    }

    pub async fn set_scan_state(&self, slug: &LibrarySlug, state: ScanState) -> DbResult<()> {
        sqlx::query("UPDATE libraries SET scan_state = $1, updated_at = now() WHERE slug = $2")
            .bind(state.as_db_str())
            .bind(slug.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Atomically claim a library for scanning: only succeeds while the
    /// library isn't already `scanning`, so two scanner workers never walk
    /// the same source root concurrently. Returns `false` if already taken.
    pub async fn try_claim_for_scan(&self, slug: &LibrarySlug) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE libraries SET scan_state = 'scanning', updated_at = now() \
             WHERE slug = $1 AND scan_state != 'scanning' AND deleted_at IS NULL",
        )
        .bind(slug.as_str())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release a library's scan claim back to `idle` once the walk
    /// finishes or aborts.
    pub async fn finish_scan(&self, slug: &LibrarySlug) -> DbResult<()> {
        sqlx::query("UPDATE libraries SET scan_state = 'idle', updated_at = now() WHERE slug = $1")
            .bind(slug.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Soft-deleted libraries, for `trash empty-all` to enumerate.
    pub async fn list_trashed(&self) -> DbResult<Vec<Library>> {
        let rows = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT slug, display_name, source_root, active, scan_state,
                   target_ai_model_id, deleted_at, created_at, updated_at
            FROM libraries
            WHERE deleted_at IS NOT NULL
            ORDER BY slug
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::LibraryNotFound(e.0))
    }

    /// Hard-delete the library row itself. Only safe to call once every
    /// asset under it has already been purged by the chunked asset delete —
    /// there is no cascading foreign key here by design, so an orphaned
    /// asset row is a loud constraint violation rather than a silent loss.
    pub async fn hard_delete(&self, slug: &LibrarySlug) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM libraries WHERE slug = $1 AND deleted_at IS NOT NULL")
            .bind(slug.as_str())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::LibraryNotFound(slug.to_string()));
        }
        Ok(())
    }

    /// Libraries whose scan has been requested (via `scan --all` or an
    /// explicit trigger) and are not currently mid-scan.
    pub async fn list_scan_requested(&self) -> DbResult<Vec<Library>> {
        let rows = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT slug, display_name, source_root, active, scan_state,
                   target_ai_model_id, deleted_at, created_at, updated_at
            FROM libraries
            WHERE scan_state = 'scan_requested' AND deleted_at IS NULL
            ORDER BY slug
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::LibraryNotFound(e.0))
    }
}
