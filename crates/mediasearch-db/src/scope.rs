//! Composable "hidden rows" query scope.
//!
//! Soft-deleted libraries stay in the table with `deleted_at` set. Rather
//! than hide them behind an implicit global filter, every repository
//! method takes a `QueryScope` and composes the `deleted_at IS NULL`
//! predicate explicitly at the call site.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryScope {
    pub include_deleted: bool,
}

impl QueryScope {
    pub fn visible_only() -> Self {
        Self {
            include_deleted: false,
        }
    }

    pub fn with_deleted() -> Self {
        Self {
            include_deleted: true,
        }
    }

    /// The SQL fragment to append after a `WHERE` clause that already has
    /// at least one condition, e.g. `"... AND " + scope.predicate()`.
    pub fn predicate(self) -> &'static str {
        if self.include_deleted {
            "TRUE"
        } else {
            "deleted_at IS NULL"
        }
    }
}
