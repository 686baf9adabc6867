//! Library entity: a scanned media root identified by a URL-safe slug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AiModelId, LibrarySlug};
use crate::status::ScanState;

/// A registered media library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub slug: LibrarySlug,
    pub display_name: String,
    /// Absolute path to the source root. Never written to by any worker.
    pub source_root: String,
    pub active: bool,
    pub scan_state: ScanState,
    /// Overrides `system_metadata.default_ai_model_id` when set.
    pub target_ai_model_id: Option<AiModelId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields accepted when registering a new library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLibrary {
    pub slug: LibrarySlug,
    pub display_name: String,
    pub source_root: String,
    pub target_ai_model_id: Option<AiModelId>,
}
