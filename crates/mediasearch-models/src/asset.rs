//! Asset entity: one discovered media file and its pipeline state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AiModelId, AssetId, LibrarySlug, WorkerId};
use crate::status::{AssetStatus, MediaKind};

/// One discovered media file with its pipeline state.
///
/// Invariant: `(library_slug, rel_path)` is unique — this is the scanner's
/// upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub library_slug: LibrarySlug,
    /// Path relative to the library's source root.
    pub rel_path: String,
    pub kind: MediaKind,
    pub mtime: f64,
    pub size_bytes: i64,
    pub status: AssetStatus,
    pub tags_model_id: Option<AiModelId>,
    pub full_analysis_model_id: Option<AiModelId>,
    pub last_error: Option<String>,
    pub worker_id: Option<WorkerId>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// The stage currently holding the lease, if `status == Processing`.
    pub claimed_stage: Option<PipelineStage>,
    pub retry_count: i32,
    /// Relative path (under `data_dir`) to the video head-clip, if any.
    pub preview_clip_path: Option<String>,
    /// Encodes `(PHASH_THRESHOLD, DEBOUNCE_SEC)` at last segmentation.
    /// Null means "legacy", which is never invalidated automatically.
    pub segmentation_version: Option<String>,
    /// Vision pass output for image assets (videos carry this per-scene
    /// instead, on `VideoScene`). Light mode writes this and `metadata`'s
    /// `tags` key; full mode only adds `ocr_text` into `metadata`.
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// True once the asset has at least completed the light analysis pass.
    pub fn tags_model_requires_analyzed(&self) -> bool {
        self.tags_model_id.is_some()
            && !matches!(
                self.status,
                AssetStatus::AnalyzedLight | AssetStatus::Completed
            )
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lease_expires_at, Some(exp) if exp < now)
    }

    /// Whether this image asset already carries the light-pass fields.
    pub fn has_light_fields(&self) -> bool {
        self.description.is_some()
            && self
                .metadata
                .as_ref()
                .and_then(|m| m.get("tags"))
                .is_some()
    }

    pub fn has_ocr_field(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("ocr_text"))
            .is_some()
    }
}

/// A row freshly discovered by the scanner, not yet persisted.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub rel_path: String,
    pub kind: MediaKind,
    pub mtime: f64,
    pub size_bytes: i64,
}

/// The pre-claim status a stage reverts an asset to on shutdown, cancellation,
/// or lease expiry. Distinct per stage because the pipeline is a line, not a
/// single shared "in progress" bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Proxy,
    AiLight,
    AiFull,
}

impl PipelineStage {
    /// Status a `processing` asset reverts to when this stage's claim is
    /// abandoned (shutdown, crash + reclaim).
    pub fn pre_claim_status(self) -> AssetStatus {
        match self {
            PipelineStage::Proxy => AssetStatus::Pending,
            PipelineStage::AiLight => AssetStatus::Proxied,
            PipelineStage::AiFull => AssetStatus::AnalyzedLight,
        }
    }

    /// Status an asset reaches once this stage succeeds.
    pub fn success_status(self) -> AssetStatus {
        match self {
            PipelineStage::Proxy => AssetStatus::Proxied,
            PipelineStage::AiLight => AssetStatus::AnalyzedLight,
            PipelineStage::AiFull => AssetStatus::Completed,
        }
    }

    /// The statuses this stage is eligible to claim from.
    pub fn claimable_from(self) -> &'static [AssetStatus] {
        match self {
            PipelineStage::Proxy => &[AssetStatus::Pending],
            PipelineStage::AiLight => &[AssetStatus::Proxied],
            PipelineStage::AiFull => &[AssetStatus::AnalyzedLight],
        }
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            PipelineStage::Proxy => "proxy",
            PipelineStage::AiLight => "ai_light",
            PipelineStage::AiFull => "ai_full",
        }
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proxy" => Ok(PipelineStage::Proxy),
            "ai_light" => Ok(PipelineStage::AiLight),
            "ai_full" => Ok(PipelineStage::AiFull),
            other => Err(format!("unknown pipeline stage: {other}")),
        }
    }
}

pub const MAX_RETRIES: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_stage_statuses_are_consistent() {
        assert_eq!(
            PipelineStage::Proxy.pre_claim_status(),
            AssetStatus::Pending
        );
        assert_eq!(
            PipelineStage::AiLight.pre_claim_status(),
            AssetStatus::Proxied
        );
        assert_eq!(
            PipelineStage::AiFull.pre_claim_status(),
            AssetStatus::AnalyzedLight
        );
        assert_eq!(
            PipelineStage::AiFull.success_status(),
            AssetStatus::Completed
        );
    }
}
