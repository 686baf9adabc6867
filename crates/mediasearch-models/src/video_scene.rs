//! VideoScene and VideoActiveState entities for the resumable scene engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AssetId, VideoSceneId};
use crate::status::CloseReason;

/// One closed, contiguous `[start_ts, end_ts)` span of a video.
///
/// Scenes for a given asset never overlap and are totally ordered by
/// `start_ts` (equivalently by `end_ts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScene {
    pub id: VideoSceneId,
    pub asset_id: AssetId,
    pub start_ts: f64,
    pub end_ts: f64,
    /// Relative path (under `data_dir`) to the high-resolution representative
    /// frame JPEG.
    pub rep_frame_path: String,
    pub sharpness: f64,
    pub close_reason: CloseReason,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl VideoScene {
    pub fn duration(&self) -> f64 {
        self.end_ts - self.start_ts
    }

    /// Whether this scene already carries the fields the vision pass is
    /// responsible for, given the requested mode.
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

/// Two scenes never overlap: `a.end_ts <= b.start_ts` or vice versa.
pub fn scenes_are_disjoint_and_ordered(scenes: &[VideoScene]) -> bool {
    scenes
        .windows(2)
        .all(|w| w[0].end_ts <= w[1].start_ts && w[0].start_ts <= w[1].start_ts)
}

/// At most one row per asset currently mid-segmentation. Deleted on
/// successful completion or invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoActiveState {
    pub asset_id: AssetId,
    /// 256-bit perceptual hash of the anchor frame, hex-encoded (64 chars).
    pub anchor_phash: String,
    pub scene_start_ts: f64,
    /// Best frame seen so far in the open scene; absent until 2 frames have
    /// been consumed into the scene (transition blur/fade-in skip).
    pub best_frame_ts: Option<f64>,
    pub best_frame_sharpness: Option<f64>,
    pub last_cut_ts: f64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AssetId;

    fn scene(start: f64, end: f64) -> VideoScene {
        VideoScene {
            id: VideoSceneId(1),
            asset_id: AssetId(1),
            start_ts: start,
            end_ts: end,
            rep_frame_path: String::new(),
            sharpness: 0.0,
            close_reason: CloseReason::Temporal,
            description: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn disjoint_ordered_scenes_pass() {
        let scenes = vec![scene(0.0, 10.0), scene(10.0, 40.0), scene(40.0, 70.0)];
        assert!(scenes_are_disjoint_and_ordered(&scenes));
    }

    #[test]
    fn overlapping_scenes_fail() {
        let scenes = vec![scene(0.0, 10.0), scene(9.0, 40.0)];
        assert!(!scenes_are_disjoint_and_ordered(&scenes));
    }
}
