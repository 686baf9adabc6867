//! Composite cut detector (spec §4.5.2).
//!
//! The segmenter owns exactly one open scene at a time. It never retains raw
//! frame bytes across frames: the best-frame "seed" it tracks is only a
//! `(pts, sharpness)` pair, matching what [`mediasearch_models::VideoActiveState`]
//! persists — the actual high-resolution representative frame is re-extracted
//! by [`crate::rep_frame`] from the closed scene's `rep_frame_pts` after the
//! fact, so a crash mid-segment never loses more than the current open scene.

use mediasearch_models::defaults::{DEBOUNCE_SECS, PHASH_THRESHOLD, TEMPORAL_CEILING_SECS};
use mediasearch_models::CloseReason;

use crate::phash::PHash;

#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    pub phash_threshold: u32,
    pub temporal_ceiling_secs: f64,
    pub debounce_secs: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            phash_threshold: PHASH_THRESHOLD,
            temporal_ceiling_secs: TEMPORAL_CEILING_SECS,
            debounce_secs: DEBOUNCE_SECS,
        }
    }
}

impl SegmenterConfig {
    /// An opaque encoding of the parameters that affect segmentation
    /// determinism, compared against `Asset::segmentation_version` (§4.5.5).
    pub fn version_tag(&self) -> String {
        format!(
            "phash={}:debounce={}",
            self.phash_threshold, self.debounce_secs
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BestFrameSeed {
    pub pts: f64,
    pub sharpness: f64,
}

#[derive(Debug, Clone)]
pub struct OpenScene {
    pub anchor_phash: PHash,
    pub start_ts: f64,
    pub last_cut_ts: f64,
    frames_seen: u32,
    best_frame: Option<BestFrameSeed>,
}

impl OpenScene {
    fn new(anchor_phash: PHash, start_ts: f64) -> Self {
        Self {
            anchor_phash,
            start_ts,
            last_cut_ts: start_ts,
            frames_seen: 0,
            best_frame: None,
        }
    }

    pub fn best_frame(&self) -> Option<BestFrameSeed> {
        self.best_frame
    }
}

#[derive(Debug, Clone)]
pub struct ClosedScene {
    pub start_ts: f64,
    pub end_ts: f64,
    pub rep_frame_pts: f64,
    pub sharpness: f64,
    pub close_reason: CloseReason,
}

pub struct Segmenter {
    config: SegmenterConfig,
    open: Option<OpenScene>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config, open: None }
    }

    /// Prime the segmenter from a persisted [`mediasearch_models::VideoActiveState`]
    /// row instead of starting a fresh scene (§4.5.4 resume algorithm, step 5).
    pub fn primed(
        config: SegmenterConfig,
        anchor_phash: PHash,
        scene_start_ts: f64,
        last_cut_ts: f64,
        best_frame: Option<BestFrameSeed>,
    ) -> Self {
        let frames_seen = if best_frame.is_some() { 2 } else { 0 };
        Self {
            config,
            open: Some(OpenScene {
                anchor_phash,
                start_ts: scene_start_ts,
                last_cut_ts,
                frames_seen,
                best_frame,
            }),
        }
    }

    pub fn open_scene(&self) -> Option<&OpenScene> {
        self.open.as_ref()
    }

    /// Feed one decoded frame. Returns `Some(ClosedScene)` when this frame
    /// triggers a cut; the segmenter has already opened the next scene
    /// (anchored on this same frame) by the time it returns.
    pub fn push_frame(&mut self, phash: PHash, sharpness: f64, pts: f64) -> Option<ClosedScene> {
        let open = self.open.get_or_insert_with(|| OpenScene::new(phash, pts));

        open.frames_seen += 1;

        // Skip best-frame updates for the first two frames of a scene: they
        // tend to carry transition blur or fade-in from the preceding cut.
        if open.frames_seen > 2 {
            let should_replace = match open.best_frame {
                None => true,
                Some(best) => sharpness > best.sharpness,
            };
            if should_replace {
                open.best_frame = Some(BestFrameSeed { pts, sharpness });
            }
        }

        let distance = phash.hamming(&open.anchor_phash);
        let scene_age = pts - open.start_ts;
        let since_last_cut = pts - open.last_cut_ts;

        let close_reason = if scene_age >= self.config.temporal_ceiling_secs {
            Some(CloseReason::Temporal)
        } else if distance > self.config.phash_threshold && since_last_cut >= self.config.debounce_secs {
            Some(CloseReason::Phash)
        } else {
            None
        };

        let close_reason = close_reason?;

        let closing = self.open.take().expect("open scene checked above");
        let rep = closing.best_frame.unwrap_or(BestFrameSeed { pts, sharpness });

        self.open = Some(OpenScene::new(phash, pts));

        Some(ClosedScene {
            start_ts: closing.start_ts,
            end_ts: pts,
            rep_frame_pts: rep.pts,
            sharpness: rep.sharpness,
            close_reason,
        })
    }

    /// Flush whatever scene is open at end-of-stream (§4.5.2 "End-of-stream").
    /// `source_duration` extends `end_ts` past the last observed PTS when the
    /// probed duration exceeds it, so the below-1fps tail stays searchable.
    pub fn flush(mut self, last_pts: f64, source_duration: Option<f64>) -> Option<ClosedScene> {
        let open = self.open.take()?;
        let end_ts = source_duration.map_or(last_pts, |d| d.max(last_pts));
        let rep = open.best_frame.unwrap_or(BestFrameSeed {
            pts: last_pts,
            sharpness: 0.0,
        });

        Some(ClosedScene {
            start_ts: open.start_ts,
            end_ts,
            rep_frame_pts: rep.pts,
            sharpness: rep.sharpness,
            close_reason: CloseReason::Forced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u64) -> PHash {
        PHash([byte, 0, 0, 0])
    }

    #[test]
    fn no_cut_while_frames_resemble_anchor() {
        let mut seg = Segmenter::new(SegmenterConfig::default());
        for i in 0..10 {
            let cut = seg.push_frame(hash(0), 10.0, i as f64);
            assert!(cut.is_none());
        }
    }

    #[test]
    fn phash_cut_after_debounce_elapses() {
        let mut seg = Segmenter::new(SegmenterConfig::default());
        assert!(seg.push_frame(hash(0), 10.0, 0.0).is_none());
        assert!(seg.push_frame(hash(0), 10.0, 1.0).is_none());
        // Distance is full 64 bits set on lane 0, comfortably over threshold.
        let distinct = PHash([u64::MAX, 0, 0, 0]);
        // Too soon after the scene start: no cut, despite large distance.
        assert!(seg.push_frame(distinct, 10.0, 1.5).is_none());
        let cut = seg.push_frame(distinct, 10.0, 4.0).unwrap();
        assert_eq!(cut.close_reason, CloseReason::Phash);
        assert_eq!(cut.start_ts, 0.0);
        assert_eq!(cut.end_ts, 4.0);
    }

    #[test]
    fn temporal_ceiling_forces_a_cut() {
        let mut seg = Segmenter::new(SegmenterConfig::default());
        let mut cut = None;
        for t in 0..31 {
            cut = seg.push_frame(hash(0), 10.0, t as f64);
            if cut.is_some() {
                break;
            }
        }
        let cut = cut.expect("temporal ceiling should force a cut");
        assert_eq!(cut.close_reason, CloseReason::Temporal);
    }

    #[test]
    fn best_frame_ignores_first_two_frames() {
        let mut seg = Segmenter::new(SegmenterConfig::default());
        seg.push_frame(hash(0), 999.0, 0.0);
        seg.push_frame(hash(0), 999.0, 1.0);
        seg.push_frame(hash(0), 5.0, 2.0);
        let best = seg.open_scene().unwrap().best_frame().unwrap();
        assert_eq!(best.pts, 2.0);
        assert_eq!(best.sharpness, 5.0);
    }

    #[test]
    fn flush_extends_to_source_duration() {
        let mut seg = Segmenter::new(SegmenterConfig::default());
        seg.push_frame(hash(0), 10.0, 0.0);
        seg.push_frame(hash(0), 10.0, 5.0);
        let closed = seg.flush(5.0, Some(7.5)).unwrap();
        assert_eq!(closed.end_ts, 7.5);
        assert_eq!(closed.close_reason, CloseReason::Forced);
    }

    #[test]
    fn flush_with_no_open_scene_is_none() {
        let seg = Segmenter::new(SegmenterConfig::default());
        assert!(seg.flush(0.0, None).is_none());
    }
}
