//! Strict-merge vision pass shared between the image and video AI stages
//! (spec §4.5.6). A pluggable `VisionAnalyzer` is a pure function over one
//! frame path; everything here is the merge policy around it:
//!
//! 1. Re-read the row from the database immediately before writing — never
//!    decide from an in-memory copy taken before the analyzer call.
//! 2. If the row's stored model id for this mode differs from the worker's
//!    own model id, the existing fields are stale: rerun rather than skip.
//! 3. Light mode writes `description` + `tags`; full mode only adds
//!    `ocr_text` and never touches description/tags.

use mediasearch_models::AiModelId;
use mediasearch_vision::{DescribeResult, Frame, OcrResult, VisionAnalyzer};

use crate::error::WorkerResult;

/// Whether a row (asset or scene) needs the analyzer rerun for this mode,
/// given its freshly re-read state and the worker's own model id.
pub fn needs_rerun(stored_model_id: Option<AiModelId>, worker_model_id: AiModelId, has_fields: bool) -> bool {
    match stored_model_id {
        Some(stored) if stored != worker_model_id => true,
        _ => !has_fields,
    }
}

pub async fn describe(analyzer: &dyn VisionAnalyzer, frame_path: &std::path::Path) -> WorkerResult<DescribeResult> {
    let frame = Frame {
        path: frame_path.to_path_buf(),
    };
    Ok(analyzer.describe(&frame).await?)
}

pub async fn ocr(analyzer: &dyn VisionAnalyzer, frame_path: &std::path::Path) -> WorkerResult<OcrResult> {
    let frame = Frame {
        path: frame_path.to_path_buf(),
    };
    Ok(analyzer.ocr(&frame).await?)
}

/// `{"tags": [...]}`, the shape light-mode merges into `metadata`.
pub fn tags_patch(tags: &[String]) -> serde_json::Value {
    serde_json::json!({ "tags": tags })
}

/// `{"ocr_text": "..."}`, the shape full-mode merges into `metadata`.
pub fn ocr_patch(ocr_text: &str) -> serde_json::Value {
    serde_json::json!({ "ocr_text": ocr_text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerun_forced_on_model_mismatch_even_with_fields() {
        let stored = Some(AiModelId::new(1));
        let worker = AiModelId::new(2);
        assert!(needs_rerun(stored, worker, true));
    }

    #[test]
    fn no_rerun_when_model_matches_and_fields_present() {
        let stored = Some(AiModelId::new(7));
        let worker = AiModelId::new(7);
        assert!(!needs_rerun(stored, worker, true));
    }

    #[test]
    fn rerun_when_fields_missing_regardless_of_model() {
        assert!(needs_rerun(None, AiModelId::new(1), false));
    }
}
