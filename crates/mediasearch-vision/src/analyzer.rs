//! The pluggable vision analyzer contract.
//!
//! The vision model itself is out of scope (spec §1): it is treated as a
//! pure function `frame -> {description, tags, ocr_text}`. Registration is
//! data-driven (name + version in the `AIModel` table), not via runtime
//! reflection — this trait is the only polymorphism surface.

use async_trait::async_trait;

use crate::error::VisionResult;
use crate::types::{DescribeResult, Frame, ModelCard, OcrResult};

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Light-mode pass: caption + tags.
    async fn describe(&self, frame: &Frame) -> VisionResult<DescribeResult>;

    /// Full-mode pass: OCR text only. Never overwrites description/tags.
    async fn ocr(&self, frame: &Frame) -> VisionResult<OcrResult>;

    /// Identifies this analyzer for strict-merge model-version comparison.
    fn model_card(&self) -> ModelCard;
}
