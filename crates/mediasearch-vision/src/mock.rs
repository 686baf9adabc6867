//! Deterministic mock analyzer for tests and local development.
//!
//! Gated in production by `MEDIASEARCH_ALLOW_MOCK_DEFAULT=1` (spec §6.3) —
//! callers wiring up the system default model are expected to check that
//! env var themselves before registering this analyzer.

use async_trait::async_trait;

use crate::analyzer::VisionAnalyzer;
use crate::error::VisionResult;
use crate::types::{DescribeResult, Frame, ModelCard, OcrResult};

pub struct MockVisionAnalyzer {
    model_card: ModelCard,
}

impl MockVisionAnalyzer {
    pub fn new() -> Self {
        Self {
            model_card: ModelCard {
                name: "mock-vision".to_string(),
                version: "0".to_string(),
            },
        }
    }

    /// True when the environment permits the mock analyzer to stand in as
    /// the system default (tests only).
    pub fn allowed_as_default() -> bool {
        std::env::var("MEDIASEARCH_ALLOW_MOCK_DEFAULT")
            .map(|v| v == "1")
            .unwrap_or(false)
    }
}

impl Default for MockVisionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionAnalyzer for MockVisionAnalyzer {
    async fn describe(&self, frame: &Frame) -> VisionResult<DescribeResult> {
        let stem = frame
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame");
        Ok(DescribeResult {
            description: format!("mock description for {stem}"),
            tags: vec!["mock".to_string()],
        })
    }

    async fn ocr(&self, _frame: &Frame) -> VisionResult<OcrResult> {
        Ok(OcrResult {
            ocr_text: String::new(),
        })
    }

    fn model_card(&self) -> ModelCard {
        self.model_card.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_describe_is_deterministic() {
        let analyzer = MockVisionAnalyzer::new();
        let frame = Frame {
            path: "scenes/10_40.jpg".into(),
        };
        let a = analyzer.describe(&frame).await.unwrap();
        let b = analyzer.describe(&frame).await.unwrap();
        assert_eq!(a.description, b.description);
        assert_eq!(a.tags, b.tags);
    }
}
