//! Wire types for the vision analyzer contract.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single frame to analyze, addressed by its path on the local cache
/// filesystem (never uploaded wholesale — the analyzer reads it itself or
/// is handed bytes by the caller depending on implementation).
#[derive(Debug, Clone)]
pub struct Frame {
    pub path: PathBuf,
}

/// Result of the light ("describe") pass: a caption plus free-form tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeResult {
    pub description: String,
    pub tags: Vec<String>,
}

/// Result of the full ("ocr") pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    pub ocr_text: String,
}

/// Identifies the analyzer backing a model row, for strict-merge comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCard {
    pub name: String,
    pub version: String,
}

impl std::fmt::Display for ModelCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
