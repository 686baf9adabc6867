//! Pluggable vision analyzer client.
//!
//! The vision model is a dynamic-dispatch collaborator (spec §9): analyzers
//! are polymorphic over `describe`/`ocr`/`model_card`, registered in the
//! `AIModel` table by name and version rather than through reflection.

pub mod analyzer;
pub mod error;
pub mod http;
pub mod mock;
pub mod types;

pub use analyzer::VisionAnalyzer;
pub use error::{VisionError, VisionResult};
pub use http::{HttpVisionAnalyzer, HttpVisionConfig};
pub use mock::MockVisionAnalyzer;
pub use types::{DescribeResult, Frame, ModelCard, OcrResult};
