//! Vision analyzer error types.

use mediasearch_models::ErrorClass;
use thiserror::Error;

pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vision service returned {status}: {body}")]
    BadResponse { status: u16, body: String },

    #[error("frame not found: {0}")]
    FrameNotFound(String),

    #[error("vision analyzer not configured: {0}")]
    NotConfigured(String),
}

impl VisionError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            VisionError::Request(_) | VisionError::BadResponse { .. } => ErrorClass::Transient,
            VisionError::FrameNotFound(_) => ErrorClass::Corrupt,
            VisionError::NotConfigured(_) => ErrorClass::Configuration,
        }
    }
}
