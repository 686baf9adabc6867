//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use mediasearch_models::ErrorClass;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The source file is unreadable as video: zero streams, a corrupt
    /// header, or a duration ffprobe can't determine. Distinct from
    /// [`MediaError::Truncated`], which is a stream that probes fine but
    /// stops delivering frames partway through extraction.
    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    /// The pixel/PTS pipe went quiet or a seek landed past the last frame
    /// ffprobe reported — the source was cut short, likely mid-transfer.
    #[error("Video stream truncated: {0}")]
    Truncated(String),

    /// The two frame-extractor pipes (raw pixels on stdout, PTS on a side
    /// channel) fell out of lockstep — a desync, not a truncation.
    #[error("Frame/PTS streams desynchronized: {0}")]
    Desync(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn classify(&self) -> ErrorClass {
        match self {
            MediaError::FfmpegNotFound | MediaError::FfprobeNotFound => ErrorClass::Configuration,
            MediaError::FfmpegFailed { .. } | MediaError::FfprobeFailed { .. } => ErrorClass::Transient,
            MediaError::FileNotFound(_) => ErrorClass::Corrupt,
            MediaError::Cancelled => ErrorClass::Transient,
            MediaError::Timeout(_) => ErrorClass::Transient,
            MediaError::Io(_) => ErrorClass::Transient,
            MediaError::JsonParse(_) => ErrorClass::Transient,
            MediaError::InvalidVideo(_) => ErrorClass::Corrupt,
            MediaError::Truncated(_) => ErrorClass::Truncation,
            MediaError::Desync(_) => ErrorClass::Desync,
            MediaError::Internal(_) => ErrorClass::Poison,
        }
    }
}
