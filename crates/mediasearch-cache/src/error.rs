//! Local derivative cache error types.

use mediasearch_models::ErrorClass;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Media(#[from] mediasearch_media::MediaError),

    #[error("source file not found: {0}")]
    SourceNotFound(std::path::PathBuf),

    #[error("data_dir is not configured or not writable: {0}")]
    DataDirUnusable(String),
}

impl CacheError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn classify(&self) -> ErrorClass {
        match self {
            CacheError::Io { .. } => ErrorClass::Transient,
            CacheError::Image(_) => ErrorClass::Corrupt,
            CacheError::Media(e) => e.classify(),
            CacheError::SourceNotFound(_) => ErrorClass::Corrupt,
            CacheError::DataDirUnusable(_) => ErrorClass::Configuration,
        }
    }
}
