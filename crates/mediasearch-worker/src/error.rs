//! Worker error types, aggregating every crate a stage touches into one
//! enum with a single `classify()` dispatch point (spec §7).

use thiserror::Error;

use mediasearch_cache::CacheError;
use mediasearch_db::DbError;
use mediasearch_media::MediaError;
use mediasearch_models::ErrorClass;
use mediasearch_queue::QueueError;
use mediasearch_vision::VisionError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scanner walk failed at {path}: {source}")]
    Walk {
        path: std::path::PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("worker was asked to stop mid-unit")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WorkerError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            WorkerError::Db(e) => e.classify(),
            WorkerError::Queue(e) => e.classify(),
            WorkerError::Cache(e) => e.classify(),
            WorkerError::Media(e) => e.classify(),
            WorkerError::Vision(e) => e.classify(),
            WorkerError::Io(_) => ErrorClass::Transient,
            WorkerError::Walk { .. } => ErrorClass::Transient,
            WorkerError::Cancelled => ErrorClass::Transient,
            WorkerError::Configuration(_) => ErrorClass::Configuration,
        }
    }
}
