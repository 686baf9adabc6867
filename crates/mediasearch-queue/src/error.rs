//! Queue engine error types.

use mediasearch_db::DbError;
use mediasearch_models::ErrorClass;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Db(#[from] DbError),
}

impl QueueError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            QueueError::Db(e) => e.classify(),
        }
    }
}
