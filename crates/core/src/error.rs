use thiserror::Error;

/// Failures surfaced by [`crate::TaskStore`] and the reminder scheduler.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task {0} not found")]
    NotFound(i64),
    #[error("Invalid task: {0}")]
    InvalidInput(String),
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] rusqlite::Error),
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidInput(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
