use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("user identity missing from request context")]
    Unauthenticated,
    #[error("user is not a manager")]
    Forbidden,
    #[error("expense not found")]
    NotFound,
    #[error("expense is not pending")]
    InvalidState,
    #[error("{0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Store(String),
    #[error("payment gateway failure: {0}")]
    Gateway(String),
    #[error("settlement channel failure: {0}")]
    Channel(String),
    #[error("wire format error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for WorkflowError {
    fn from(err: rocksdb::Error) -> Self {
        WorkflowError::Store(err.to_string())
    }
}

impl WorkflowError {
    /// True for failures a settlement consumer should redeliver. An
    /// `InvalidState` means the expense is already finalized, so a retry
    /// can never succeed and the delivery must be acknowledged instead.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WorkflowError::InvalidState)
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
