use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// No session could be established. Never retried.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Request(_) | ServiceError::Timeout(_))
    }
}
