use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unsupported image type")]
    UnsupportedMediaType,
    #[error("Invalid image content: {0}")]
    InvalidImage(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    MalformedRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Model not found at: {0}")]
    NotFound(String),
    #[error("Model load error: {0}")]
    ModelLoad(String),
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
