use thiserror::Error;

pub use entitlement_types::ErrorCode;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found")]
    NotFound,

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthenticated => ErrorCode::Unauthenticated,
            AppError::InvalidInput(_) => ErrorCode::InvalidArgument,
            AppError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
