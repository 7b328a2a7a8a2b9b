use thiserror::Error;

use shared_models::AppError;

#[derive(Error, Debug)]
pub enum WaitlistError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),
}

impl From<WaitlistError> for AppError {
    fn from(err: WaitlistError) -> Self {
        match err {
            WaitlistError::NotFound(msg) => AppError::NotFound(msg),
            WaitlistError::Validation(msg) => AppError::ValidationError(msg),
            WaitlistError::DuplicateEntry(msg) => AppError::BadRequest(msg),
        }
    }
}
