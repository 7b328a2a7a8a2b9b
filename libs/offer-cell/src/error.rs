use thiserror::Error;

use shared_models::AppError;
use waitlist_cell::WaitlistError;

#[derive(Error, Debug)]
pub enum OfferError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Waitlist error: {0}")]
    Waitlist(#[from] WaitlistError),
}

impl From<OfferError> for AppError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::NotFound(msg) => AppError::NotFound(msg),
            OfferError::InvalidInput(msg) => AppError::BadRequest(msg),
            OfferError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            OfferError::Waitlist(inner) => inner.into(),
        }
    }
}
