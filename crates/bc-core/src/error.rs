//! # AppError
//!
//! Centralized error handling for the book club services.
//! Every failure a caller can observe maps onto one of these variants.

use thiserror::Error;

/// The primary error type for all bc-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Schedule, Book, Submission)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., blank title, vote on a non-candidate book)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Caller is not signed in or presented bad credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the admin / presenter / owner relationship
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., a schedule on an already confirmed date)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }
}

/// A write refused by a uniqueness constraint.
///
/// Store plugins return it inside their `anyhow::Error`; it converts into
/// [`AppError::Conflict`] instead of `Internal`.
#[derive(Error, Debug)]
#[error("already exists: {0}")]
pub struct UniqueViolation(pub String);

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<UniqueViolation>() {
            Some(dup) => AppError::Conflict(dup.to_string()),
            None => AppError::Internal(format!("{err:#}")),
        }
    }
}

/// A specialized Result type for book club logic.
pub type Result<T> = std::result::Result<T, AppError>;
