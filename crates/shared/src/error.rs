//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Domain errors from the ledger crates are translated into this envelope at
/// the HTTP boundary, keeping their machine-readable code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Conflict (state transition refused, concurrent modification).
    #[error("Conflict: {message}")]
    Conflict {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Storage error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates a validation error with the generic code.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    /// Builds the envelope matching an HTTP status code.
    pub fn from_status(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::Validation { code, message },
            404 => Self::NotFound { code, message },
            409 => Self::Conflict { code, message },
            _ => Self::Internal(message),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { code, .. }
            | Self::Validation { code, .. }
            | Self::Conflict { code, .. } => *code,
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
