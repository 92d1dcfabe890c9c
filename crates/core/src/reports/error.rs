//! Report error types.

use chrono::NaiveDate;
use tally_shared::types::AccountId;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// A report total exceeded the decimal range.
    #[error("Report totals exceed the supported range")]
    AmountOverflow,

    /// Configured reporting time zone is unknown.
    #[error("Unknown time zone: {0}")]
    InvalidTimezone(String),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::InvalidTimezone(_) => "INVALID_TIMEZONE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) => 404,
            Self::InvalidDateRange { .. } | Self::AmountOverflow => 400,
            Self::InvalidTimezone(_) | Self::Storage(_) => 500,
        }
    }
}
