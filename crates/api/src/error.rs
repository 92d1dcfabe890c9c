//! JSON error responses.
//!
//! Every domain error is folded into [`AppError`] and rendered as
//! `{"error": CODE, "message": text}`. Server-side failures are logged and
//! returned with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::accounts::AccountError;
use tally_core::ledger::LedgerError;
use tally_core::reports::ReportError;
use tally_shared::AppError;
use tracing::error;

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// A 400 with a specific code.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self(AppError::Validation {
            code,
            message: message.into(),
        })
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(AppError::from_status(
            err.http_status_code(),
            err.error_code(),
            err.to_string(),
        ))
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        Self(AppError::from_status(
            err.http_status_code(),
            err.error_code(),
            err.to_string(),
        ))
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        Self(AppError::from_status(
            err.http_status_code(),
            err.error_code(),
            err.to_string(),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "An internal error occurred".to_string()
        } else {
            match &self.0 {
                AppError::NotFound { message, .. }
                | AppError::Validation { message, .. }
                | AppError::Conflict { message, .. } => message.clone(),
                other => other.to_string(),
            }
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}
