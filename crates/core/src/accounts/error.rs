//! Account registry errors.

use tally_shared::types::AccountId;
use thiserror::Error;

/// Errors raised while registering or maintaining accounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Account code is empty or too long.
    #[error("Invalid account code: {0}")]
    InvalidCode(String),

    /// Another account of the tenant already uses this code.
    #[error("Account code {0} already exists")]
    DuplicateCode(String),

    /// Account does not exist in the tenant.
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Referenced parent does not exist.
    #[error("Parent account not found: {0}")]
    ParentNotFound(AccountId),

    /// Parent belongs to another tenant.
    #[error("Parent account {0} belongs to another tenant")]
    InvalidParentTenant(AccountId),

    /// Re-parenting would make the account its own ancestor.
    #[error("Setting parent {parent_id} on account {account_id} would create a cycle")]
    CyclicParent {
        /// Account being re-parented.
        account_id: AccountId,
        /// Proposed parent.
        parent_id: AccountId,
    },

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCode(_) => "INVALID_ACCOUNT_CODE",
            Self::DuplicateCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::InvalidParentTenant(_) => "INVALID_PARENT_TENANT",
            Self::CyclicParent { .. } => "CYCLIC_PARENT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidCode(_)
            | Self::ParentNotFound(_)
            | Self::InvalidParentTenant(_)
            | Self::CyclicParent { .. } => 400,
            Self::NotFound(_) => 404,
            Self::DuplicateCode(_) => 409,
            Self::Storage(_) => 500,
        }
    }
}
