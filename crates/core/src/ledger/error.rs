//! Ledger error types for validation, state and concurrency errors.
//!
//! Every variant carries a machine-readable code and an HTTP status so the
//! API layer can translate it without knowing ledger internals.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId};
use thiserror::Error;

use super::types::EntryStatus;

/// Why a referenced account cannot take a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidAccountReason {
    /// No such account.
    Missing,
    /// Account belongs to another tenant.
    WrongTenant,
    /// Account is deactivated.
    Inactive,
}

impl fmt::Display for InvalidAccountReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "does not exist",
            Self::WrongTenant => "belongs to another tenant",
            Self::Inactive => "is inactive",
        })
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry has no lines.
    #[error("Journal entry must have at least one line")]
    EmptyEntry,

    /// A line carries a negative debit or credit.
    #[error("Line {line} has a negative amount")]
    NegativeAmount {
        /// Zero-based line index.
        line: usize,
    },

    /// A line carries both a debit and a credit, or neither.
    #[error("Line {line} must carry exactly one of debit or credit")]
    InvalidLine {
        /// Zero-based line index.
        line: usize,
    },

    /// Summing the lines exceeded the decimal range.
    #[error("Line amounts exceed the supported range")]
    AmountOverflow,

    /// Total debits differ from total credits.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Sum of debits.
        debit: Decimal,
        /// Sum of credits.
        credit: Decimal,
    },

    /// A line references an account that cannot be used.
    #[error("Account {account_id} {reason}")]
    InvalidAccount {
        /// Offending account.
        account_id: AccountId,
        /// What is wrong with it.
        reason: InvalidAccountReason,
    },

    // ========== State Errors ==========
    /// Entry not found in the tenant.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Requested status change is not allowed.
    #[error("Cannot move journal entry from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: EntryStatus,
        /// Requested status.
        to: EntryStatus,
    },

    // ========== Concurrency Errors ==========
    /// A conflicting writer won; the post may be retried.
    #[error("Concurrent modification detected after {attempts} attempt(s)")]
    ConcurrentModification {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Sequence produced a number that already exists.
    #[error("Duplicate entry number generated: {0}")]
    DuplicateEntryNumber(String),

    /// Applying a posting would overflow an account balance.
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(AccountId),

    // ========== Storage Errors ==========
    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyEntry => "EMPTY_ENTRY",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::InvalidAccount { .. } => "INVALID_ACCOUNT",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::DuplicateEntryNumber(_) => "DUPLICATE_ENTRY_NUMBER",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller can fix the input
            Self::EmptyEntry
            | Self::NegativeAmount { .. }
            | Self::InvalidLine { .. }
            | Self::AmountOverflow
            | Self::UnbalancedEntry { .. }
            | Self::InvalidAccount { .. } => 400,

            // 404 Not Found
            Self::EntryNotFound(_) => 404,

            // 409 Conflict
            Self::InvalidStatusTransition { .. } | Self::ConcurrentModification { .. } => 409,

            // 500 Internal Server Error
            Self::DuplicateEntryNumber(_) | Self::BalanceOverflow(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns true if repeating the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Returns true for errors that indicate a bug or corrupted state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateEntryNumber(_) | Self::BalanceOverflow(_))
    }
}
