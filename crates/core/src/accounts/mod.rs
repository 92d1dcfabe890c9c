//! Chart of accounts.
//!
//! This module implements the account registry rules:
//! - Account categories and their normal balance side
//! - Account records as stored by the ledger
//! - Validation for new accounts and re-parenting (tenant scoping, cycles)

pub mod error;
pub mod registry;
pub mod types;

pub use error::AccountError;
pub use registry::{normalize_code, validate_new_account, validate_parent};
pub use types::{Account, AccountType, NewAccount, NormalSide, classify};
