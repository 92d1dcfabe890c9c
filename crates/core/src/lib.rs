//! Core business logic for Tally.
//!
//! This crate contains the ledger domain with ZERO web or database
//! dependencies. Storage is reached through the traits in [`store`].
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts and balance sign convention
//! - `ledger` - Journal entries, validation, sequencing and posting
//! - `reports` - Trial balance, balance sheet, income statement, account ledger
//! - `store` - Storage traits and the in-memory store

pub mod accounts;
pub mod ledger;
pub mod reports;
pub mod store;
