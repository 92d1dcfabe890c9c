//! Financial report generation.
//!
//! This module provides the reporting side of the ledger:
//! - Trial Balance
//! - Balance Sheet
//! - Income Statement (cumulative or for a period)
//! - Account Ledger
//!
//! Reports are folded from a [`BalanceSnapshot`] that is either the cached
//! running balances or a recomputation from journal lines.

pub mod engine;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::{ReportClock, ReportingEngine};
pub use error::ReportError;
pub use service::ReportService;
pub use types::*;
