//! Double-entry bookkeeping logic.
//!
//! This module implements the write side of the ledger:
//! - Journal entry and line types, status lifecycle
//! - Line and account validation
//! - Entry number sequencing
//! - Posting rules (balance deltas, lock order)
//! - Compensating entries for reversals
//! - The posting engine tying them to a store

pub mod error;
pub mod posting;
pub mod reversal;
pub mod sequence;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use error::{InvalidAccountReason, LedgerError};
pub use sequence::{EntryNumber, EntrySequence, InMemorySequence};
pub use service::{PostingEngine, PostingPolicy};
pub use types::{
    BalanceChange, EntryFilter, EntryStatus, EntryTotals, InitialStatus, JournalEntry,
    JournalEntryWithLines, JournalLine, JournalLineInput, NewJournalEntry, PostOutcome, Reversal,
    ReverseEntry,
};
pub use validation::{LinePolicy, ValidatedEntry};
