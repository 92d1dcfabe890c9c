//! Storage seams of the ledger.
//!
//! The engines talk to persistence only through these traits. The in-memory
//! implementation lives here; the PostgreSQL one lives in `tally-db`.
//!
//! Every implementation must:
//! - run `insert_draft`, `post`, `reverse` and `cancel` atomically
//! - validate referenced accounts before allocating an entry number
//! - apply balance changes for an entry all-or-nothing
//! - answer `balance_snapshot` from one consistent snapshot

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_shared::types::{AccountId, EntryId, PageRequest, PageResponse, TenantId, UserId};

use crate::accounts::{Account, AccountError, NewAccount};
use crate::ledger::{
    EntryFilter, JournalEntry, JournalEntryWithLines, LedgerError, PostOutcome, Reversal,
    ReverseEntry, ValidatedEntry,
};
use crate::reports::{AccountActivity, BalanceQuery, BalanceSnapshot, ReportError};

pub use memory::InMemoryLedger;

/// Chart of accounts persistence.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Registers an account with a zero balance.
    async fn create_account(&self, input: NewAccount) -> Result<Account, AccountError>;

    /// Moves an account under `parent_id` (or to the top level).
    async fn set_parent(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<Account, AccountError>;

    /// Activates or deactivates an account.
    async fn set_active(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        is_active: bool,
    ) -> Result<Account, AccountError>;

    /// Loads one account of the tenant.
    async fn get_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Account, AccountError>;

    /// All accounts of the tenant, ordered by code.
    async fn list_accounts(&self, tenant_id: TenantId) -> Result<Vec<Account>, AccountError>;
}

/// Journal entry persistence and posting.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Validates the referenced accounts, allocates a number and stores the
    /// entry as a draft together with its lines.
    async fn insert_draft(&self, entry: ValidatedEntry) -> Result<JournalEntryWithLines, LedgerError>;

    /// Posts a draft and applies its balance changes.
    async fn post(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
        posted_by: Option<UserId>,
    ) -> Result<PostOutcome, LedgerError>;

    /// Creates and posts the compensating entry and marks the original
    /// reversed.
    async fn reverse(&self, request: ReverseEntry) -> Result<Reversal, LedgerError>;

    /// Cancels a draft.
    async fn cancel(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError>;

    /// Loads one entry with its lines.
    async fn get_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError>;

    /// Lists entry headers, newest date first.
    async fn list_entries(
        &self,
        tenant_id: TenantId,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError>;
}

/// Read side used by the reporting engine.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Balances of every account of the tenant, from one snapshot.
    async fn balance_snapshot(
        &self,
        tenant_id: TenantId,
        query: BalanceQuery,
    ) -> Result<BalanceSnapshot, ReportError>;

    /// Lines of balance-affecting entries on one account, dated up to `to`,
    /// in date order.
    async fn account_activity(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        to: NaiveDate,
    ) -> Result<AccountActivity, ReportError>;
}

/// Everything the HTTP service needs from one backend.
pub trait LedgerStore: AccountRegistry + JournalStore + LedgerReader {}

impl<T> LedgerStore for T where T: AccountRegistry + JournalStore + LedgerReader {}
