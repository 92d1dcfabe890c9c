//! `PgLedgerStore`: the PostgreSQL implementation of the ledger store traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tally_core::accounts::{Account, AccountError, NewAccount};
use tally_core::ledger::{
    EntryFilter, JournalEntry, JournalEntryWithLines, LedgerError, PostOutcome, Reversal,
    ReverseEntry, ValidatedEntry,
};
use tally_core::reports::{AccountActivity, BalanceQuery, BalanceSnapshot, ReportError};
use tally_core::store::{AccountRegistry, JournalStore, LedgerReader};
use tally_shared::types::{AccountId, EntryId, PageRequest, PageResponse, TenantId, UserId};

use crate::repositories::{AccountRepository, JournalRepository, ReportRepository};

/// Ledger store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    accounts: AccountRepository,
    journal: JournalRepository,
    reports: ReportRepository,
}

impl PgLedgerStore {
    /// Creates a store over an established connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            journal: JournalRepository::new(db.clone()),
            reports: ReportRepository::new(db),
        }
    }
}

#[async_trait]
impl AccountRegistry for PgLedgerStore {
    async fn create_account(&self, input: NewAccount) -> Result<Account, AccountError> {
        self.accounts.create_account(input).await
    }

    async fn set_parent(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<Account, AccountError> {
        self.accounts.set_parent(tenant_id, account_id, parent_id).await
    }

    async fn set_active(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        is_active: bool,
    ) -> Result<Account, AccountError> {
        self.accounts.set_active(tenant_id, account_id, is_active).await
    }

    async fn get_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        self.accounts.get_account(tenant_id, account_id).await
    }

    async fn list_accounts(&self, tenant_id: TenantId) -> Result<Vec<Account>, AccountError> {
        self.accounts.list_accounts(tenant_id).await
    }
}

#[async_trait]
impl JournalStore for PgLedgerStore {
    async fn insert_draft(&self, entry: ValidatedEntry) -> Result<JournalEntryWithLines, LedgerError> {
        self.journal.insert_draft(entry).await
    }

    async fn post(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
        posted_by: Option<UserId>,
    ) -> Result<PostOutcome, LedgerError> {
        self.journal.post(tenant_id, entry_id, posted_by).await
    }

    async fn reverse(&self, request: ReverseEntry) -> Result<Reversal, LedgerError> {
        self.journal.reverse(request).await
    }

    async fn cancel(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        self.journal.cancel(tenant_id, entry_id).await
    }

    async fn get_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        self.journal.get_entry(tenant_id, entry_id).await
    }

    async fn list_entries(
        &self,
        tenant_id: TenantId,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        self.journal.list_entries(tenant_id, filter, page).await
    }
}

#[async_trait]
impl LedgerReader for PgLedgerStore {
    async fn balance_snapshot(
        &self,
        tenant_id: TenantId,
        query: BalanceQuery,
    ) -> Result<BalanceSnapshot, ReportError> {
        self.reports.balance_snapshot(tenant_id, query).await
    }

    async fn account_activity(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        to: NaiveDate,
    ) -> Result<AccountActivity, ReportError> {
        self.reports.account_activity(tenant_id, account_id, to).await
    }
}
