//! In-memory ledger store.
//!
//! All state sits behind one `RwLock`: writers (account changes, entry
//! creation, posting, reversal) take the write half, reports take the read
//! half. Every write computes its full effect before touching state, so a
//! failed operation leaves nothing behind.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{
    AccountId, EntryId, LineId, PageRequest, PageResponse, TenantId, UserId,
};
use tokio::sync::RwLock;
use tracing::error;

use super::{AccountRegistry, JournalStore, LedgerReader};
use crate::accounts::{
    Account, AccountError, NewAccount, validate_new_account, validate_parent,
};
use crate::ledger::posting::{
    PostDecision, aggregate_movements, check_postable, check_transition, input_movements,
    line_movements, plan_balance_changes,
};
use crate::ledger::reversal::compensating_entry;
use crate::ledger::sequence::{EntryNumber, InMemorySequence, numbering_year};
use crate::ledger::validation::validate_account;
use crate::ledger::{
    BalanceChange, EntryFilter, EntryStatus, JournalEntry, JournalEntryWithLines, JournalLine,
    LedgerError, NewJournalEntry, PostOutcome, Reversal, ReverseEntry, ValidatedEntry,
};
use crate::reports::{
    AccountActivity, ActivityLine, BalanceBasis, BalanceQuery, BalanceSnapshot, ReportError,
    ReportService,
};

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    entries: HashMap<EntryId, JournalEntry>,
    lines: HashMap<EntryId, Vec<JournalLine>>,
    numbers: HashSet<(TenantId, String)>,
}

impl LedgerState {
    fn account(&self, tenant_id: TenantId, account_id: AccountId) -> Option<&Account> {
        self.accounts
            .get(&account_id)
            .filter(|a| a.tenant_id == tenant_id)
    }

    fn entry(&self, tenant_id: TenantId, entry_id: EntryId) -> Result<&JournalEntry, LedgerError> {
        self.entries
            .get(&entry_id)
            .filter(|e| e.tenant_id == tenant_id)
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    fn with_lines(&self, entry: &JournalEntry) -> JournalEntryWithLines {
        JournalEntryWithLines {
            entry: entry.clone(),
            lines: self.lines.get(&entry.id).cloned().unwrap_or_default(),
        }
    }

    fn number_taken(&self, tenant_id: TenantId, number: &str) -> bool {
        self.numbers.contains(&(tenant_id, number.to_string()))
    }

    fn apply_changes(&mut self, changes: &[BalanceChange], now: DateTime<Utc>) {
        for change in changes {
            if let Some(account) = self.accounts.get_mut(&change.account_id) {
                account.current_balance = change.new_balance;
                account.updated_at = now;
            }
        }
    }

    fn affecting_entries(&self, tenant_id: TenantId) -> impl Iterator<Item = &JournalEntry> {
        self.entries
            .values()
            .filter(move |e| e.tenant_id == tenant_id && e.status.affects_balances())
    }
}

/// Ledger store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    sequence: InMemorySequence,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries (any status) stored for the tenant.
    pub async fn entry_count(&self, tenant_id: TenantId) -> usize {
        let state = self.state.read().await;
        state
            .entries
            .values()
            .filter(|e| e.tenant_id == tenant_id)
            .count()
    }

    /// Last sequence counter handed out for `(tenant_id, year)`.
    #[must_use]
    pub fn last_sequence_value(&self, tenant_id: TenantId, year: i32) -> u32 {
        self.sequence.last_value(tenant_id, year)
    }

    /// Builds header and lines for a new entry without storing them.
    fn build_entry(
        &self,
        state: &LedgerState,
        input: NewJournalEntry,
        now: DateTime<Utc>,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let number = self
            .sequence
            .allocate(input.tenant_id, numbering_year(input.entry_date))?
            .to_string();
        if state.number_taken(input.tenant_id, &number) {
            error!(tenant_id = %input.tenant_id, entry_number = %number, "sequence produced a duplicate entry number");
            return Err(LedgerError::DuplicateEntryNumber(number));
        }

        let entry_id = EntryId::new();
        let lines = input
            .lines
            .into_iter()
            .map(|line| JournalLine {
                id: LineId::new(),
                entry_id,
                account_id: line.account_id,
                description: line.description,
                debit: line.debit,
                credit: line.credit,
            })
            .collect();

        Ok(JournalEntryWithLines {
            entry: JournalEntry {
                id: entry_id,
                tenant_id: input.tenant_id,
                entry_number: number,
                entry_date: input.entry_date,
                description: input.description,
                reference: input.reference,
                status: EntryStatus::Draft,
                created_by: input.created_by,
                posted_by: None,
                posted_at: None,
                reversal_of: None,
                reversed_by: None,
                created_at: now,
                updated_at: now,
            },
            lines,
        })
    }

    fn store_entry(state: &mut LedgerState, entry: &JournalEntryWithLines) {
        state
            .numbers
            .insert((entry.entry.tenant_id, entry.entry.entry_number.clone()));
        state.lines.insert(entry.entry.id, entry.lines.clone());
        state.entries.insert(entry.entry.id, entry.entry.clone());
    }
}

#[async_trait]
impl AccountRegistry for InMemoryLedger {
    async fn create_account(&self, input: NewAccount) -> Result<Account, AccountError> {
        let mut state = self.state.write().await;

        let parent = input.parent_id.and_then(|id| state.accounts.get(&id));
        let code = validate_new_account(&input, parent)?;

        if state
            .accounts
            .values()
            .any(|a| a.tenant_id == input.tenant_id && a.code == code)
        {
            return Err(AccountError::DuplicateCode(code));
        }

        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            tenant_id: input.tenant_id,
            code,
            name: input.name.trim().to_string(),
            account_type: input.account_type,
            parent_id: input.parent_id,
            current_balance: Decimal::ZERO,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn set_parent(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<Account, AccountError> {
        let mut state = self.state.write().await;

        if state.account(tenant_id, account_id).is_none() {
            return Err(AccountError::NotFound(account_id));
        }

        if let Some(parent_id) = parent_id {
            let parent = state
                .accounts
                .get(&parent_id)
                .ok_or(AccountError::ParentNotFound(parent_id))?;
            validate_parent(tenant_id, account_id, parent, |id| {
                state.accounts.get(&id).and_then(|a| a.parent_id)
            })?;
        }

        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(AccountError::NotFound(account_id))?;
        account.parent_id = parent_id;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn set_active(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        is_active: bool,
    ) -> Result<Account, AccountError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&account_id)
            .filter(|a| a.tenant_id == tenant_id)
            .ok_or(AccountError::NotFound(account_id))?;
        account.is_active = is_active;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn get_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        let state = self.state.read().await;
        state
            .account(tenant_id, account_id)
            .cloned()
            .ok_or(AccountError::NotFound(account_id))
    }

    async fn list_accounts(&self, tenant_id: TenantId) -> Result<Vec<Account>, AccountError> {
        let state = self.state.read().await;
        let mut accounts: Vec<_> = state
            .accounts
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }
}

#[async_trait]
impl JournalStore for InMemoryLedger {
    async fn insert_draft(&self, entry: ValidatedEntry) -> Result<JournalEntryWithLines, LedgerError> {
        let mut state = self.state.write().await;

        let tenant_id = entry.input().tenant_id;
        for line in &entry.input().lines {
            validate_account(
                tenant_id,
                line.account_id,
                state.accounts.get(&line.account_id),
            )?;
        }

        let created = self.build_entry(&state, entry.into_input(), Utc::now())?;
        Self::store_entry(&mut state, &created);
        Ok(created)
    }

    async fn post(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
        posted_by: Option<UserId>,
    ) -> Result<PostOutcome, LedgerError> {
        let mut state = self.state.write().await;

        let entry = state.entry(tenant_id, entry_id)?;
        if check_postable(entry.status)? == PostDecision::AlreadyPosted {
            return Ok(PostOutcome::AlreadyPosted {
                entry: state.with_lines(entry),
            });
        }

        let current = state.with_lines(entry);
        let totals = current.totals().ok_or(LedgerError::AmountOverflow)?;
        if !totals.is_balanced() {
            return Err(LedgerError::UnbalancedEntry {
                debit: totals.debit,
                credit: totals.credit,
            });
        }

        let movements = line_movements(&current.lines)?;
        let changes = plan_balance_changes(&movements, |id| state.account(tenant_id, id))?;

        let now = Utc::now();
        state.apply_changes(&changes, now);
        let entry = state
            .entries
            .get_mut(&entry_id)
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        entry.status = EntryStatus::Posted;
        entry.posted_by = posted_by;
        entry.posted_at = Some(now);
        entry.updated_at = now;
        let entry = entry.clone();

        Ok(PostOutcome::Posted {
            entry: JournalEntryWithLines {
                entry,
                lines: current.lines,
            },
            changes,
        })
    }

    async fn reverse(&self, request: ReverseEntry) -> Result<Reversal, LedgerError> {
        let mut state = self.state.write().await;

        let original = state.with_lines(state.entry(request.tenant_id, request.entry_id)?);
        check_transition(original.entry.status, EntryStatus::Reversed)?;

        let input = compensating_entry(&original, &request);
        let movements = input_movements(&input.lines)?;
        let changes =
            plan_balance_changes(&movements, |id| state.account(request.tenant_id, id))?;

        let now = Utc::now();
        let mut reversal = self.build_entry(&state, input, now)?;
        reversal.entry.status = EntryStatus::Posted;
        reversal.entry.posted_by = request.user;
        reversal.entry.posted_at = Some(now);
        reversal.entry.reversal_of = Some(original.entry.id);

        Self::store_entry(&mut state, &reversal);
        state.apply_changes(&changes, now);

        let stored = state
            .entries
            .get_mut(&original.entry.id)
            .ok_or(LedgerError::EntryNotFound(original.entry.id))?;
        stored.status = EntryStatus::Reversed;
        stored.reversed_by = Some(reversal.entry.id);
        stored.updated_at = now;
        let original = JournalEntryWithLines {
            entry: stored.clone(),
            lines: original.lines,
        };

        Ok(Reversal {
            original,
            reversal,
            changes,
        })
    }

    async fn cancel(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let mut state = self.state.write().await;

        let status = state.entry(tenant_id, entry_id)?.status;
        check_transition(status, EntryStatus::Cancelled)?;

        let entry = state
            .entries
            .get_mut(&entry_id)
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        entry.status = EntryStatus::Cancelled;
        entry.updated_at = Utc::now();
        let entry = entry.clone();
        Ok(state.with_lines(&entry))
    }

    async fn get_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let state = self.state.read().await;
        let entry = state.entry(tenant_id, entry_id)?;
        Ok(state.with_lines(entry))
    }

    async fn list_entries(
        &self,
        tenant_id: TenantId,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        let state = self.state.read().await;
        let mut matching: Vec<_> = state
            .entries
            .values()
            .filter(|e| e.tenant_id == tenant_id && filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.entry_date
                .cmp(&a.entry_date)
                .then_with(|| EntryNumber::cmp_rendered(&b.entry_number, &a.entry_number))
        });

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let data = matching.into_iter().skip(offset).take(limit).collect();
        Ok(PageResponse::new(data, page, total))
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn balance_snapshot(
        &self,
        tenant_id: TenantId,
        query: BalanceQuery,
    ) -> Result<BalanceSnapshot, ReportError> {
        let state = self.state.read().await;

        let accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        let latest: Option<NaiveDate> = state
            .affecting_entries(tenant_id)
            .map(|e| e.entry_date)
            .max();

        let basis = ReportService::resolve_basis(&query, latest);
        let balances = match basis {
            BalanceBasis::Cached => ReportService::cached_balances(&accounts),
            BalanceBasis::Recomputed => {
                let lines = state
                    .affecting_entries(tenant_id)
                    .filter(|e| query.includes(e.entry_date))
                    .flat_map(|e| state.lines.get(&e.id).into_iter().flatten())
                    .map(|l| (l.account_id, l.debit, l.credit));
                let movements =
                    aggregate_movements(lines).map_err(|_| ReportError::AmountOverflow)?;
                ReportService::recomputed_balances(&accounts, &movements)
            }
        };

        Ok(BalanceSnapshot { basis, balances })
    }

    async fn account_activity(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        to: NaiveDate,
    ) -> Result<AccountActivity, ReportError> {
        let state = self.state.read().await;
        let account = state
            .account(tenant_id, account_id)
            .cloned()
            .ok_or(ReportError::AccountNotFound(account_id))?;

        let mut lines: Vec<ActivityLine> = state
            .affecting_entries(tenant_id)
            .filter(|e| e.entry_date <= to)
            .flat_map(|entry| {
                state
                    .lines
                    .get(&entry.id)
                    .into_iter()
                    .flatten()
                    .filter(|l| l.account_id == account_id)
                    .map(move |l| ActivityLine {
                        entry_id: entry.id,
                        entry_number: entry.entry_number.clone(),
                        entry_date: entry.entry_date,
                        description: l
                            .description
                            .clone()
                            .unwrap_or_else(|| entry.description.clone()),
                        debit: l.debit,
                        credit: l.credit,
                    })
            })
            .collect();
        lines.sort_by(|a, b| {
            a.entry_date
                .cmp(&b.entry_date)
                .then_with(|| EntryNumber::cmp_rendered(&a.entry_number, &b.entry_number))
        });

        Ok(AccountActivity { account, lines })
    }
}
