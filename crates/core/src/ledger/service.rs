//! Posting engine: the write side of the ledger.
//!
//! The engine owns validation that needs no storage, the retry policy for
//! conflicting posts, and the logging of state transitions. Everything that
//! must be atomic is delegated to a [`JournalStore`].

use std::sync::Arc;
use std::time::Duration;

use tally_shared::LedgerConfig;
use tally_shared::types::{EntryId, PageRequest, PageResponse, TenantId, UserId};
use tracing::{error, info, instrument, warn};

use super::error::LedgerError;
use super::types::{
    EntryFilter, InitialStatus, JournalEntry, JournalEntryWithLines, NewJournalEntry,
    PostOutcome, Reversal, ReverseEntry,
};
use super::validation::{LinePolicy, ValidatedEntry};
use crate::store::JournalStore;

/// Tunables of the posting engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingPolicy {
    /// Retries after the first attempt when a post conflicts.
    pub max_post_retries: u32,
    /// Backoff unit; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Per-line rules.
    pub lines: LinePolicy,
}

impl Default for PostingPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for PostingPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_post_retries: config.max_post_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            lines: LinePolicy {
                require_single_sided: config.require_single_sided_lines,
            },
        }
    }
}

/// Creates, posts, reverses and cancels journal entries.
pub struct PostingEngine<S: JournalStore + ?Sized> {
    store: Arc<S>,
    policy: PostingPolicy,
}

impl<S: JournalStore + ?Sized> Clone for PostingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<S: JournalStore + ?Sized> PostingEngine<S> {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, policy: PostingPolicy) -> Self {
        Self { store, policy }
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> PostingPolicy {
        self.policy
    }

    /// Creates a journal entry, optionally posting it right away.
    ///
    /// Line validation runs before the store is touched; account validation
    /// and number allocation happen inside the store's transaction. A
    /// rejected entry leaves no trace.
    ///
    /// When posting is requested and fails, the entry stays a draft and the
    /// posting error is returned.
    ///
    /// # Errors
    ///
    /// Any validation error, or a posting error when `Posted` was requested.
    #[instrument(
        skip(self, input),
        fields(tenant_id = %input.tenant_id, lines = input.lines.len())
    )]
    pub async fn create_entry(
        &self,
        input: NewJournalEntry,
        initial: InitialStatus,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let created_by = input.created_by;
        let validated = ValidatedEntry::new(input, self.policy.lines).inspect_err(|e| {
            warn!(error = %e, code = e.error_code(), "journal entry rejected");
        })?;
        let totals = validated.totals();

        let draft = self.store.insert_draft(validated).await.map_err(|e| {
            log_failure(&e, "journal entry creation failed");
            e
        })?;

        info!(
            entry_id = %draft.entry.id,
            entry_number = %draft.entry.entry_number,
            total = %totals.debit,
            "journal entry created"
        );

        match initial {
            InitialStatus::Draft => Ok(draft),
            InitialStatus::Posted => {
                let outcome = self
                    .post_entry(draft.entry.tenant_id, draft.entry.id, created_by)
                    .await?;
                Ok(outcome.into_entry())
            }
        }
    }

    /// Posts a draft entry.
    ///
    /// Posting an already posted entry succeeds with
    /// [`PostOutcome::AlreadyPosted`] and changes nothing. Conflicts with
    /// concurrent writers are retried with linear backoff.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry is not in the tenant
    /// - `InvalidStatusTransition` for cancelled or reversed entries
    /// - `UnbalancedEntry` if the stored lines do not balance
    /// - `ConcurrentModification` once retries are exhausted
    #[instrument(skip(self), fields(tenant_id = %tenant_id, entry_id = %entry_id))]
    pub async fn post_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
        posted_by: Option<UserId>,
    ) -> Result<PostOutcome, LedgerError> {
        let max_attempts = self.policy.max_post_retries.saturating_add(1);
        let mut attempt: u32 = 1;

        loop {
            match self.store.post(tenant_id, entry_id, posted_by).await {
                Ok(outcome) => {
                    log_post_outcome(&outcome, attempt);
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(attempt, max_attempts, "posting conflicted, retrying");
                    tokio::time::sleep(self.policy.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempts = attempt, "posting conflicted, giving up");
                    return Err(LedgerError::ConcurrentModification { attempts: attempt });
                }
                Err(e) => {
                    log_failure(&e, "posting failed");
                    return Err(e);
                }
            }
        }
    }

    /// Reverses a posted entry with a compensating posted entry.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry is not in the tenant
    /// - `InvalidStatusTransition` unless the entry is posted
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id, entry_id = %request.entry_id))]
    pub async fn reverse_entry(&self, request: ReverseEntry) -> Result<Reversal, LedgerError> {
        let reversal = self.store.reverse(request).await.map_err(|e| {
            log_failure(&e, "reversal failed");
            e
        })?;
        info!(
            original = %reversal.original.entry.entry_number,
            reversal = %reversal.reversal.entry.entry_number,
            accounts = reversal.changes.len(),
            "journal entry reversed"
        );
        Ok(reversal)
    }

    /// Cancels a draft entry.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry is not in the tenant
    /// - `InvalidStatusTransition` unless the entry is a draft
    #[instrument(skip(self), fields(tenant_id = %tenant_id, entry_id = %entry_id))]
    pub async fn cancel_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let entry = self.store.cancel(tenant_id, entry_id).await.map_err(|e| {
            log_failure(&e, "cancel failed");
            e
        })?;
        info!(entry_number = %entry.entry.entry_number, "journal entry cancelled");
        Ok(entry)
    }

    /// Loads one entry with its lines.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the entry is not in the tenant.
    pub async fn get_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        self.store.get_entry(tenant_id, entry_id).await
    }

    /// Lists entry headers.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn list_entries(
        &self,
        tenant_id: TenantId,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        self.store.list_entries(tenant_id, filter, page).await
    }
}

fn log_post_outcome(outcome: &PostOutcome, attempt: u32) {
    let entry = &outcome.entry().entry;
    match outcome {
        PostOutcome::Posted { changes, .. } => info!(
            entry_number = %entry.entry_number,
            accounts = changes.len(),
            attempt,
            "journal entry posted"
        ),
        PostOutcome::AlreadyPosted { .. } => info!(
            entry_number = %entry.entry_number,
            "journal entry already posted"
        ),
    }
}

fn log_failure(err: &LedgerError, message: &'static str) {
    if err.is_fatal() || err.http_status_code() >= 500 {
        error!(error = %err, code = err.error_code(), "{message}");
    } else {
        warn!(error = %err, code = err.error_code(), "{message}");
    }
}
