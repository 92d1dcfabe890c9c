//! Journal repository: entry creation, posting, reversal and cancellation.
//!
//! Every write runs in one database transaction. Posting and reversal use
//! `SERIALIZABLE` isolation, lock the entry and then the touched accounts in
//! ascending id order, and move balances with SQL-side increments. A
//! serialization failure or deadlock surfaces as `ConcurrentModification`
//! for the posting engine to retry.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::accounts::Account;
use tally_core::ledger::posting::{
    AccountMovement, PostDecision, check_postable, check_transition, input_movements,
    line_movements, plan_balance_changes,
};
use tally_core::ledger::reversal::compensating_entry;
use tally_core::ledger::sequence::numbering_year;
use tally_core::ledger::validation::validate_account;
use tally_core::ledger::{
    BalanceChange, EntryFilter, EntryStatus, JournalEntry, JournalEntryWithLines, JournalLine,
    LedgerError, NewJournalEntry, PostOutcome, Reversal, ReverseEntry, ValidatedEntry,
};
use tally_shared::types::{
    AccountId, EntryId, LineId, PageRequest, PageResponse, TenantId, UserId,
};
use tracing::{debug, error};
use uuid::Uuid;

use super::sequence::SequenceRepository;
use crate::entities::sea_orm_active_enums::EntryStatus as DbEntryStatus;
use crate::entities::{accounts, journal_entries, journal_entry_lines};
use crate::error::{is_unique_violation, ledger_error};

/// Posting details of an entry that is stored already posted.
struct PostedAt {
    by: Option<UserId>,
    at: DateTime<Utc>,
    reversal_of: EntryId,
}

/// Journal repository for entry operations.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stores a validated entry as a draft.
    ///
    /// Referenced accounts are checked (and share-locked against concurrent
    /// deactivation) before a number is drawn, so a rejected entry consumes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` for missing, foreign or inactive accounts,
    /// `DuplicateEntryNumber` if the sequence collides with a stored number,
    /// and `Storage` for database failures.
    pub async fn insert_draft(
        &self,
        entry: ValidatedEntry,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(ledger_error)?;

        let tenant_id = entry.input().tenant_id;
        let found: HashMap<AccountId, Account> = accounts::Entity::find()
            .filter(
                accounts::Column::Id
                    .is_in(entry.account_ids().into_iter().map(AccountId::into_inner)),
            )
            .order_by_asc(accounts::Column::Id)
            .lock_shared()
            .all(&txn)
            .await
            .map_err(ledger_error)?
            .into_iter()
            .map(|m| (AccountId::from_uuid(m.id), Account::from(m)))
            .collect();
        for line in &entry.input().lines {
            validate_account(tenant_id, line.account_id, found.get(&line.account_id))?;
        }

        let created = Self::insert_entry(&txn, entry.into_input(), None).await?;
        txn.commit().await.map_err(ledger_error)?;

        Ok(created)
    }

    /// Posts a draft and applies its balance changes.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `InvalidStatusTransition` for reversed or
    /// cancelled entries, `BalanceOverflow`, or `ConcurrentModification` when
    /// the transaction loses a serialization conflict.
    pub async fn post(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
        posted_by: Option<UserId>,
    ) -> Result<PostOutcome, LedgerError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(ledger_error)?;

        let header = Self::lock_entry(&txn, tenant_id, entry_id).await?;
        let lines = Self::load_lines(&txn, entry_id).await?;

        if check_postable(header.status.into())? == PostDecision::AlreadyPosted {
            txn.commit().await.map_err(ledger_error)?;
            return Ok(PostOutcome::AlreadyPosted {
                entry: JournalEntryWithLines {
                    entry: header.into(),
                    lines,
                },
            });
        }

        let current = JournalEntryWithLines {
            entry: header.clone().into(),
            lines,
        };
        let totals = current.totals().ok_or(LedgerError::AmountOverflow)?;
        if !totals.is_balanced() {
            return Err(LedgerError::UnbalancedEntry {
                debit: totals.debit,
                credit: totals.credit,
            });
        }

        let movements = line_movements(&current.lines)?;
        let changes = Self::apply_movements(&txn, tenant_id, &movements).await?;

        let now = Utc::now();
        let mut active: journal_entries::ActiveModel = header.into();
        active.status = Set(DbEntryStatus::Posted);
        active.posted_by = Set(posted_by.map(UserId::into_inner));
        active.posted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let updated = active.update(&txn).await.map_err(ledger_error)?;

        txn.commit().await.map_err(ledger_error)?;

        Ok(PostOutcome::Posted {
            entry: JournalEntryWithLines {
                entry: updated.into(),
                lines: current.lines,
            },
            changes,
        })
    }

    /// Creates and posts the compensating entry, then marks the original
    /// reversed, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `InvalidStatusTransition` unless the entry is
    /// posted, `BalanceOverflow`, or `ConcurrentModification`.
    pub async fn reverse(&self, request: ReverseEntry) -> Result<Reversal, LedgerError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(ledger_error)?;

        let header = Self::lock_entry(&txn, request.tenant_id, request.entry_id).await?;
        check_transition(header.status.into(), EntryStatus::Reversed)?;
        let original = JournalEntryWithLines {
            entry: header.clone().into(),
            lines: Self::load_lines(&txn, request.entry_id).await?,
        };

        let input = compensating_entry(&original, &request);
        let movements = input_movements(&input.lines)?;
        let changes = Self::apply_movements(&txn, request.tenant_id, &movements).await?;

        let now = Utc::now();
        let reversal = Self::insert_entry(
            &txn,
            input,
            Some(PostedAt {
                by: request.user,
                at: now,
                reversal_of: original.entry.id,
            }),
        )
        .await?;

        let mut active: journal_entries::ActiveModel = header.into();
        active.status = Set(DbEntryStatus::Reversed);
        active.reversed_by = Set(Some(reversal.entry.id.into_inner()));
        active.updated_at = Set(now.into());
        let updated = active.update(&txn).await.map_err(ledger_error)?;

        txn.commit().await.map_err(ledger_error)?;

        Ok(Reversal {
            original: JournalEntryWithLines {
                entry: updated.into(),
                lines: original.lines,
            },
            reversal,
            changes,
        })
    }

    /// Cancels a draft.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` or `InvalidStatusTransition` unless the entry
    /// is a draft.
    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(ledger_error)?;

        let header = Self::lock_entry(&txn, tenant_id, entry_id).await?;
        check_transition(header.status.into(), EntryStatus::Cancelled)?;

        let mut active: journal_entries::ActiveModel = header.into();
        active.status = Set(DbEntryStatus::Cancelled);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(ledger_error)?;
        let lines = Self::load_lines(&txn, entry_id).await?;

        txn.commit().await.map_err(ledger_error)?;

        Ok(JournalEntryWithLines {
            entry: updated.into(),
            lines,
        })
    }

    /// Loads one entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the entry is not in the tenant.
    pub async fn get_entry(
        &self,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let header = journal_entries::Entity::find_by_id(entry_id.into_inner())
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(ledger_error)?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        let lines = journal_entry_lines::Entity::find()
            .filter(journal_entry_lines::Column::EntryId.eq(entry_id.into_inner()))
            .order_by_asc(journal_entry_lines::Column::LineNumber)
            .all(&self.db)
            .await
            .map_err(ledger_error)?;

        Ok(JournalEntryWithLines {
            entry: header.into(),
            lines: lines.into_iter().map(JournalLine::from).collect(),
        })
    }

    /// Lists entry headers, newest date first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a query fails.
    pub async fn list_entries(
        &self,
        tenant_id: TenantId,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        let mut query = journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()));
        if let Some(status) = filter.status {
            query = query.filter(journal_entries::Column::Status.eq(DbEntryStatus::from(status)));
        }
        if let Some(from) = filter.from {
            query = query.filter(journal_entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(journal_entries::Column::EntryDate.lte(to));
        }

        let total = query.clone().count(&self.db).await.map_err(ledger_error)?;
        let models = query
            .order_by_desc(journal_entries::Column::EntryDate)
            // Same date means same numbering year; a longer counter is later.
            .order_by_desc(Expr::cust("char_length(journal_entries.entry_number)"))
            .order_by_desc(journal_entries::Column::EntryNumber)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(ledger_error)?;

        Ok(PageResponse::new(
            models.into_iter().map(JournalEntry::from).collect(),
            page,
            total,
        ))
    }

    /// Selects the entry of the tenant `FOR UPDATE`.
    async fn lock_entry(
        txn: &DatabaseTransaction,
        tenant_id: TenantId,
        entry_id: EntryId,
    ) -> Result<journal_entries::Model, LedgerError> {
        journal_entries::Entity::find_by_id(entry_id.into_inner())
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(ledger_error)?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    async fn load_lines(
        txn: &DatabaseTransaction,
        entry_id: EntryId,
    ) -> Result<Vec<JournalLine>, LedgerError> {
        let lines = journal_entry_lines::Entity::find()
            .filter(journal_entry_lines::Column::EntryId.eq(entry_id.into_inner()))
            .order_by_asc(journal_entry_lines::Column::LineNumber)
            .all(txn)
            .await
            .map_err(ledger_error)?;
        Ok(lines.into_iter().map(JournalLine::from).collect())
    }

    /// Locks the touched accounts in ascending id order, plans the balance
    /// changes against the locked rows and applies them as increments.
    async fn apply_movements(
        txn: &DatabaseTransaction,
        tenant_id: TenantId,
        movements: &BTreeMap<AccountId, AccountMovement>,
    ) -> Result<Vec<BalanceChange>, LedgerError> {
        let locked: HashMap<AccountId, Account> = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::Id.is_in(lock_order(movements)))
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .all(txn)
            .await
            .map_err(ledger_error)?
            .into_iter()
            .map(|m| (AccountId::from_uuid(m.id), Account::from(m)))
            .collect();

        let changes = plan_balance_changes(movements, |id| locked.get(&id))?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        for change in &changes {
            accounts::Entity::update_many()
                .col_expr(
                    accounts::Column::CurrentBalance,
                    Expr::col(accounts::Column::CurrentBalance).add(change.delta),
                )
                .col_expr(accounts::Column::UpdatedAt, Expr::value(now).into())
                .filter(accounts::Column::Id.eq(change.account_id.into_inner()))
                .exec(txn)
                .await
                .map_err(ledger_error)?;
        }

        debug!(%tenant_id, accounts = changes.len(), "balances updated");
        Ok(changes)
    }

    /// Draws a number and inserts header and lines.
    async fn insert_entry(
        txn: &DatabaseTransaction,
        input: NewJournalEntry,
        posted: Option<PostedAt>,
    ) -> Result<JournalEntryWithLines, LedgerError> {
        let number =
            SequenceRepository::allocate(txn, input.tenant_id, numbering_year(input.entry_date))
                .await?
                .to_string();

        let now = Utc::now();
        let entry_id = EntryId::new();
        let header = journal_entries::ActiveModel {
            id: Set(entry_id.into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            entry_number: Set(number.clone()),
            entry_date: Set(input.entry_date),
            description: Set(input.description),
            reference: Set(input.reference),
            status: Set(if posted.is_some() {
                DbEntryStatus::Posted
            } else {
                DbEntryStatus::Draft
            }),
            created_by: Set(input.created_by.map(UserId::into_inner)),
            posted_by: Set(posted.as_ref().and_then(|p| p.by).map(UserId::into_inner)),
            posted_at: Set(posted.as_ref().map(|p| p.at.into())),
            reversal_of: Set(posted.as_ref().map(|p| p.reversal_of.into_inner())),
            reversed_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let header = header.insert(txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                error!(tenant_id = %input.tenant_id, entry_number = %number, "sequence produced a duplicate entry number");
                LedgerError::DuplicateEntryNumber(number.clone())
            } else {
                ledger_error(e)
            }
        })?;

        let lines: Vec<JournalLine> = input
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
        let models = lines.iter().zip(1..).map(|(line, line_number)| {
            journal_entry_lines::ActiveModel {
                id: Set(line.id.into_inner()),
                entry_id: Set(entry_id.into_inner()),
                line_number: Set(line_number),
                account_id: Set(line.account_id.into_inner()),
                description: Set(line.description.clone()),
                debit: Set(line.debit),
                credit: Set(line.credit),
            }
        });
        journal_entry_lines::Entity::insert_many(models)
            .exec(txn)
            .await
            .map_err(ledger_error)?;

        Ok(JournalEntryWithLines {
            entry: header.into(),
            lines,
        })
    }
}

/// Ids of every account touched by the movements, ascending.
fn lock_order(movements: &BTreeMap<AccountId, AccountMovement>) -> Vec<Uuid> {
    movements.keys().map(|id| id.into_inner()).collect()
}
