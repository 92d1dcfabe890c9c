//! Report repository: the read side behind the reporting engine.
//!
//! Each read runs in a `REPEATABLE READ READ ONLY` transaction, so accounts,
//! cached balances and line sums come from one snapshot. An entry's balance
//! changes and its `posted` status commit together, so a snapshot never sees
//! one without the other.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    AccessMode, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    FromQueryResult, IsolationLevel, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};
use tally_core::accounts::Account;
use tally_core::ledger::posting::AccountMovement;
use tally_core::reports::{
    AccountActivity, ActivityLine, BalanceBasis, BalanceQuery, BalanceSnapshot, ReportError,
    ReportService,
};
use tally_shared::types::{AccountId, EntryId, TenantId};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::EntryStatus as DbEntryStatus;
use crate::entities::{accounts, journal_entries};
use crate::error::report_error;

/// Per-account line sums of balance-affecting entries in a date window.
const MOVEMENTS_SQL: &str = r"
SELECT l.account_id,
       COALESCE(SUM(l.debit), 0) AS debit,
       COALESCE(SUM(l.credit), 0) AS credit
FROM journal_entry_lines l
JOIN journal_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1
  AND e.status IN ('posted', 'reversed')
  AND e.entry_date <= $2
  AND ($3::date IS NULL OR e.entry_date >= $3::date)
GROUP BY l.account_id
";

/// Lines of one account from balance-affecting entries up to a date.
const ACTIVITY_SQL: &str = r"
SELECT e.id AS entry_id,
       e.entry_number,
       e.entry_date,
       COALESCE(l.description, e.description) AS description,
       l.debit,
       l.credit
FROM journal_entry_lines l
JOIN journal_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1
  AND l.account_id = $2
  AND e.status IN ('posted', 'reversed')
  AND e.entry_date <= $3
ORDER BY e.entry_date, char_length(e.entry_number), e.entry_number, l.line_number
";

#[derive(Debug, FromQueryResult)]
struct MovementRow {
    account_id: Uuid,
    debit: Decimal,
    credit: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct ActivityRow {
    entry_id: Uuid,
    entry_number: String,
    entry_date: NaiveDate,
    description: String,
    debit: Decimal,
    credit: Decimal,
}

/// Report repository for balance snapshots and account activity.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Balances of every account of the tenant for `query`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a query fails.
    pub async fn balance_snapshot(
        &self,
        tenant_id: TenantId,
        query: BalanceQuery,
    ) -> Result<BalanceSnapshot, ReportError> {
        let txn = self.snapshot().await?;

        let accounts = Self::accounts(&txn, tenant_id).await?;
        let latest: Option<NaiveDate> = journal_entries::Entity::find()
            .select_only()
            .column(journal_entries::Column::EntryDate)
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(
                journal_entries::Column::Status
                    .is_in([DbEntryStatus::Posted, DbEntryStatus::Reversed]),
            )
            .order_by_desc(journal_entries::Column::EntryDate)
            .limit(1)
            .into_tuple()
            .one(&txn)
            .await
            .map_err(report_error)?;

        let basis = ReportService::resolve_basis(&query, latest);
        let balances = match basis {
            BalanceBasis::Cached => ReportService::cached_balances(&accounts),
            BalanceBasis::Recomputed => {
                let movements = Self::movements(&txn, tenant_id, &query).await?;
                ReportService::recomputed_balances(&accounts, &movements)
            }
        };

        txn.commit().await.map_err(report_error)?;
        Ok(BalanceSnapshot { basis, balances })
    }

    /// Lines of balance-affecting entries on one account, dated up to `to`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is not in the tenant.
    pub async fn account_activity(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        to: NaiveDate,
    ) -> Result<AccountActivity, ReportError> {
        let txn = self.snapshot().await?;

        let account: Account = accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&txn)
            .await
            .map_err(report_error)?
            .map(Account::from)
            .ok_or(ReportError::AccountNotFound(account_id))?;

        let rows = ActivityRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            ACTIVITY_SQL,
            [
                tenant_id.into_inner().into(),
                account_id.into_inner().into(),
                to.into(),
            ],
        ))
        .all(&txn)
        .await
        .map_err(report_error)?;

        txn.commit().await.map_err(report_error)?;

        let lines = rows
            .into_iter()
            .map(|row| ActivityLine {
                entry_id: EntryId::from_uuid(row.entry_id),
                entry_number: row.entry_number,
                entry_date: row.entry_date,
                description: row.description,
                debit: row.debit,
                credit: row.credit,
            })
            .collect();

        Ok(AccountActivity { account, lines })
    }

    async fn snapshot(&self) -> Result<DatabaseTransaction, ReportError> {
        self.db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await
            .map_err(report_error)
    }

    async fn accounts(
        txn: &DatabaseTransaction,
        tenant_id: TenantId,
    ) -> Result<Vec<Account>, ReportError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .all(txn)
            .await
            .map_err(report_error)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn movements(
        txn: &DatabaseTransaction,
        tenant_id: TenantId,
        query: &BalanceQuery,
    ) -> Result<BTreeMap<AccountId, AccountMovement>, ReportError> {
        let rows = MovementRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            MOVEMENTS_SQL,
            [
                tenant_id.into_inner().into(),
                query.as_of.into(),
                query.from.into(),
            ],
        ))
        .all(txn)
        .await
        .map_err(report_error)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    AccountId::from_uuid(row.account_id),
                    AccountMovement {
                        debit: row.debit,
                        credit: row.credit,
                    },
                )
            })
            .collect())
    }
}
