//! Reporting engine: reads a snapshot through [`LedgerReader`] and folds it
//! with [`ReportService`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tally_shared::types::{AccountId, TenantId};
use tracing::{debug, instrument};

use super::error::ReportError;
use super::service::ReportService;
use super::types::{
    AccountLedgerReport, BalanceMode, BalanceQuery, BalanceSheetReport, IncomeStatementReport,
    TrialBalanceReport,
};
use crate::store::LedgerReader;

/// Source of "today" for report basis selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportClock {
    /// Wall clock in a time zone.
    System(Tz),
    /// Pinned date, for tests and replays.
    Fixed(NaiveDate),
}

impl ReportClock {
    /// Wall clock in the named IANA time zone.
    ///
    /// # Errors
    ///
    /// `InvalidTimezone` if the name is unknown.
    pub fn from_timezone(name: &str) -> Result<Self, ReportError> {
        name.parse::<Tz>()
            .map(Self::System)
            .map_err(|_| ReportError::InvalidTimezone(name.to_string()))
    }

    /// Current date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System(tz) => Utc::now().with_timezone(tz).date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

impl Default for ReportClock {
    fn default() -> Self {
        Self::System(Tz::UTC)
    }
}

/// Produces reports for a tenant.
pub struct ReportingEngine<R: LedgerReader + ?Sized> {
    reader: Arc<R>,
    clock: ReportClock,
}

impl<R: LedgerReader + ?Sized> Clone for ReportingEngine<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            clock: self.clock,
        }
    }
}

impl<R: LedgerReader + ?Sized> ReportingEngine<R> {
    /// Creates an engine over `reader`.
    #[must_use]
    pub fn new(reader: Arc<R>, clock: ReportClock) -> Self {
        Self { reader, clock }
    }

    /// Today according to the engine clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Trial balance as of `as_of`, choosing the balance source automatically.
    ///
    /// # Errors
    ///
    /// - `AmountOverflow` if a total leaves the decimal range
    /// - `Storage` if the snapshot cannot be read
    pub async fn trial_balance(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<TrialBalanceReport, ReportError> {
        self.trial_balance_with(tenant_id, as_of, BalanceMode::Auto)
            .await
    }

    /// Trial balance with an explicit balance source.
    ///
    /// # Errors
    ///
    /// - `AmountOverflow` if a total leaves the decimal range
    /// - `Storage` if the snapshot cannot be read
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn trial_balance_with(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        mode: BalanceMode,
    ) -> Result<TrialBalanceReport, ReportError> {
        let query = BalanceQuery::as_of(as_of, self.today(), mode);
        let snapshot = self.reader.balance_snapshot(tenant_id, query).await?;
        debug!(basis = %snapshot.basis, "trial balance snapshot read");
        ReportService::trial_balance(as_of, snapshot)
    }

    /// Balance sheet as of `as_of`.
    ///
    /// # Errors
    ///
    /// - `AmountOverflow` if a total leaves the decimal range
    /// - `Storage` if the snapshot cannot be read
    pub async fn balance_sheet(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<BalanceSheetReport, ReportError> {
        self.balance_sheet_with(tenant_id, as_of, BalanceMode::Auto)
            .await
    }

    /// Balance sheet with an explicit balance source.
    ///
    /// # Errors
    ///
    /// - `AmountOverflow` if a total leaves the decimal range
    /// - `Storage` if the snapshot cannot be read
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn balance_sheet_with(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        mode: BalanceMode,
    ) -> Result<BalanceSheetReport, ReportError> {
        let query = BalanceQuery::as_of(as_of, self.today(), mode);
        let snapshot = self.reader.balance_snapshot(tenant_id, query).await?;
        debug!(basis = %snapshot.basis, "balance sheet snapshot read");
        ReportService::balance_sheet(as_of, snapshot)
    }

    /// Income statement from inception up to `as_of`.
    ///
    /// # Errors
    ///
    /// - `AmountOverflow` if a total leaves the decimal range
    /// - `Storage` if the snapshot cannot be read
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn income_statement(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<IncomeStatementReport, ReportError> {
        let query = BalanceQuery::as_of(as_of, self.today(), BalanceMode::Auto);
        let snapshot = self.reader.balance_snapshot(tenant_id, query).await?;
        ReportService::income_statement(None, as_of, snapshot)
    }

    /// Income statement for entries dated within `[from, to]`.
    ///
    /// # Errors
    ///
    /// - `InvalidDateRange` if `from > to`
    /// - `AmountOverflow` if a total leaves the decimal range
    /// - `Storage` if the snapshot cannot be read
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn income_statement_for_period(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<IncomeStatementReport, ReportError> {
        if from > to {
            return Err(ReportError::InvalidDateRange {
                start: from,
                end: to,
            });
        }
        let query = BalanceQuery::period(from, to, self.today());
        let snapshot = self.reader.balance_snapshot(tenant_id, query).await?;
        ReportService::income_statement(Some(from), to, snapshot)
    }

    /// General ledger of one account.
    ///
    /// `to` defaults to today.
    ///
    /// # Errors
    ///
    /// - `InvalidDateRange` if `from > to`
    /// - `AccountNotFound` if the account is not in the tenant
    /// - `AmountOverflow` if a running total leaves the decimal range
    #[instrument(skip(self), fields(tenant_id = %tenant_id, account_id = %account_id))]
    pub async fn account_ledger(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AccountLedgerReport, ReportError> {
        let to = to.unwrap_or_else(|| self.today());
        if let Some(start) = from.filter(|&f| f > to) {
            return Err(ReportError::InvalidDateRange { start, end: to });
        }
        let activity = self
            .reader
            .account_activity(tenant_id, account_id, to)
            .await?;
        ReportService::account_ledger(activity, from, to)
    }
}
