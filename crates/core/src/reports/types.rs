//! Report data types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId};

use super::error::ReportError;
use crate::accounts::{Account, AccountType};

/// Which balance source a report should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMode {
    /// Cached balances when they are provably current, otherwise recompute.
    #[default]
    Auto,
    /// Always read cached running balances.
    Cached,
    /// Always recompute from journal lines.
    Recomputed,
}

impl FromStr for BalanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cached" => Ok(Self::Cached),
            "recomputed" => Ok(Self::Recomputed),
            other => Err(format!("unknown balance mode: {other}")),
        }
    }
}

/// The balance source a report actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceBasis {
    /// Cached running balances.
    Cached,
    /// Sums over journal lines.
    Recomputed,
}

impl fmt::Display for BalanceBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cached => "cached",
            Self::Recomputed => "recomputed",
        })
    }
}

/// What balances a store should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceQuery {
    /// Last date included.
    pub as_of: NaiveDate,
    /// First date included; set for period movements, which are always
    /// recomputed.
    pub from: Option<NaiveDate>,
    /// Current date in the reporting time zone.
    pub today: NaiveDate,
    /// Requested source.
    pub mode: BalanceMode,
}

impl BalanceQuery {
    /// Cumulative balances up to `as_of`.
    #[must_use]
    pub const fn as_of(as_of: NaiveDate, today: NaiveDate, mode: BalanceMode) -> Self {
        Self {
            as_of,
            from: None,
            today,
            mode,
        }
    }

    /// Movements within `[from, to]`.
    #[must_use]
    pub const fn period(from: NaiveDate, to: NaiveDate, today: NaiveDate) -> Self {
        Self {
            as_of: to,
            from: Some(from),
            today,
            mode: BalanceMode::Recomputed,
        }
    }

    /// True if a line dated `date` falls inside the query window.
    #[must_use]
    pub fn includes(&self, date: NaiveDate) -> bool {
        date <= self.as_of && self.from.is_none_or(|from| date >= from)
    }
}

/// Balance of one account, signed in its normal direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Net balance; negative means contra-normal.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Builds a row for `account` with the given balance.
    #[must_use]
    pub fn of(account: &Account, balance: Decimal) -> Self {
        Self {
            account_id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            account_type: account.account_type,
            balance,
        }
    }
}

/// Balances of every account of a tenant, from one consistent read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Source used.
    pub basis: BalanceBasis,
    /// One row per account, ordered by code.
    pub balances: Vec<AccountBalance>,
}

/// A line of a balance-affecting entry on one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLine {
    /// Entry ID.
    pub entry_id: EntryId,
    /// Entry number.
    pub entry_number: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Line memo, falling back to the entry description.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

/// An account with its activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountActivity {
    /// The account.
    pub account: Account,
    /// Lines ordered by entry date, then entry number.
    pub lines: Vec<ActivityLine>,
}

/// Trial balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Signed net balance.
    pub balance: Decimal,
    /// Debit column.
    pub debit: Decimal,
    /// Credit column.
    pub credit: Decimal,
    /// Balance sits on the side opposite to the account's normal side.
    pub contra: bool,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub debit: Decimal,
    /// Total credit.
    pub credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// As of date.
    pub as_of: NaiveDate,
    /// Balance source.
    pub basis: BalanceBasis,
    /// Non-zero accounts, by code.
    pub rows: Vec<TrialBalanceRow>,
    /// Totals.
    pub totals: TrialBalanceTotals,
}

/// A list of accounts with their sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSection {
    /// Accounts in this section.
    pub accounts: Vec<AccountBalance>,
    /// Section total.
    pub total: Decimal,
}

impl StatementSection {
    pub(crate) fn push(&mut self, row: AccountBalance) -> Result<(), ReportError> {
        self.total = checked_sum(self.total, row.balance)?;
        self.accounts.push(row);
        Ok(())
    }
}

/// `a + b`, or `AmountOverflow` outside the decimal range.
pub(crate) fn checked_sum(a: Decimal, b: Decimal) -> Result<Decimal, ReportError> {
    a.checked_add(b).ok_or(ReportError::AmountOverflow)
}

/// Balance sheet section split by maturity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSection {
    /// Current portion.
    pub current: StatementSection,
    /// Non-current portion.
    pub non_current: StatementSection,
    /// Sum of both.
    pub total: Decimal,
}

/// Equity section of the balance sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquitySection {
    /// Equity accounts.
    pub accounts: Vec<AccountBalance>,
    /// Net income of income-statement accounts not yet closed to equity.
    pub current_earnings: Decimal,
    /// Equity accounts plus current earnings.
    pub total: Decimal,
}

/// Balance sheet report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheetReport {
    /// As of date.
    pub as_of: NaiveDate,
    /// Balance source.
    pub basis: BalanceBasis,
    /// Assets.
    pub assets: ClassifiedSection,
    /// Liabilities.
    pub liabilities: ClassifiedSection,
    /// Equity.
    pub equity: EquitySection,
    /// Liabilities plus equity.
    pub liabilities_and_equity: Decimal,
    /// Whether assets equal liabilities plus equity.
    pub is_balanced: bool,
}

/// Income statement report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeStatementReport {
    /// Period start; `None` means since inception.
    pub period_start: Option<NaiveDate>,
    /// Period end.
    pub period_end: NaiveDate,
    /// Balance source.
    pub basis: BalanceBasis,
    /// Revenue.
    pub revenue: StatementSection,
    /// Cost of sales.
    pub cost_of_sales: StatementSection,
    /// Revenue minus cost of sales.
    pub gross_profit: Decimal,
    /// Operating and other expenses.
    pub expenses: StatementSection,
    /// Other income.
    pub other_income: StatementSection,
    /// Gross profit minus expenses plus other income.
    pub net_income: Decimal,
}

/// General ledger line with running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedgerLine {
    /// Entry ID.
    pub entry_id: EntryId,
    /// Entry number.
    pub entry_number: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Balance after this line.
    pub running_balance: Decimal,
}

/// General ledger of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedgerReport {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Period start; `None` means since inception.
    pub period_start: Option<NaiveDate>,
    /// Period end.
    pub period_end: NaiveDate,
    /// Balance before the period.
    pub opening_balance: Decimal,
    /// Lines within the period.
    pub lines: Vec<AccountLedgerLine>,
    /// Sum of debits within the period.
    pub total_debit: Decimal,
    /// Sum of credits within the period.
    pub total_credit: Decimal,
    /// Balance at the end of the period.
    pub closing_balance: Decimal,
}
