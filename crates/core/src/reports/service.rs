//! Report generation service.
//!
//! Pure folds from balances and activity into reports. Stores use the
//! balance helpers here so both backends pick the same basis and sign.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::error::ReportError;
use super::types::{
    AccountActivity, AccountBalance, AccountLedgerLine, AccountLedgerReport, BalanceBasis,
    BalanceMode, BalanceQuery, BalanceSheetReport, BalanceSnapshot, ClassifiedSection,
    EquitySection, IncomeStatementReport, StatementSection, TrialBalanceReport, TrialBalanceRow,
    TrialBalanceTotals, checked_sum,
};
use crate::accounts::{Account, AccountType, NormalSide, classify};
use crate::ledger::posting::AccountMovement;

/// Service for generating financial reports.
pub struct ReportService;

impl ReportService {
    /// Picks the balance source for a query.
    ///
    /// `latest_affecting_date` is the latest date of any posted or reversed
    /// entry of the tenant. Cached balances include every such entry, so
    /// they only answer an `Auto` query whose window covers all of them.
    #[must_use]
    pub fn resolve_basis(
        query: &BalanceQuery,
        latest_affecting_date: Option<NaiveDate>,
    ) -> BalanceBasis {
        if query.from.is_some() {
            return BalanceBasis::Recomputed;
        }
        match query.mode {
            BalanceMode::Cached => BalanceBasis::Cached,
            BalanceMode::Recomputed => BalanceBasis::Recomputed,
            BalanceMode::Auto => {
                let covers_all = latest_affecting_date.is_none_or(|d| d <= query.as_of);
                if query.as_of >= query.today && covers_all {
                    BalanceBasis::Cached
                } else {
                    BalanceBasis::Recomputed
                }
            }
        }
    }

    /// Rows from cached running balances, ordered by code.
    #[must_use]
    pub fn cached_balances(accounts: &[Account]) -> Vec<AccountBalance> {
        let mut rows: Vec<_> = accounts
            .iter()
            .map(|a| AccountBalance::of(a, a.current_balance))
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows
    }

    /// Rows from summed line movements, ordered by code.
    #[must_use]
    pub fn recomputed_balances(
        accounts: &[Account],
        movements: &BTreeMap<AccountId, AccountMovement>,
    ) -> Vec<AccountBalance> {
        let mut rows: Vec<_> = accounts
            .iter()
            .map(|a| {
                let balance = movements.get(&a.id).map_or(Decimal::ZERO, |m| {
                    classify(a.account_type).signed_change(m.debit, m.credit)
                });
                AccountBalance::of(a, balance)
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows
    }

    /// Builds a trial balance.
    ///
    /// Zero balances are omitted. A positive balance lands in the column of
    /// the account's normal side; a negative one lands in the opposite column
    /// as its absolute value and is flagged contra.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` if a column total leaves the decimal range.
    pub fn trial_balance(
        as_of: NaiveDate,
        snapshot: BalanceSnapshot,
    ) -> Result<TrialBalanceReport, ReportError> {
        let mut rows: Vec<TrialBalanceRow> = snapshot
            .balances
            .into_iter()
            .filter(|b| !b.balance.is_zero())
            .map(|b| {
                let normal = classify(b.account_type);
                let contra = b.balance.is_sign_negative();
                let side = if contra { normal.opposite() } else { normal };
                let amount = b.balance.abs();
                let (debit, credit) = match side {
                    NormalSide::Debit => (amount, Decimal::ZERO),
                    NormalSide::Credit => (Decimal::ZERO, amount),
                };
                TrialBalanceRow {
                    account_id: b.account_id,
                    code: b.code,
                    name: b.name,
                    account_type: b.account_type,
                    balance: b.balance,
                    debit,
                    credit,
                    contra,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));

        let debit = rows
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| checked_sum(acc, r.debit))?;
        let credit = rows
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| checked_sum(acc, r.credit))?;

        Ok(TrialBalanceReport {
            as_of,
            basis: snapshot.basis,
            rows,
            totals: TrialBalanceTotals {
                debit,
                credit,
                is_balanced: debit == credit,
            },
        })
    }

    /// Builds a balance sheet.
    ///
    /// Income-statement accounts are folded into `equity.current_earnings`,
    /// so assets equal liabilities plus equity for any balanced ledger.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` if a section total leaves the decimal range.
    pub fn balance_sheet(
        as_of: NaiveDate,
        snapshot: BalanceSnapshot,
    ) -> Result<BalanceSheetReport, ReportError> {
        let mut assets = ClassifiedSection::default();
        let mut liabilities = ClassifiedSection::default();
        let mut equity = EquitySection::default();
        let mut earnings = Earnings::default();

        for row in snapshot.balances {
            if row.balance.is_zero() {
                continue;
            }
            match row.account_type {
                AccountType::CurrentAsset => assets.current.push(row)?,
                AccountType::NonCurrentAsset => assets.non_current.push(row)?,
                AccountType::CurrentLiability => liabilities.current.push(row)?,
                AccountType::NonCurrentLiability => liabilities.non_current.push(row)?,
                AccountType::Equity => {
                    equity.total = checked_sum(equity.total, row.balance)?;
                    equity.accounts.push(row);
                }
                _ => earnings.add(row.account_type, row.balance)?,
            }
        }

        assets.total = checked_sum(assets.current.total, assets.non_current.total)?;
        liabilities.total = checked_sum(liabilities.current.total, liabilities.non_current.total)?;
        equity.current_earnings = earnings.net_income()?;
        equity.total = checked_sum(equity.total, equity.current_earnings)?;

        let liabilities_and_equity = checked_sum(liabilities.total, equity.total)?;

        Ok(BalanceSheetReport {
            as_of,
            basis: snapshot.basis,
            is_balanced: assets.total == liabilities_and_equity,
            assets,
            liabilities,
            equity,
            liabilities_and_equity,
        })
    }

    /// Builds an income statement.
    ///
    /// `gross_profit = revenue - cost_of_sales` and
    /// `net_income = gross_profit - expenses + other_income`, where expenses
    /// cover both operating and other expenses.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` if a subtotal leaves the decimal range.
    pub fn income_statement(
        period_start: Option<NaiveDate>,
        period_end: NaiveDate,
        snapshot: BalanceSnapshot,
    ) -> Result<IncomeStatementReport, ReportError> {
        let mut revenue = StatementSection::default();
        let mut cost_of_sales = StatementSection::default();
        let mut expenses = StatementSection::default();
        let mut other_income = StatementSection::default();

        for row in snapshot.balances {
            if row.balance.is_zero() {
                continue;
            }
            match row.account_type {
                AccountType::Revenue => revenue.push(row)?,
                AccountType::CostOfSales => cost_of_sales.push(row)?,
                AccountType::Expense | AccountType::OtherExpense => expenses.push(row)?,
                AccountType::OtherIncome => other_income.push(row)?,
                _ => {}
            }
        }

        let gross_profit = checked_sum(revenue.total, -cost_of_sales.total)?;
        let net_income = checked_sum(
            checked_sum(gross_profit, -expenses.total)?,
            other_income.total,
        )?;

        Ok(IncomeStatementReport {
            period_start,
            period_end,
            basis: snapshot.basis,
            revenue,
            cost_of_sales,
            gross_profit,
            expenses,
            other_income,
            net_income,
        })
    }

    /// Builds the general ledger of one account.
    ///
    /// Lines dated before `from` make up the opening balance; the remaining
    /// lines up to `to` carry a running balance.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` if a running or column total leaves the decimal range.
    pub fn account_ledger(
        activity: AccountActivity,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> Result<AccountLedgerReport, ReportError> {
        let side = classify(activity.account.account_type);
        let mut opening_balance = Decimal::ZERO;
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        let mut lines = Vec::new();

        for line in activity.lines.into_iter().filter(|l| l.entry_date <= to) {
            if from.is_some_and(|from| line.entry_date < from) {
                opening_balance = checked_sum(
                    opening_balance,
                    side.signed_change(line.debit, line.credit),
                )?;
                continue;
            }
            total_debit = checked_sum(total_debit, line.debit)?;
            total_credit = checked_sum(total_credit, line.credit)?;
            lines.push(line);
        }

        let mut running_balance = opening_balance;
        let lines = lines
            .into_iter()
            .map(|line| {
                running_balance =
                    checked_sum(running_balance, side.signed_change(line.debit, line.credit))?;
                Ok(AccountLedgerLine {
                    entry_id: line.entry_id,
                    entry_number: line.entry_number,
                    entry_date: line.entry_date,
                    description: line.description,
                    debit: line.debit,
                    credit: line.credit,
                    running_balance,
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        let account = activity.account;
        Ok(AccountLedgerReport {
            account_id: account.id,
            code: account.code,
            name: account.name,
            account_type: account.account_type,
            period_start: from,
            period_end: to,
            opening_balance,
            lines,
            total_debit,
            total_credit,
            closing_balance: running_balance,
        })
    }
}

/// Running net income of income-statement accounts.
#[derive(Debug, Default)]
struct Earnings {
    income: Decimal,
    costs: Decimal,
}

impl Earnings {
    fn add(&mut self, account_type: AccountType, balance: Decimal) -> Result<(), ReportError> {
        let total = match classify(account_type) {
            NormalSide::Credit => &mut self.income,
            NormalSide::Debit => &mut self.costs,
        };
        *total = checked_sum(*total, balance)?;
        Ok(())
    }

    fn net_income(&self) -> Result<Decimal, ReportError> {
        checked_sum(self.income, -self.costs)
    }
}
