//! Account categories and records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, TenantId};

/// The side on which an account's balance grows.
///
/// - Debit-normal: assets, cost of sales, expenses, other expenses
/// - Credit-normal: liabilities, equity, revenue, other income
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalSide {
    /// Balance increases with debits.
    Debit,
    /// Balance increases with credits.
    Credit,
}

impl NormalSide {
    /// Signed effect of a debit/credit pair on a balance kept on this side.
    #[must_use]
    pub fn signed_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// Account category. Immutable once the account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Long-lived assets (property, equipment, intangibles).
    #[serde(rename = "asset_non_current")]
    NonCurrentAsset,
    /// Cash, receivables, inventory.
    #[serde(rename = "asset_current", alias = "asset")]
    CurrentAsset,
    /// Obligations due after twelve months.
    #[serde(rename = "liability_non_current")]
    NonCurrentLiability,
    /// Obligations due within twelve months.
    #[serde(rename = "liability_current", alias = "liability")]
    CurrentLiability,
    /// Owner's equity and retained earnings.
    #[serde(rename = "equity")]
    Equity,
    /// Operating revenue.
    #[serde(rename = "revenue")]
    Revenue,
    /// Direct cost of goods or services sold.
    #[serde(rename = "cost_of_sales")]
    CostOfSales,
    /// Operating expenses.
    #[serde(rename = "expense")]
    Expense,
    /// Non-operating income.
    #[serde(rename = "other_income")]
    OtherIncome,
    /// Non-operating expenses.
    #[serde(rename = "other_expense")]
    OtherExpense,
}

/// The normal balance side of an account type.
///
/// Every balance computation (posting, historical recomputation, reports)
/// goes through this function.
#[must_use]
pub const fn classify(account_type: AccountType) -> NormalSide {
    match account_type {
        AccountType::NonCurrentAsset
        | AccountType::CurrentAsset
        | AccountType::CostOfSales
        | AccountType::Expense
        | AccountType::OtherExpense => NormalSide::Debit,
        AccountType::NonCurrentLiability
        | AccountType::CurrentLiability
        | AccountType::Equity
        | AccountType::Revenue
        | AccountType::OtherIncome => NormalSide::Credit,
    }
}

impl AccountType {
    /// All account types, in chart order.
    pub const ALL: [Self; 10] = [
        Self::NonCurrentAsset,
        Self::CurrentAsset,
        Self::NonCurrentLiability,
        Self::CurrentLiability,
        Self::Equity,
        Self::Revenue,
        Self::CostOfSales,
        Self::Expense,
        Self::OtherIncome,
        Self::OtherExpense,
    ];

    /// Canonical storage/wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonCurrentAsset => "asset_non_current",
            Self::CurrentAsset => "asset_current",
            Self::NonCurrentLiability => "liability_non_current",
            Self::CurrentLiability => "liability_current",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::CostOfSales => "cost_of_sales",
            Self::Expense => "expense",
            Self::OtherIncome => "other_income",
            Self::OtherExpense => "other_expense",
        }
    }

    /// Normal balance side, see [`classify`].
    #[must_use]
    pub const fn normal_side(self) -> NormalSide {
        classify(self)
    }

    /// True for accounts reported on the balance sheet.
    #[must_use]
    pub const fn is_balance_sheet(self) -> bool {
        matches!(
            self,
            Self::NonCurrentAsset
                | Self::CurrentAsset
                | Self::NonCurrentLiability
                | Self::CurrentLiability
                | Self::Equity
        )
    }

    /// True for accounts reported on the income statement.
    #[must_use]
    pub const fn is_income_statement(self) -> bool {
        !self.is_balance_sheet()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset_non_current" => Ok(Self::NonCurrentAsset),
            "asset_current" | "asset" => Ok(Self::CurrentAsset),
            "liability_non_current" => Ok(Self::NonCurrentLiability),
            "liability_current" | "liability" => Ok(Self::CurrentLiability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "cost_of_sales" => Ok(Self::CostOfSales),
            "expense" => Ok(Self::Expense),
            "other_income" => Ok(Self::OtherIncome),
            "other_expense" => Ok(Self::OtherExpense),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// A chart of accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Code, unique within the tenant.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Category; fixes the normal side.
    pub account_type: AccountType,
    /// Parent in the chart hierarchy (same tenant).
    pub parent_id: Option<AccountId>,
    /// Cached running balance, maintained by posting only.
    pub current_balance: Decimal,
    /// Inactive accounts cannot receive new lines.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Normal balance side of this account.
    #[must_use]
    pub const fn normal_side(&self) -> NormalSide {
        classify(self.account_type)
    }
}

/// Input for registering an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Code, unique within the tenant.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Category.
    pub account_type: AccountType,
    /// Optional parent account.
    pub parent_id: Option<AccountId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AccountType::NonCurrentAsset, NormalSide::Debit)]
    #[case(AccountType::CurrentAsset, NormalSide::Debit)]
    #[case(AccountType::CostOfSales, NormalSide::Debit)]
    #[case(AccountType::Expense, NormalSide::Debit)]
    #[case(AccountType::OtherExpense, NormalSide::Debit)]
    #[case(AccountType::NonCurrentLiability, NormalSide::Credit)]
    #[case(AccountType::CurrentLiability, NormalSide::Credit)]
    #[case(AccountType::Equity, NormalSide::Credit)]
    #[case(AccountType::Revenue, NormalSide::Credit)]
    #[case(AccountType::OtherIncome, NormalSide::Credit)]
    fn test_classify(#[case] account_type: AccountType, #[case] side: NormalSide) {
        assert_eq!(classify(account_type), side);
        assert_eq!(account_type.normal_side(), side);
    }

    #[test]
    fn test_signed_change() {
        assert_eq!(NormalSide::Debit.signed_change(dec!(100), dec!(30)), dec!(70));
        assert_eq!(NormalSide::Credit.signed_change(dec!(100), dec!(30)), dec!(-70));
        assert_eq!(NormalSide::Debit.opposite(), NormalSide::Credit);
    }

    #[test]
    fn test_round_trip_names() {
        for account_type in AccountType::ALL {
            assert_eq!(account_type.as_str().parse::<AccountType>(), Ok(account_type));
        }
    }

    #[rstest]
    #[case("asset", AccountType::CurrentAsset)]
    #[case("liability", AccountType::CurrentLiability)]
    #[case(" Revenue ", AccountType::Revenue)]
    fn test_legacy_names_normalise(#[case] raw: &str, #[case] expected: AccountType) {
        assert_eq!(raw.parse::<AccountType>(), Ok(expected));
    }

    #[test]
    fn test_serde_accepts_legacy_alias() {
        let parsed: AccountType = serde_json::from_str("\"asset\"").unwrap();
        assert_eq!(parsed, AccountType::CurrentAsset);
        assert_eq!(
            serde_json::to_string(&AccountType::CurrentAsset).unwrap(),
            "\"asset_current\""
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!("income".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_statement_membership() {
        let balance_sheet: Vec<_> = AccountType::ALL
            .into_iter()
            .filter(|t| t.is_balance_sheet())
            .collect();
        assert_eq!(balance_sheet.len(), 5);
        assert!(AccountType::CostOfSales.is_income_statement());
    }
}
