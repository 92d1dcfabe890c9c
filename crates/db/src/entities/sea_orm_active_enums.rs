//! Postgres enum types and their mapping to the domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::accounts::AccountType as DomainAccountType;
use tally_core::ledger::EntryStatus as DomainEntryStatus;

/// `account_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[sea_orm(string_value = "asset_non_current")]
    AssetNonCurrent,
    #[sea_orm(string_value = "asset_current")]
    AssetCurrent,
    #[sea_orm(string_value = "liability_non_current")]
    LiabilityNonCurrent,
    #[sea_orm(string_value = "liability_current")]
    LiabilityCurrent,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "revenue")]
    Revenue,
    #[sea_orm(string_value = "cost_of_sales")]
    CostOfSales,
    #[sea_orm(string_value = "expense")]
    Expense,
    #[sea_orm(string_value = "other_income")]
    OtherIncome,
    #[sea_orm(string_value = "other_expense")]
    OtherExpense,
}

impl From<DomainAccountType> for AccountType {
    fn from(value: DomainAccountType) -> Self {
        match value {
            DomainAccountType::NonCurrentAsset => Self::AssetNonCurrent,
            DomainAccountType::CurrentAsset => Self::AssetCurrent,
            DomainAccountType::NonCurrentLiability => Self::LiabilityNonCurrent,
            DomainAccountType::CurrentLiability => Self::LiabilityCurrent,
            DomainAccountType::Equity => Self::Equity,
            DomainAccountType::Revenue => Self::Revenue,
            DomainAccountType::CostOfSales => Self::CostOfSales,
            DomainAccountType::Expense => Self::Expense,
            DomainAccountType::OtherIncome => Self::OtherIncome,
            DomainAccountType::OtherExpense => Self::OtherExpense,
        }
    }
}

impl From<AccountType> for DomainAccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::AssetNonCurrent => Self::NonCurrentAsset,
            AccountType::AssetCurrent => Self::CurrentAsset,
            AccountType::LiabilityNonCurrent => Self::NonCurrentLiability,
            AccountType::LiabilityCurrent => Self::CurrentLiability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::CostOfSales => Self::CostOfSales,
            AccountType::Expense => Self::Expense,
            AccountType::OtherIncome => Self::OtherIncome,
            AccountType::OtherExpense => Self::OtherExpense,
        }
    }
}

/// `entry_status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_status")]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "reversed")]
    Reversed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<DomainEntryStatus> for EntryStatus {
    fn from(value: DomainEntryStatus) -> Self {
        match value {
            DomainEntryStatus::Draft => Self::Draft,
            DomainEntryStatus::Posted => Self::Posted,
            DomainEntryStatus::Reversed => Self::Reversed,
            DomainEntryStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<EntryStatus> for DomainEntryStatus {
    fn from(value: EntryStatus) -> Self {
        match value {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Reversed => Self::Reversed,
            EntryStatus::Cancelled => Self::Cancelled,
        }
    }
}
