//! Database seeder for Tally development and testing.
//!
//! Seeds a standard chart of accounts and an opening balance for a fixed
//! test tenant. Safe to run repeatedly: existing accounts are kept and the
//! opening entry is only created for an empty journal.
//!
//! Usage: cargo run --bin seeder (reads the same configuration as the server)

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, Utc};
use rust_decimal_macros::dec;
use tally_core::accounts::{AccountError, AccountType, NewAccount};
use tally_core::ledger::{
    EntryFilter, InitialStatus, JournalLineInput, NewJournalEntry, PostingEngine, PostingPolicy,
};
use tally_core::store::{AccountRegistry, JournalStore};
use tally_db::PgLedgerStore;
use tally_shared::AppConfig;
use tally_shared::types::{AccountId, PageRequest, TenantId};
use uuid::Uuid;

/// Test tenant ID (consistent for all seeds)
const TEST_TENANT_ID: Uuid = Uuid::from_u128(1);

/// Standard chart: code, name, type, parent code.
const CHART: &[(&str, &str, AccountType, Option<&str>)] = &[
    ("1000", "Cash", AccountType::CurrentAsset, None),
    ("1100", "Accounts Receivable", AccountType::CurrentAsset, None),
    ("1200", "Inventory", AccountType::CurrentAsset, None),
    ("1500", "Equipment", AccountType::NonCurrentAsset, None),
    ("2000", "Accounts Payable", AccountType::CurrentLiability, None),
    ("2500", "Long-term Loan", AccountType::NonCurrentLiability, None),
    ("3000", "Owner Capital", AccountType::Equity, None),
    ("3100", "Retained Earnings", AccountType::Equity, None),
    ("4000", "Sales Revenue", AccountType::Revenue, None),
    ("5000", "Cost of Goods Sold", AccountType::CostOfSales, None),
    ("6000", "Operating Expenses", AccountType::Expense, None),
    ("6100", "Rent Expense", AccountType::Expense, Some("6000")),
    ("6200", "Salaries Expense", AccountType::Expense, Some("6000")),
    ("7000", "Interest Income", AccountType::OtherIncome, None),
    ("8000", "Interest Expense", AccountType::OtherExpense, None),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = tally_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = Arc::new(PgLedgerStore::new(db));
    let tenant = TenantId::from_uuid(TEST_TENANT_ID);

    println!("Seeding chart of accounts...");
    let accounts = seed_chart(store.as_ref(), tenant).await?;

    println!("Seeding opening balance...");
    seed_opening_balance(&store, tenant, &accounts).await?;

    println!("Seeding complete! Tenant: {TEST_TENANT_ID}");
    Ok(())
}

/// Creates missing chart accounts and returns every account id by code.
async fn seed_chart(
    store: &PgLedgerStore,
    tenant: TenantId,
) -> anyhow::Result<HashMap<String, AccountId>> {
    let mut by_code: HashMap<String, AccountId> = store
        .list_accounts(tenant)
        .await?
        .into_iter()
        .map(|a| (a.code, a.id))
        .collect();

    for &(code, name, account_type, parent) in CHART {
        if by_code.contains_key(code) {
            println!("  Account {code} already exists, skipping...");
            continue;
        }
        let parent_id = parent.and_then(|p| by_code.get(p).copied());

        match store
            .create_account(NewAccount {
                tenant_id: tenant,
                code: code.to_string(),
                name: name.to_string(),
                account_type,
                parent_id,
            })
            .await
        {
            Ok(account) => {
                println!("  Created account {code} {name}");
                by_code.insert(account.code, account.id);
            }
            Err(AccountError::DuplicateCode(_)) => {
                println!("  Account {code} created concurrently, skipping...");
            }
            Err(e) => return Err(e).with_context(|| format!("failed to create account {code}")),
        }
    }

    Ok(by_code)
}

/// Posts the owner's contribution if the tenant has no entries yet.
async fn seed_opening_balance(
    store: &Arc<PgLedgerStore>,
    tenant: TenantId,
    accounts: &HashMap<String, AccountId>,
) -> anyhow::Result<()> {
    let existing = store
        .list_entries(tenant, EntryFilter::default(), PageRequest::default())
        .await?;
    if existing.meta.total > 0 {
        println!("  Journal already has {} entries, skipping...", existing.meta.total);
        return Ok(());
    }

    let (Some(&cash), Some(&capital)) = (accounts.get("1000"), accounts.get("3000")) else {
        anyhow::bail!("chart is missing cash or capital account");
    };

    let engine = PostingEngine::new(Arc::clone(store), PostingPolicy::default());
    let today = Utc::now().date_naive();
    let opening_date = today.with_day(1).unwrap_or(today);

    let created = engine
        .create_entry(
            NewJournalEntry {
                tenant_id: tenant,
                entry_date: opening_date,
                description: "Opening balance".to_string(),
                reference: None,
                created_by: None,
                lines: vec![
                    JournalLineInput::debit(cash, dec!(10000.00)),
                    JournalLineInput::credit(capital, dec!(10000.00)),
                ],
            },
            InitialStatus::Posted,
        )
        .await?;

    println!("  Posted {}", created.entry.entry_number);
    Ok(())
}
