//! Property-based tests for the posting engine.
//!
//! Each case runs a small ledger on a current-thread runtime.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TenantId};

use super::*;
use crate::accounts::{AccountType, NewAccount, classify};
use crate::store::{AccountRegistry, InMemoryLedger};

/// Amounts from 0.01 to 10,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn account_type() -> impl Strategy<Value = AccountType> {
    prop::sample::select(AccountType::ALL.to_vec())
}

/// An entry as `(account index, debit, credit)` lines over `n` accounts,
/// balanced by a final line on a random account.
fn entry(n: usize) -> impl Strategy<Value = Vec<(usize, Decimal, Decimal)>> {
    (
        prop::collection::vec((0..n, amount(), any::<bool>()), 1..5),
        0..n,
    )
        .prop_map(|(lines, closing)| {
            let mut net = Decimal::ZERO;
            let mut out: Vec<_> = lines
                .into_iter()
                .map(|(idx, amt, is_debit)| {
                    if is_debit {
                        net += amt;
                        (idx, amt, Decimal::ZERO)
                    } else {
                        net -= amt;
                        (idx, Decimal::ZERO, amt)
                    }
                })
                .collect();
            if net > Decimal::ZERO {
                out.push((closing, Decimal::ZERO, net));
            } else if net < Decimal::ZERO {
                out.push((closing, -net, Decimal::ZERO));
            }
            out
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

async fn setup(types: &[AccountType]) -> (Arc<InMemoryLedger>, TenantId, Vec<AccountId>) {
    let store = Arc::new(InMemoryLedger::new());
    let tenant = TenantId::new();
    let mut ids = Vec::new();
    for (i, account_type) in types.iter().enumerate() {
        let account = store
            .create_account(NewAccount {
                tenant_id: tenant,
                code: format!("{}", 1000 + i),
                name: format!("Account {i}"),
                account_type: *account_type,
                parent_id: None,
            })
            .await
            .unwrap();
        ids.push(account.id);
    }
    (store, tenant, ids)
}

fn new_entry(
    tenant: TenantId,
    ids: &[AccountId],
    lines: &[(usize, Decimal, Decimal)],
) -> NewJournalEntry {
    NewJournalEntry {
        tenant_id: tenant,
        entry_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        description: "generated".into(),
        reference: None,
        created_by: None,
        lines: lines
            .iter()
            .map(|&(idx, debit, credit)| JournalLineInput {
                account_id: ids[idx],
                debit,
                credit,
                description: None,
            })
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Each account moves by exactly the signed sum of its lines.
    #[test]
    fn prop_balances_follow_signed_line_sums(
        types in prop::collection::vec(account_type(), 2..6),
        entries in prop::collection::vec(entry(6), 1..6),
    ) {
        runtime().block_on(async {
            let (store, tenant, ids) = setup(&types).await;
            let engine = PostingEngine::new(Arc::clone(&store), PostingPolicy::default());
            let n = ids.len();

            let mut expected: HashMap<AccountId, Decimal> = HashMap::new();
            for lines in &entries {
                let lines: Vec<_> = lines.iter().map(|&(i, d, c)| (i % n, d, c)).collect();
                engine
                    .create_entry(new_entry(tenant, &ids, &lines), InitialStatus::Posted)
                    .await
                    .unwrap();
                for (idx, debit, credit) in lines {
                    let side = classify(types[idx]);
                    *expected.entry(ids[idx]).or_default() += side.signed_change(debit, credit);
                }
            }

            for id in &ids {
                let account = store.get_account(tenant, *id).await.unwrap();
                let want = expected.get(id).copied().unwrap_or_default();
                assert_eq!(account.current_balance, want);
            }
        });
    }

    /// Reversing every posted entry returns every balance to zero.
    #[test]
    fn prop_reversal_restores_balances(
        types in prop::collection::vec(account_type(), 2..6),
        entries in prop::collection::vec(entry(6), 1..4),
    ) {
        runtime().block_on(async {
            let (store, tenant, ids) = setup(&types).await;
            let engine = PostingEngine::new(Arc::clone(&store), PostingPolicy::default());
            let n = ids.len();

            let mut posted = Vec::new();
            for lines in &entries {
                let lines: Vec<_> = lines.iter().map(|&(i, d, c)| (i % n, d, c)).collect();
                let entry = engine
                    .create_entry(new_entry(tenant, &ids, &lines), InitialStatus::Posted)
                    .await
                    .unwrap();
                posted.push(entry.entry.id);
            }

            for entry_id in posted {
                engine
                    .reverse_entry(ReverseEntry {
                        tenant_id: tenant,
                        entry_id,
                        reversal_date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
                        user: None,
                        reason: None,
                    })
                    .await
                    .unwrap();
            }

            for id in &ids {
                let account = store.get_account(tenant, *id).await.unwrap();
                assert!(account.current_balance.is_zero(), "{} left at {}", account.code, account.current_balance);
            }
        });
    }
}
