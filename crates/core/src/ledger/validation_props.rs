//! Property-based tests for journal line validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::error::LedgerError;
use super::types::JournalLineInput;
use super::validation::{LinePolicy, validate_lines};

/// Amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A balanced set of single-sided lines: the debits are split arbitrarily,
/// and one credit line carries their sum.
fn balanced_lines() -> impl Strategy<Value = Vec<JournalLineInput>> {
    prop::collection::vec(positive_amount(), 1..8).prop_map(|debits| {
        let total: Decimal = debits.iter().copied().sum();
        let mut lines: Vec<_> = debits
            .into_iter()
            .map(|amount| JournalLineInput::debit(AccountId::new(), amount))
            .collect();
        lines.push(JournalLineInput::credit(AccountId::new(), total));
        lines
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balanced entries pass under both policies and report their totals.
    #[test]
    fn prop_balanced_entries_accepted(lines in balanced_lines(), strict in any::<bool>()) {
        let policy = LinePolicy { require_single_sided: strict };
        let totals = validate_lines(&lines, policy).unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
        let expected: Decimal = lines.iter().map(|l| l.debit).sum();
        prop_assert_eq!(totals.debit, expected);
    }

    /// Any non-zero skew makes an entry unbalanced, with exact totals.
    #[test]
    fn prop_skewed_entries_rejected(lines in balanced_lines(), skew in positive_amount()) {
        let mut lines = lines;
        let last = lines.len() - 1;
        lines[last].credit += skew;

        let debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = lines.iter().map(|l| l.credit).sum();

        prop_assert_eq!(
            validate_lines(&lines, LinePolicy::default()),
            Err(LedgerError::UnbalancedEntry { debit, credit })
        );
    }

    /// A negative amount is reported at its own index, ahead of balance checks.
    #[test]
    fn prop_negative_amount_reports_index(
        lines in balanced_lines(),
        amount in positive_amount(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut lines = lines;
        let index = pick.index(lines.len());
        lines[index].debit = -amount;

        prop_assert_eq!(
            validate_lines(&lines, LinePolicy::default()),
            Err(LedgerError::NegativeAmount { line: index })
        );
    }

    /// Line order never changes the verdict.
    #[test]
    fn prop_order_independent(lines in balanced_lines()) {
        let mut reversed = lines.clone();
        reversed.reverse();
        prop_assert_eq!(
            validate_lines(&lines, LinePolicy::default()),
            validate_lines(&reversed, LinePolicy::default())
        );
    }
}
