//! Business rule validation for journal entries.
//!
//! Line checks are pure and run before anything touches storage. Account
//! checks take an already-loaded account so each store can fetch accounts
//! its own way.

use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TenantId};

use super::error::{InvalidAccountReason, LedgerError};
use super::types::{EntryTotals, JournalLineInput, NewJournalEntry};
use crate::accounts::Account;

/// Per-line rules that vary by deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinePolicy {
    /// Reject lines that carry both a debit and a credit, or neither.
    pub require_single_sided: bool,
}

/// Validates the lines of an entry and returns the column totals.
///
/// # Errors
///
/// - `EmptyEntry` if there are no lines
/// - `NegativeAmount` if any debit or credit is below zero
/// - `InvalidLine` under a single-sided policy
/// - `AmountOverflow` if the totals leave the decimal range
/// - `UnbalancedEntry` if debits and credits differ
pub fn validate_lines(
    lines: &[JournalLineInput],
    policy: LinePolicy,
) -> Result<EntryTotals, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }

    for (index, line) in lines.iter().enumerate() {
        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { line: index });
        }
        if policy.require_single_sided && (line.debit.is_zero() == line.credit.is_zero()) {
            return Err(LedgerError::InvalidLine { line: index });
        }
    }

    let totals = EntryTotals::checked_sum(lines.iter().map(|l| (l.debit, l.credit)))
        .ok_or(LedgerError::AmountOverflow)?;

    if !totals.is_balanced() {
        return Err(LedgerError::UnbalancedEntry {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

/// Checks that a looked-up account can take a line of `tenant_id`.
///
/// # Errors
///
/// Returns `InvalidAccount` when the account is missing, belongs to another
/// tenant, or is inactive.
pub fn validate_account(
    tenant_id: TenantId,
    account_id: AccountId,
    account: Option<&Account>,
) -> Result<(), LedgerError> {
    let reason = match account {
        None => InvalidAccountReason::Missing,
        Some(a) if a.tenant_id != tenant_id => InvalidAccountReason::WrongTenant,
        Some(a) if !a.is_active => InvalidAccountReason::Inactive,
        Some(_) => return Ok(()),
    };
    Err(LedgerError::InvalidAccount { account_id, reason })
}

/// An entry whose lines passed [`validate_lines`].
///
/// Stores only accept this type, so an unbalanced entry cannot reach them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    input: NewJournalEntry,
    totals: EntryTotals,
}

impl ValidatedEntry {
    /// Validates `input` under `policy`.
    ///
    /// # Errors
    ///
    /// See [`validate_lines`].
    pub fn new(input: NewJournalEntry, policy: LinePolicy) -> Result<Self, LedgerError> {
        let totals = validate_lines(&input.lines, policy)?;
        Ok(Self { input, totals })
    }

    /// The validated input.
    #[must_use]
    pub const fn input(&self) -> &NewJournalEntry {
        &self.input
    }

    /// Column totals.
    #[must_use]
    pub const fn totals(&self) -> EntryTotals {
        self.totals
    }

    /// Distinct account ids referenced by the lines, ascending.
    #[must_use]
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.input.lines.iter().map(|l| l.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_input(self) -> NewJournalEntry {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountType;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn cash() -> AccountId {
        AccountId::new()
    }

    fn input(lines: Vec<JournalLineInput>) -> NewJournalEntry {
        NewJournalEntry {
            tenant_id: TenantId::new(),
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: "Cash sale".into(),
            reference: None,
            created_by: None,
            lines,
        }
    }

    fn account(tenant_id: TenantId, is_active: bool) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(),
            tenant_id,
            code: "1000".into(),
            name: "Cash".into(),
            account_type: AccountType::CurrentAsset,
            parent_id: None,
            current_balance: Decimal::ZERO,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_balanced_entry_passes() {
        let lines = vec![
            JournalLineInput::debit(cash(), dec!(100)),
            JournalLineInput::credit(cash(), dec!(100)),
        ];
        let totals = validate_lines(&lines, LinePolicy::default()).unwrap();
        assert_eq!(totals.debit, dec!(100));
        assert_eq!(totals.credit, dec!(100));
    }

    #[test]
    fn test_empty_entry_rejected() {
        assert_eq!(
            validate_lines(&[], LinePolicy::default()),
            Err(LedgerError::EmptyEntry)
        );
    }

    #[test]
    fn test_unbalanced_entry_rejected() {
        let lines = vec![
            JournalLineInput::debit(cash(), dec!(100)),
            JournalLineInput::credit(cash(), dec!(50)),
        ];
        assert_eq!(
            validate_lines(&lines, LinePolicy::default()),
            Err(LedgerError::UnbalancedEntry {
                debit: dec!(100),
                credit: dec!(50)
            })
        );
    }

    #[test]
    fn test_negative_amount_reports_line() {
        let lines = vec![
            JournalLineInput::debit(cash(), dec!(100)),
            JournalLineInput::credit(cash(), dec!(-100)),
        ];
        assert_eq!(
            validate_lines(&lines, LinePolicy::default()),
            Err(LedgerError::NegativeAmount { line: 1 })
        );
    }

    #[test]
    fn test_sub_cent_difference_is_unbalanced() {
        let lines = vec![
            JournalLineInput::debit(cash(), dec!(100.001)),
            JournalLineInput::credit(cash(), dec!(100.00)),
        ];
        assert!(matches!(
            validate_lines(&lines, LinePolicy::default()),
            Err(LedgerError::UnbalancedEntry { .. })
        ));
    }

    #[test]
    fn test_two_sided_line_allowed_by_default() {
        let id = cash();
        let lines = vec![JournalLineInput {
            account_id: id,
            debit: dec!(10),
            credit: dec!(10),
            description: None,
        }];
        assert!(validate_lines(&lines, LinePolicy::default()).is_ok());
    }

    #[test]
    fn test_single_sided_policy() {
        let strict = LinePolicy {
            require_single_sided: true,
        };
        let both = vec![JournalLineInput {
            account_id: cash(),
            debit: dec!(10),
            credit: dec!(10),
            description: None,
        }];
        assert_eq!(
            validate_lines(&both, strict),
            Err(LedgerError::InvalidLine { line: 0 })
        );

        let neither = vec![
            JournalLineInput::debit(cash(), dec!(5)),
            JournalLineInput::credit(cash(), dec!(5)),
            JournalLineInput::debit(cash(), dec!(0)),
        ];
        assert_eq!(
            validate_lines(&neither, strict),
            Err(LedgerError::InvalidLine { line: 2 })
        );
    }

    #[test]
    fn test_account_checks() {
        let tenant = TenantId::new();
        let active = account(tenant, true);
        let inactive = account(tenant, false);
        let foreign = account(TenantId::new(), true);
        let missing = AccountId::new();

        assert!(validate_account(tenant, active.id, Some(&active)).is_ok());
        assert_eq!(
            validate_account(tenant, missing, None),
            Err(LedgerError::InvalidAccount {
                account_id: missing,
                reason: InvalidAccountReason::Missing
            })
        );
        assert!(matches!(
            validate_account(tenant, foreign.id, Some(&foreign)),
            Err(LedgerError::InvalidAccount {
                reason: InvalidAccountReason::WrongTenant,
                ..
            })
        ));
        assert!(matches!(
            validate_account(tenant, inactive.id, Some(&inactive)),
            Err(LedgerError::InvalidAccount {
                reason: InvalidAccountReason::Inactive,
                ..
            })
        ));
    }

    #[test]
    fn test_validated_entry_account_ids_dedup_sorted() {
        let a = cash();
        let b = cash();
        let entry = ValidatedEntry::new(
            input(vec![
                JournalLineInput::debit(b, dec!(40)),
                JournalLineInput::debit(a, dec!(60)),
                JournalLineInput::credit(b, dec!(100)),
            ]),
            LinePolicy::default(),
        )
        .unwrap();
        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(entry.account_ids(), expected);
        assert_eq!(entry.totals().debit, dec!(100));
    }
}
