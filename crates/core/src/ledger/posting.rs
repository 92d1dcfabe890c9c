//! Posting rules shared by every journal store.
//!
//! A store locks the entry, asks [`check_postable`] what to do, locks the
//! touched accounts in the order returned by [`aggregate_movements`] and
//! applies the changes computed by [`plan_balance_changes`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::error::{InvalidAccountReason, LedgerError};
use super::types::{BalanceChange, EntryStatus, JournalLine, JournalLineInput};
use crate::accounts::{Account, classify};

/// What a post request should do given the entry's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDecision {
    /// Entry is a draft; post it.
    Post,
    /// Entry is already posted; report success without changes.
    AlreadyPosted,
}

/// Decides how to handle a post request.
///
/// # Errors
///
/// `InvalidStatusTransition` for reversed and cancelled entries.
pub fn check_postable(status: EntryStatus) -> Result<PostDecision, LedgerError> {
    match status {
        EntryStatus::Draft => Ok(PostDecision::Post),
        EntryStatus::Posted => Ok(PostDecision::AlreadyPosted),
        from => Err(LedgerError::InvalidStatusTransition {
            from,
            to: EntryStatus::Posted,
        }),
    }
}

/// Checks a status transition other than posting.
///
/// # Errors
///
/// `InvalidStatusTransition` if `from -> to` is not allowed.
pub fn check_transition(from: EntryStatus, to: EntryStatus) -> Result<(), LedgerError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(LedgerError::InvalidStatusTransition { from, to })
    }
}

/// Debit and credit sums of one account within an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountMovement {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

/// Groups `(account, debit, credit)` triples by account.
///
/// The map iterates in ascending account id order, which is the lock order.
///
/// # Errors
///
/// `AmountOverflow` if a per-account sum leaves the decimal range.
pub fn aggregate_movements<I>(lines: I) -> Result<BTreeMap<AccountId, AccountMovement>, LedgerError>
where
    I: IntoIterator<Item = (AccountId, Decimal, Decimal)>,
{
    let mut movements: BTreeMap<AccountId, AccountMovement> = BTreeMap::new();
    for (account_id, debit, credit) in lines {
        let slot = movements.entry(account_id).or_default();
        slot.debit = slot
            .debit
            .checked_add(debit)
            .ok_or(LedgerError::AmountOverflow)?;
        slot.credit = slot
            .credit
            .checked_add(credit)
            .ok_or(LedgerError::AmountOverflow)?;
    }
    Ok(movements)
}

/// Movements of persisted lines.
///
/// # Errors
///
/// See [`aggregate_movements`].
pub fn line_movements(
    lines: &[JournalLine],
) -> Result<BTreeMap<AccountId, AccountMovement>, LedgerError> {
    aggregate_movements(lines.iter().map(|l| (l.account_id, l.debit, l.credit)))
}

/// Movements of input lines.
///
/// # Errors
///
/// See [`aggregate_movements`].
pub fn input_movements(
    lines: &[JournalLineInput],
) -> Result<BTreeMap<AccountId, AccountMovement>, LedgerError> {
    aggregate_movements(lines.iter().map(|l| (l.account_id, l.debit, l.credit)))
}

/// Computes the new balance of every touched account.
///
/// `account_of` returns the locked account row. Nothing is applied here; a
/// store commits the returned changes only if every one of them succeeded.
///
/// # Errors
///
/// - `InvalidAccount` (missing) if an account vanished
/// - `BalanceOverflow` if a new balance leaves the decimal range
pub fn plan_balance_changes<'a, F>(
    movements: &BTreeMap<AccountId, AccountMovement>,
    account_of: F,
) -> Result<Vec<BalanceChange>, LedgerError>
where
    F: Fn(AccountId) -> Option<&'a Account>,
{
    movements
        .iter()
        .map(|(&account_id, movement)| {
            let account = account_of(account_id).ok_or(LedgerError::InvalidAccount {
                account_id,
                reason: InvalidAccountReason::Missing,
            })?;
            let delta = classify(account.account_type)
                .signed_change(movement.debit, movement.credit);
            let new_balance = account
                .current_balance
                .checked_add(delta)
                .ok_or(LedgerError::BalanceOverflow(account_id))?;
            Ok(BalanceChange {
                account_id,
                delta,
                new_balance,
            })
        })
        .collect()
}
