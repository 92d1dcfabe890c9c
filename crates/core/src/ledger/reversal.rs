//! Compensating entries for reversals.

use super::types::{JournalEntryWithLines, JournalLineInput, NewJournalEntry, ReverseEntry};

/// Builds the compensating entry for `original`.
///
/// Every line keeps its account and has its debit and credit swapped, so the
/// result is balanced whenever the original is. The reference points back to
/// the original entry number.
#[must_use]
pub fn compensating_entry(
    original: &JournalEntryWithLines,
    request: &ReverseEntry,
) -> NewJournalEntry {
    let number = &original.entry.entry_number;
    let description = match request.reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => format!("Reversal of {number}: {reason}"),
        _ => format!("Reversal of {number}"),
    };

    let lines = original
        .lines
        .iter()
        .map(|line| JournalLineInput {
            account_id: line.account_id,
            debit: line.credit,
            credit: line.debit,
            description: line
                .description
                .as_ref()
                .map(|memo| format!("Reversal: {memo}")),
        })
        .collect();

    NewJournalEntry {
        tenant_id: original.entry.tenant_id,
        entry_date: request.reversal_date,
        description,
        reference: Some(number.clone()),
        created_by: request.user,
        lines,
    }
}
