//! Journal entry domain types.
//!
//! A journal entry is a header plus its lines. Entries start as drafts and
//! become immutable once posted; balances only ever move through posting.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId, LineId, TenantId, UserId};

/// Journal entry status.
///
/// The valid transitions are:
/// - Draft → Posted (post)
/// - Draft → Cancelled (cancel)
/// - Posted → Reversed (reverse, through a compensating entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Editable, no effect on balances.
    Draft,
    /// Final; its lines are reflected in balances.
    Posted,
    /// Was posted; a compensating entry cancels its effect.
    Reversed,
    /// Abandoned draft.
    Cancelled,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if moving to `target` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Posted | Self::Cancelled) | (Self::Posted, Self::Reversed)
        )
    }

    /// Returns true if the entry's lines count towards account balances.
    #[must_use]
    pub const fn affects_balances(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "posted" => Ok(Self::Posted),
            "reversed" => Ok(Self::Reversed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

/// Status requested when creating an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialStatus {
    /// Keep the entry as a draft.
    #[default]
    Draft,
    /// Post right after creation.
    Posted,
}

/// A line as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLineInput {
    /// Account the line is booked against.
    pub account_id: AccountId,
    /// Debit amount (>= 0).
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount (>= 0).
    #[serde(default)]
    pub credit: Decimal,
    /// Optional line memo.
    #[serde(default)]
    pub description: Option<String>,
}

impl JournalLineInput {
    /// A debit-only line.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// A credit-only line.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input for creating a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJournalEntry {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Accounting date; also selects the numbering year.
    pub entry_date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// External reference (invoice number, original entry number, ...).
    pub reference: Option<String>,
    /// Creating user; `None` for system-generated entries.
    pub created_by: Option<UserId>,
    /// Lines of the entry.
    pub lines: Vec<JournalLineInput>,
}

/// Persisted journal entry header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry ID.
    pub id: EntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Generated number, `JE-{year}-{counter:05}`.
    pub entry_number: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// External reference.
    pub reference: Option<String>,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Creating user.
    pub created_by: Option<UserId>,
    /// Posting user.
    pub posted_by: Option<UserId>,
    /// Posting timestamp.
    pub posted_at: Option<DateTime<Utc>>,
    /// Entry this one compensates.
    pub reversal_of: Option<EntryId>,
    /// Compensating entry, once reversed.
    pub reversed_by: Option<EntryId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Persisted journal entry line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Line ID.
    pub id: LineId,
    /// Owning entry.
    pub entry_id: EntryId,
    /// Account booked against.
    pub account_id: AccountId,
    /// Memo.
    pub description: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

/// Sums of the debit and credit columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl EntryTotals {
    /// Sums `(debit, credit)` pairs, `None` on decimal overflow.
    pub fn checked_sum<I>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        pairs
            .into_iter()
            .try_fold(Self::default(), |acc, (debit, credit)| {
                Some(Self {
                    debit: acc.debit.checked_add(debit)?,
                    credit: acc.credit.checked_add(credit)?,
                })
            })
    }

    /// Exact decimal equality of both columns.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

/// Entry header together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryWithLines {
    /// Header.
    pub entry: JournalEntry,
    /// Lines in insertion order.
    pub lines: Vec<JournalLine>,
}

impl JournalEntryWithLines {
    /// Column totals of the persisted lines.
    #[must_use]
    pub fn totals(&self) -> Option<EntryTotals> {
        EntryTotals::checked_sum(self.lines.iter().map(|l| (l.debit, l.credit)))
    }
}

/// Effect of a posting on one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Account whose balance moved.
    pub account_id: AccountId,
    /// Signed change in the account's normal direction.
    pub delta: Decimal,
    /// Balance after the change.
    pub new_balance: Decimal,
}

/// Result of a post request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The entry moved from draft to posted.
    Posted {
        /// The posted entry.
        entry: JournalEntryWithLines,
        /// Per-account balance changes, ordered by account id.
        changes: Vec<BalanceChange>,
    },
    /// The entry was already posted; nothing changed.
    AlreadyPosted {
        /// The entry as stored.
        entry: JournalEntryWithLines,
    },
}

impl PostOutcome {
    /// The entry after the request.
    #[must_use]
    pub const fn entry(&self) -> &JournalEntryWithLines {
        match self {
            Self::Posted { entry, .. } | Self::AlreadyPosted { entry } => entry,
        }
    }

    /// Consumes the outcome, returning the entry.
    #[must_use]
    pub fn into_entry(self) -> JournalEntryWithLines {
        match self {
            Self::Posted { entry, .. } | Self::AlreadyPosted { entry } => entry,
        }
    }

    /// True if this request did the posting.
    #[must_use]
    pub const fn newly_posted(&self) -> bool {
        matches!(self, Self::Posted { .. })
    }
}

/// Request to reverse a posted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseEntry {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Entry to reverse.
    pub entry_id: EntryId,
    /// Date of the compensating entry.
    pub reversal_date: NaiveDate,
    /// Reversing user.
    pub user: Option<UserId>,
    /// Optional reason, copied into the description.
    pub reason: Option<String>,
}

/// Result of a reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversal {
    /// Original entry, now `reversed`.
    pub original: JournalEntryWithLines,
    /// Compensating entry, posted.
    pub reversal: JournalEntryWithLines,
    /// Balance changes caused by the compensating entry.
    pub changes: Vec<BalanceChange>,
}

/// Filter for listing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Only entries in this status.
    pub status: Option<EntryStatus>,
    /// Earliest entry date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest entry date, inclusive.
    pub to: Option<NaiveDate>,
}

impl EntryFilter {
    /// Returns true if `entry` passes the filter.
    #[must_use]
    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.status.is_none_or(|s| s == entry.status)
            && self.from.is_none_or(|d| entry.entry_date >= d)
            && self.to.is_none_or(|d| entry.entry_date <= d)
    }
}
