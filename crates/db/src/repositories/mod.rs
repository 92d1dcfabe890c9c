//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! They speak the domain types of `tally-core`; the conversions from entity
//! models live here.

pub mod account;
pub mod journal;
pub mod report;
pub mod sequence;

pub use account::AccountRepository;
pub use journal::JournalRepository;
pub use report::ReportRepository;
pub use sequence::SequenceRepository;

use chrono::Utc;
use tally_core::accounts::Account;
use tally_core::ledger::{JournalEntry, JournalLine};
use tally_shared::types::{AccountId, EntryId, LineId, TenantId, UserId};

use crate::entities::{accounts, journal_entries, journal_entry_lines};

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            tenant_id: TenantId::from_uuid(model.tenant_id),
            code: model.code,
            name: model.name,
            account_type: model.account_type.into(),
            parent_id: model.parent_id.map(AccountId::from_uuid),
            current_balance: model.current_balance,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<journal_entries::Model> for JournalEntry {
    fn from(model: journal_entries::Model) -> Self {
        Self {
            id: EntryId::from_uuid(model.id),
            tenant_id: TenantId::from_uuid(model.tenant_id),
            entry_number: model.entry_number,
            entry_date: model.entry_date,
            description: model.description,
            reference: model.reference,
            status: model.status.into(),
            created_by: model.created_by.map(UserId::from_uuid),
            posted_by: model.posted_by.map(UserId::from_uuid),
            posted_at: model.posted_at.map(|at| at.with_timezone(&Utc)),
            reversal_of: model.reversal_of.map(EntryId::from_uuid),
            reversed_by: model.reversed_by.map(EntryId::from_uuid),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<journal_entry_lines::Model> for JournalLine {
    fn from(model: journal_entry_lines::Model) -> Self {
        Self {
            id: LineId::from_uuid(model.id),
            entry_id: EntryId::from_uuid(model.entry_id),
            account_id: AccountId::from_uuid(model.account_id),
            description: model.description,
            debit: model.debit,
            credit: model.credit,
        }
    }
}
