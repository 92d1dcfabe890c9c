//! Translation of database failures into domain errors.
//!
//! Core error types cannot depend on `SeaORM`, so the store maps `DbErr`
//! at its boundary. Serialization failures and deadlocks become
//! `ConcurrentModification` so the posting engine can retry them.

use sea_orm::{DbErr, RuntimeErr};
use tally_core::accounts::AccountError;
use tally_core::ledger::LedgerError;
use tally_core::reports::ReportError;

/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";
/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE code carried by a database error, if any.
pub(crate) fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// True for failures that a fresh attempt of the same transaction may avoid.
pub(crate) fn is_conflict(err: &DbErr) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
    )
}

/// True if the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    sqlstate(err).as_deref() == Some(UNIQUE_VIOLATION)
}

/// Maps a failure of a ledger write.
pub(crate) fn ledger_error(err: DbErr) -> LedgerError {
    if is_conflict(&err) {
        LedgerError::ConcurrentModification { attempts: 1 }
    } else {
        LedgerError::Storage(err.to_string())
    }
}

/// Maps a failure of an account registry operation.
pub(crate) fn account_error(err: DbErr) -> AccountError {
    AccountError::Storage(err.to_string())
}

/// Maps a failure of a report read.
pub(crate) fn report_error(err: DbErr) -> ReportError {
    ReportError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_without_sqlstate_are_storage_errors() {
        let err = DbErr::Custom("connection reset".into());
        assert_eq!(sqlstate(&err), None);
        assert!(!is_conflict(&err));
        assert!(!is_unique_violation(&err));
        assert!(matches!(ledger_error(err), LedgerError::Storage(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn test_record_not_found_maps_to_storage() {
        let missing = || DbErr::RecordNotFound("accounts".into());
        assert!(matches!(account_error(missing()), AccountError::Storage(_)));
        assert!(matches!(report_error(missing()), ReportError::Storage(_)));
    }
}
