//! Mapping of database failures onto ledger errors.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use stockledger_core::LedgerError;

/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";

/// Converts a `DbErr` into a ledger error.
///
/// Unique violations, serialization failures and deadlocks mean another
/// transaction won a race, so they become the retryable
/// `ConcurrencyConflict`. Everything else is a `Store` error.
pub(crate) fn map_db_err(err: DbErr) -> LedgerError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) || is_transient(&err) {
        return LedgerError::ConcurrencyConflict(err.to_string());
    }
    LedgerError::Store(err.to_string())
}

fn is_transient(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) => matches!(
            db_err.code().as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ),
        _ => false,
    }
}

pub(crate) fn json_err(err: serde_json::Error) -> LedgerError {
    LedgerError::Store(format!("malformed JSON column: {err}"))
}
