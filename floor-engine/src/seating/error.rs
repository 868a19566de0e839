//! Seating Error Taxonomy

use thiserror::Error;

use crate::db::repository::RepoError;
use crate::ledger::LedgerError;

/// Engine-boundary error type.
///
/// The coordinator is the boundary that translates everything below it
/// into this split, so callers can distinguish "retry against fresh
/// state" from "tell the user" without inspecting messages.
#[derive(Debug, Error)]
pub enum SeatingError {
    /// No eligible waiter or fitting table right now. Expected and
    /// frequent; the caller surfaces "no tables available".
    #[error("No suitable table for this party")]
    NoSuitableTable,

    /// Lost the optimistic race, or the commit could not complete in
    /// time. Retryable against a fresh snapshot.
    #[error("Seating conflict: {0}")]
    Conflict(String),

    /// Caller precondition violation; retrying the same request will
    /// not help.
    #[error("Seating rejected: {0}")]
    Rejected(String),

    /// Storage or internal failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl SeatingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SeatingError::Conflict(_))
    }
}

impl From<RepoError> for SeatingError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) | RepoError::Duplicate(msg) | RepoError::Validation(msg) => {
                SeatingError::Rejected(msg)
            }
            RepoError::Database(msg) => from_db_message(msg),
        }
    }
}

impl From<LedgerError> for SeatingError {
    fn from(err: LedgerError) -> Self {
        SeatingError::Database(err.to_string())
    }
}

impl From<sqlx::Error> for SeatingError {
    fn from(err: sqlx::Error) -> Self {
        from_db_message(err.to_string())
    }
}

/// SQLite busy/locked failures mean the write lock could not be
/// acquired within `busy_timeout` — retryable, unlike a storage fault.
fn from_db_message(msg: String) -> SeatingError {
    let lower = msg.to_lowercase();
    if lower.contains("database is locked") || lower.contains("database is busy") {
        SeatingError::Conflict(msg)
    } else {
        SeatingError::Database(msg)
    }
}

/// Result type for engine operations
pub type SeatingResult<T> = Result<T, SeatingError>;
