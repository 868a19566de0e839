//! Repository Module
//!
//! CRUD operations over the embedded SQLite floor database.
//! Repositories are free async functions taking `&SqlitePool`; the
//! state-transition guards additionally come in `&mut SqliteConnection`
//! variants so the seating coordinator can run them inside one
//! transaction.

pub mod dining_table;
pub mod waiter;
pub mod waitlist;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
