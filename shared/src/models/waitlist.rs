//! Waitlist Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Priority class of a waiting party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PriorityClass {
    Normal,
    LargeParty,
    Staff,
}

impl Default for PriorityClass {
    fn default() -> Self {
        Self::Normal
    }
}

/// Waitlist entry status
///
/// Only `waiting` entries are eligible for assignment. `seated` is
/// terminal for the engine; restoring a seated party to the waitlist
/// is a compensating action performed by the waitlist collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum WaitlistStatus {
    Waiting,
    Seated,
    Cancelled,
    NoShow,
}

/// A party waiting to be seated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WaitlistEntry {
    pub id: i64,
    pub party_name: String,
    /// Party size (1–20)
    pub party_size: i32,
    pub priority: PriorityClass,
    pub status: WaitlistStatus,
    /// Table the party was seated at
    pub table_id: Option<i64>,
    /// Waiter the party was assigned to
    pub waiter_id: Option<i64>,
    /// Seating timestamp (Unix millis)
    pub seated_at: Option<i64>,
    /// Creation timestamp — drives FIFO ordering and wait-time urgency
    pub created_at: i64,
}

/// Create waitlist entry payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WaitlistCreate {
    #[validate(length(min = 1, max = 80))]
    pub party_name: String,
    #[validate(range(min = 1, max = 20))]
    pub party_size: i32,
    #[serde(default)]
    pub priority: PriorityClass,
}
