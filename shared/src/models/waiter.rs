//! Waiter Model

use serde::{Deserialize, Serialize};

/// Waiter (floor staff) entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Waiter {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    /// Shift start time (Unix millis), null when off shift
    pub shift_start: Option<i64>,
    /// Assigned section number, null when unassigned.
    /// A waiter holds at most one section at a time.
    pub section: Option<i64>,
}

impl Waiter {
    /// Only active, on-shift, section-assigned waiters may receive
    /// new seating assignments.
    pub fn is_eligible(&self) -> bool {
        self.is_active && self.shift_start.is_some() && self.section.is_some()
    }
}

/// Create waiter payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiterCreate {
    pub name: String,
}

/// Update waiter payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaiterUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}
