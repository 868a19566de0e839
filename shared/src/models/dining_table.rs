//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Occupancy state of a dining table (桌台状态)
///
/// Transitions only along `available → assigned → occupied → available`;
/// `assigned` may also revert directly to `available` (cancellation).
/// Occupancy is mutated exclusively by the seating coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum TableState {
    Available,
    Assigned,
    Occupied,
}

/// Dining table entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    /// Seats (2–15)
    pub capacity: i32,
    pub state: TableState,
    /// Section number of the waiter staffing this table, null when the
    /// table is not part of the current shift configuration
    pub section: Option<i64>,
    /// Size of the party currently occupying the table
    pub party_size: Option<i32>,
    /// Unix millis of the last state change
    pub state_changed_at: i64,
    pub is_active: bool,
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub name: String,
    pub capacity: Option<i32>,
    pub section: Option<i64>,
}

/// Update dining table payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiningTableUpdate {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}
