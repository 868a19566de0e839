//! Domain Models
//!
//! Entities shared between the seating engine and its collaborators.

pub mod dining_table;
pub mod waiter;
pub mod waitlist;

pub use dining_table::{DiningTable, DiningTableCreate, DiningTableUpdate, TableState};
pub use waiter::{Waiter, WaiterCreate, WaiterUpdate};
pub use waitlist::{PriorityClass, WaitlistCreate, WaitlistEntry, WaitlistStatus};
