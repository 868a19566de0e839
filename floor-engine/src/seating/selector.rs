//! Assignment Selector
//!
//! Pure, deterministic choice of the single best (waiter, table) pair
//! for a party. Never mutates state; "no assignment possible" is
//! `None`, not an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::models::{DiningTable, TableState, Waiter};

use super::matrix::{FairnessMatrix, party_size_bucket};

/// The engine never proposes a table more than this many seats larger
/// than the party, to avoid wasting large tables on small parties.
pub const CAPACITY_SLACK: i32 = 2;

pub const ALGORITHM_FAIRNESS: &str = "fairness_v1";
pub const ALGORITHM_FAIRNESS_URGENT: &str = "fairness_v1_urgent";
pub const ALGORITHM_MANUAL: &str = "manual";

/// Caller options for one selection round
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentOptions {
    /// Waiters to leave out of consideration
    #[serde(default)]
    pub exclude_waiters: Vec<i64>,
    /// A party that has waited unusually long should not be held
    /// hostage to strict per-size fairness: pick the lightest total
    /// load instead. The wait-time threshold itself is the waitlist
    /// collaborator's business; the engine only sees this flag.
    #[serde(default)]
    pub urgent_party: bool,
    /// Preferred table, honored outright when it belongs to the chosen
    /// waiter's fitting tables
    #[serde(default)]
    pub table_preference: Option<i64>,
}

/// A proposed (or committed) seating decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub table_id: i64,
    pub table_name: String,
    pub waiter_id: i64,
    pub waiter_name: String,
    pub section: i64,
    pub party_size: i32,
    /// 60–100, higher = better fit
    pub confidence: i32,
    /// One-line human-readable justification
    pub reason: String,
    pub algorithm: &'static str,
}

/// Pick the single best (waiter, table) pair for `party_size`.
///
/// Deterministic: identical inputs always produce identical output.
/// Ties break first by lower total load, then by candidate order
/// (waiters arrive in section order, tables in id order).
pub fn select_assignment(
    party_size: i32,
    tables: &[DiningTable],
    waiters: &[Waiter],
    matrix: &FairnessMatrix,
    options: &AssignmentOptions,
) -> Option<Assignment> {
    // 1. Tables that can take the party without waste
    let fitting: Vec<&DiningTable> = tables
        .iter()
        .filter(|t| {
            t.state == TableState::Available
                && t.is_active
                && t.section.is_some()
                && t.capacity >= party_size
                && t.capacity <= party_size + CAPACITY_SLACK
        })
        .collect();
    if fitting.is_empty() {
        return None;
    }

    // 2. Group by owning section
    let mut by_section: HashMap<i64, Vec<&DiningTable>> = HashMap::new();
    for t in &fitting {
        if let Some(section) = t.section {
            by_section.entry(section).or_default().push(t);
        }
    }

    // 3–4. Walk candidates in order: fairness with urgency override
    let bucket = party_size_bucket(party_size);
    let mut chosen: Option<(&Waiter, i64, i64, i64)> = None; // (waiter, section, count, total)
    for w in waiters {
        if !w.is_eligible() || options.exclude_waiters.contains(&w.id) {
            continue;
        }
        let Some(section) = w.section else { continue };
        if !by_section.contains_key(&section) {
            continue;
        }
        let (Some(count), Some(total)) = (matrix.count(w.id, bucket), matrix.total(w.id)) else {
            // A candidate without a matrix row means the matrix and the
            // candidate list came from different snapshots. Skip it
            // rather than risk a wrong-but-plausible pick.
            tracing::error!(
                waiter_id = w.id,
                "Eligible waiter has no fairness matrix row, excluding from selection"
            );
            continue;
        };
        let better = match &chosen {
            None => true,
            Some((_, _, best_count, best_total)) => {
                if options.urgent_party {
                    total < *best_total
                } else {
                    count < *best_count || (count == *best_count && total < *best_total)
                }
            }
        };
        if better {
            chosen = Some((w, section, count, total));
        }
    }
    let (waiter, section, count, total) = chosen?;

    // 5. Table pick within the chosen waiter's section
    let section_tables = by_section.remove(&section)?;
    let table = pick_table(&section_tables, party_size, options.table_preference)?;

    // 7–8. Confidence and justification
    let confidence = confidence_score(table.capacity, party_size, matrix.fairness_score);
    let (reason, algorithm) = if options.urgent_party {
        (
            format!(
                "{} has the lightest load today ({} parties)",
                waiter.name, total
            ),
            ALGORITHM_FAIRNESS_URGENT,
        )
    } else {
        (
            format!(
                "{} has the fewest {}-top parties today ({})",
                waiter.name, party_size, count
            ),
            ALGORITHM_FAIRNESS,
        )
    };

    Some(Assignment {
        table_id: table.id,
        table_name: table.name.clone(),
        waiter_id: waiter.id,
        waiter_name: waiter.name.clone(),
        section,
        party_size,
        confidence,
        reason,
        algorithm,
    })
}

/// Honor the preference when it names one of the fitting tables,
/// bypassing the capacity-fit step; otherwise minimize wasted seats,
/// ties broken by table id.
fn pick_table<'a>(
    tables: &[&'a DiningTable],
    party_size: i32,
    preference: Option<i64>,
) -> Option<&'a DiningTable> {
    if let Some(pref) = preference
        && let Some(table) = tables.iter().find(|t| t.id == pref)
    {
        return Some(table);
    }
    tables
        .iter()
        .min_by_key(|t| ((t.capacity - party_size).abs(), t.id))
        .copied()
}

/// Start at 100; penalize each seat of capacity mismatch, reward an
/// exact fit, fold in up to 20 points of shift-wide fairness; clamp to
/// `[60, 100]`.
pub fn confidence_score(capacity: i32, party_size: i32, fairness_score: i32) -> i32 {
    let gap = (capacity - party_size).abs();
    let mut score = 100 - 15 * gap;
    if gap == 0 {
        score += 10;
    }
    score += fairness_score / 5;
    score.clamp(60, 100)
}
