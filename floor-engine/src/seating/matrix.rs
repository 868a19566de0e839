//! Fairness Matrix Builder
//!
//! Derives, on demand, a `waiters × party-size buckets` count matrix
//! from the seating ledger, plus a scalar fairness score. Pure function
//! of its inputs; nothing here touches storage, and nothing is cached
//! beyond the ledger itself.

use std::collections::HashMap;

use serde::Serialize;
use shared::models::Waiter;

use crate::ledger::BucketCount;

/// Number of party-size buckets: 1, 2, 3, 4, 5, 6+
pub const PARTY_SIZE_BUCKETS: usize = 6;

/// Bucket index for a party size: `1→0, 2→1, 3→2, 4→3, 5→4, ≥6→5`
pub fn party_size_bucket(party_size: i32) -> usize {
    match party_size {
        ..=1 => 0,
        2 => 1,
        3 => 2,
        4 => 3,
        5 => 4,
        _ => 5,
    }
}

/// Dense per-shift fairness state
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessMatrix {
    rows: Vec<[i64; PARTY_SIZE_BUCKETS]>,
    index: HashMap<i64, usize>,
    waiter_ids: Vec<i64>,
    /// 100 = perfectly even workload, lower = more skewed
    pub fairness_score: i32,
}

impl FairnessMatrix {
    /// Fold ledger counts into a dense matrix.
    ///
    /// `waiters` fixes the row order (callers pass them in section
    /// order). Counts for waiters not in the list — gone off shift
    /// since the entries were written — are dropped. A waiter with no
    /// ledger entries keeps an all-zero row; that is expected, not an
    /// error.
    pub fn build(waiters: &[Waiter], counts: &[BucketCount]) -> Self {
        let mut rows = vec![[0i64; PARTY_SIZE_BUCKETS]; waiters.len()];
        let index: HashMap<i64, usize> = waiters
            .iter()
            .enumerate()
            .map(|(row, w)| (w.id, row))
            .collect();

        for c in counts {
            if let Some(&row) = index.get(&c.waiter_id) {
                rows[row][party_size_bucket(c.party_size)] += c.n;
            }
        }

        let totals: Vec<i64> = rows.iter().map(|r| r.iter().sum()).collect();
        let fairness_score = fairness_score(&totals);

        Self {
            rows,
            index,
            waiter_ids: waiters.iter().map(|w| w.id).collect(),
            fairness_score,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Waiter ids in row order
    pub fn waiter_ids(&self) -> &[i64] {
        &self.waiter_ids
    }

    pub fn row(&self, waiter_id: i64) -> Option<&[i64; PARTY_SIZE_BUCKETS]> {
        self.index.get(&waiter_id).map(|&row| &self.rows[row])
    }

    /// Assignments of this bucket size handled by the waiter today
    pub fn count(&self, waiter_id: i64, bucket: usize) -> Option<i64> {
        self.row(waiter_id).map(|r| r[bucket])
    }

    /// Total assignments handled by the waiter today, across all sizes
    pub fn total(&self, waiter_id: i64) -> Option<i64> {
        self.row(waiter_id).map(|r| r.iter().sum())
    }

    /// Serializable snapshot for observability/UI
    pub fn to_report(&self) -> FairnessReport {
        FairnessReport {
            matrix: self.rows.iter().map(|r| r.to_vec()).collect(),
            waiter_index: self.index.clone(),
            waiters: self.waiter_ids.clone(),
            fairness_score: self.fairness_score,
        }
    }
}

/// `100 − round(10 × variance(per-waiter totals))`, floored at 0.
///
/// An empty floor scores 100: with nothing to distribute, the shift is
/// perfectly fair by definition.
fn fairness_score(totals: &[i64]) -> i32 {
    if totals.is_empty() {
        return 100;
    }
    let n = totals.len() as f64;
    let mean = totals.iter().sum::<i64>() as f64 / n;
    let variance = totals
        .iter()
        .map(|&t| {
            let d = t as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    ((100.0 - 10.0 * variance).round() as i32).max(0)
}

/// Fairness matrix snapshot returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct FairnessReport {
    /// `matrix[row][bucket]` assignment counts
    pub matrix: Vec<Vec<i64>>,
    /// Waiter id → row index
    pub waiter_index: HashMap<i64, usize>,
    /// Waiter ids in row order
    pub waiters: Vec<i64>,
    pub fairness_score: i32,
}
