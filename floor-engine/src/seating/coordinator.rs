//! Seating Coordinator
//!
//! The transactional orchestrator: reserves the table, appends the
//! ledger entry and advances the waitlist entry as one atomic unit.
//! All reads happen before the write transaction; the transaction's
//! first statement is the conditional reserve, so an abort at any step
//! leaves nothing to roll back and no reader ever observes an occupied
//! table without its ledger entry.
//!
//! 并发模型：条件更新 (`WHERE state = 'available'`) 是唯一的互斥
//! 机制，没有锁表。输掉竞争返回 Conflict，由调用方决定是否用新
//! 快照重试；协调器自己绝不重试，避免在高争用下掩盖饥饿。

use std::time::Duration;

use serde_json::json;
use shared::models::{DiningTable, TableState, WaitlistEntry, WaitlistStatus};
use shared::util::now_millis;

use super::error::{SeatingError, SeatingResult};
use super::matrix::FairnessMatrix;
use super::selector::{self, ALGORITHM_MANUAL, Assignment, AssignmentOptions};
use super::{SeatingEngine, SeatingOutcome, validate_party_size};
use crate::db::repository::{dining_table, waiter, waitlist};
use crate::ledger::{LedgerAction, LedgerAppend};

impl SeatingEngine {
    /// Seat a waiting party using the fairness selector.
    pub async fn seat_from_waitlist(
        &self,
        party_id: i64,
        requested_by: i64,
        options: &AssignmentOptions,
    ) -> SeatingResult<SeatingOutcome> {
        // LOOKUP_PARTY
        let party = waitlist::find_by_id(&self.pool, party_id)
            .await?
            .ok_or_else(|| SeatingError::Rejected(format!("Party {party_id} not found")))?;
        if party.status != WaitlistStatus::Waiting {
            return Err(SeatingError::Rejected(format!(
                "Party '{}' was already processed ({:?})",
                party.party_name, party.status
            )));
        }
        validate_party_size(party.party_size)?;

        // SELECT_ASSIGNMENT
        let snap = self.snapshot().await?;
        let assignment = selector::select_assignment(
            party.party_size,
            &snap.tables,
            &snap.waiters,
            &snap.matrix,
            options,
        )
        .ok_or(SeatingError::NoSuitableTable)?;

        tracing::info!(
            party = %party.party_name,
            table = %assignment.table_name,
            waiter = %assignment.waiter_name,
            confidence = assignment.confidence,
            "Seating party from waitlist"
        );

        // RESERVE_TABLE → APPEND_LEDGER → ADVANCE_WAITLIST → COMMIT
        let details = json!({
            "algorithm": assignment.algorithm,
            "confidence": assignment.confidence,
            "reason": assignment.reason,
            "party_name": party.party_name,
        });
        let (table, seated) = self
            .commit_seating(&assignment, Some(&party), requested_by, details)
            .await?;

        Ok(SeatingOutcome {
            assignment,
            table,
            party: seated,
        })
    }

    /// Seat a walk-in at a specific table, bypassing the selector but
    /// not the optimistic guard or the ledger append: fairness tracking
    /// is identical regardless of entry path.
    pub async fn seat_manually(
        &self,
        table_id: i64,
        party_size: i32,
        requested_by: i64,
    ) -> SeatingResult<SeatingOutcome> {
        validate_party_size(party_size)?;

        let table = dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or_else(|| SeatingError::Rejected(format!("Table {table_id} not found")))?;
        if table.state != TableState::Available || !table.is_active {
            return Err(SeatingError::Rejected(format!(
                "Table '{}' is not available",
                table.name
            )));
        }
        if table.capacity < party_size {
            return Err(SeatingError::Rejected(format!(
                "Party of {party_size} does not fit table '{}' (capacity {})",
                table.name, table.capacity
            )));
        }
        let Some(section) = table.section else {
            return Err(SeatingError::Rejected(format!(
                "Table '{}' has no section this shift",
                table.name
            )));
        };

        let waiters = waiter::find_eligible(&self.pool).await?;
        let staffing = waiters
            .iter()
            .find(|w| w.section == Some(section))
            .ok_or_else(|| SeatingError::Rejected(format!("No waiter staffs section {section}")))?;

        let counts = self
            .ledger
            .counts_since(self.fairness_window_start())
            .await?;
        let matrix = FairnessMatrix::build(&waiters, &counts);

        let assignment = Assignment {
            table_id: table.id,
            table_name: table.name.clone(),
            waiter_id: staffing.id,
            waiter_name: staffing.name.clone(),
            section,
            party_size,
            confidence: selector::confidence_score(
                table.capacity,
                party_size,
                matrix.fairness_score,
            ),
            reason: format!("Manually seated by operator {requested_by}"),
            algorithm: ALGORITHM_MANUAL,
        };

        tracing::info!(
            table = %assignment.table_name,
            waiter = %assignment.waiter_name,
            party_size,
            "Seating walk-in party manually"
        );

        let details = json!({
            "algorithm": assignment.algorithm,
            "confidence": assignment.confidence,
            "reason": assignment.reason,
        });
        let (table, _) = self
            .commit_seating(&assignment, None, requested_by, details)
            .await?;

        Ok(SeatingOutcome {
            assignment,
            table,
            party: None,
        })
    }

    /// Return a table to the floor (`occupied | assigned → available`),
    /// recording the clear in the ledger.
    pub async fn clear_table(&self, table_id: i64, requested_by: i64) -> SeatingResult<DiningTable> {
        let table = dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or_else(|| SeatingError::Rejected(format!("Table {table_id} not found")))?;
        if table.state == TableState::Available {
            return Err(SeatingError::Rejected(format!(
                "Table '{}' is already available",
                table.name
            )));
        }

        let waiters = waiter::find_eligible(&self.pool).await?;
        let staffing = table
            .section
            .and_then(|s| waiters.into_iter().find(|w| w.section == Some(s)));

        let now = now_millis();
        let mut tx = self.pool.begin().await?;
        let released = dining_table::release(&mut tx, table_id, now).await?;
        if released == 0 {
            return Err(SeatingError::Conflict(format!(
                "Table '{}' was cleared by a concurrent request",
                table.name
            )));
        }
        self.ledger
            .append_in_tx(
                &mut tx,
                LedgerAppend {
                    action: LedgerAction::TableCleared,
                    table_id: table.id,
                    table_name: table.name.clone(),
                    waiter_id: staffing.as_ref().map(|w| w.id),
                    waiter_name: staffing.map(|w| w.name),
                    section: table.section,
                    party_id: None,
                    party_size: table.party_size,
                    requested_by: Some(requested_by),
                    details: json!({ "previous_state": table.state }),
                },
            )
            .await?;
        tx.commit().await?;

        dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or_else(|| {
                SeatingError::Database(format!("Table {table_id} vanished after clear"))
            })
    }

    /// Hold an available table (`available → assigned`) while the party
    /// walks over. Cancellation goes back through [`Self::clear_table`].
    pub async fn hold_table(&self, table_id: i64) -> SeatingResult<DiningTable> {
        let table = dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or_else(|| SeatingError::Rejected(format!("Table {table_id} not found")))?;

        let held = dining_table::hold(&self.pool, table_id, now_millis()).await?;
        if held == 0 {
            return Err(SeatingError::Conflict(format!(
                "Table '{}' is not available to hold",
                table.name
            )));
        }

        dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or_else(|| SeatingError::Database(format!("Table {table_id} vanished after hold")))
    }

    /// The atomic phase, bounded by the configured commit timeout. An
    /// elapsed timeout drops the transaction (rolling it back) and
    /// surfaces as a retryable conflict — a table is never left stuck
    /// in a transient state with no owning request.
    async fn commit_seating(
        &self,
        assignment: &Assignment,
        party: Option<&WaitlistEntry>,
        requested_by: i64,
        details: serde_json::Value,
    ) -> SeatingResult<(DiningTable, Option<WaitlistEntry>)> {
        let timeout = Duration::from_millis(self.config.commit_timeout_ms);
        match tokio::time::timeout(
            timeout,
            self.commit_seating_inner(assignment, party, requested_by, details),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SeatingError::Conflict("Seating commit timed out".into())),
        }
    }

    async fn commit_seating_inner(
        &self,
        assignment: &Assignment,
        party: Option<&WaitlistEntry>,
        requested_by: i64,
        details: serde_json::Value,
    ) -> SeatingResult<(DiningTable, Option<WaitlistEntry>)> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        // RESERVE_TABLE — the optimistic guard. Zero rows means another
        // request occupied the table between snapshot and commit.
        let reserved =
            dining_table::reserve(&mut tx, assignment.table_id, assignment.party_size, now).await?;
        if reserved == 0 {
            tracing::warn!(
                table = %assignment.table_name,
                "Lost seating race, aborting"
            );
            return Err(SeatingError::Conflict(format!(
                "Table '{}' was taken by a concurrent request",
                assignment.table_name
            )));
        }

        // APPEND_LEDGER — same transaction, so the fairness fold can
        // never miss a committed occupation.
        self.ledger
            .append_in_tx(
                &mut tx,
                LedgerAppend {
                    action: LedgerAction::Assignment,
                    table_id: assignment.table_id,
                    table_name: assignment.table_name.clone(),
                    waiter_id: Some(assignment.waiter_id),
                    waiter_name: Some(assignment.waiter_name.clone()),
                    section: Some(assignment.section),
                    party_id: party.map(|p| p.id),
                    party_size: Some(assignment.party_size),
                    requested_by: Some(requested_by),
                    details,
                },
            )
            .await?;

        // ADVANCE_WAITLIST — conditional on the party still waiting.
        if let Some(party) = party {
            let advanced = waitlist::mark_seated(
                &mut tx,
                party.id,
                assignment.table_id,
                assignment.waiter_id,
                now,
            )
            .await?;
            if advanced == 0 {
                return Err(SeatingError::Conflict(format!(
                    "Party '{}' was processed by a concurrent request",
                    party.party_name
                )));
            }
        }

        // COMMIT
        tx.commit().await?;

        // Hand the committed state back to the caller.
        let table = dining_table::find_by_id(&self.pool, assignment.table_id)
            .await?
            .ok_or_else(|| {
                SeatingError::Database(format!(
                    "Table {} vanished after commit",
                    assignment.table_id
                ))
            })?;
        let seated = match party {
            Some(p) => waitlist::find_by_id(&self.pool, p.id).await?,
            None => None,
        };
        Ok((table, seated))
    }
}
