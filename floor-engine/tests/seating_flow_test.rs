//! End-to-end seating flows against a real SQLite database:
//! waitlist seating, manual seating, clears, holds, and the fairness
//! bookkeeping each of them must leave behind.

use floor_engine::db::repository::{dining_table, waiter, waitlist};
use floor_engine::{AssignmentOptions, EngineConfig, LedgerAction, SeatingEngine, SeatingError};
use shared::models::{
    DiningTableCreate, PriorityClass, TableState, WaiterCreate, WaitlistCreate, WaitlistStatus,
};
use shared::util::now_millis;
use tempfile::TempDir;

async fn test_engine() -> (TempDir, SeatingEngine) {
    let dir = TempDir::new().expect("temp dir");
    let config = EngineConfig {
        db_path: dir.path().join("floor.db").to_string_lossy().into_owned(),
        ..EngineConfig::default()
    };
    let engine = SeatingEngine::new(config).await.expect("engine");
    (dir, engine)
}

async fn add_waiter(engine: &SeatingEngine, name: &str, section: i64) -> i64 {
    let w = waiter::create(engine.pool(), WaiterCreate { name: name.into() })
        .await
        .unwrap();
    waiter::start_shift(engine.pool(), w.id, section, now_millis())
        .await
        .unwrap();
    w.id
}

async fn add_table(engine: &SeatingEngine, name: &str, capacity: i32, section: i64) -> i64 {
    dining_table::create(
        engine.pool(),
        DiningTableCreate {
            name: name.into(),
            capacity: Some(capacity),
            section: Some(section),
        },
    )
    .await
    .unwrap()
    .id
}

async fn add_party(engine: &SeatingEngine, name: &str, size: i32) -> i64 {
    waitlist::create(
        engine.pool(),
        WaitlistCreate {
            party_name: name.into(),
            party_size: size,
            priority: PriorityClass::Normal,
        },
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn seat_from_waitlist_commits_all_mutations() {
    let (_dir, engine) = test_engine().await;
    let w1 = add_waiter(&engine, "Ana", 1).await;
    let _w2 = add_waiter(&engine, "Bruno", 2).await;
    let t1 = add_table(&engine, "M1", 4, 1).await;
    let _t2 = add_table(&engine, "M2", 4, 2).await;
    let party_id = add_party(&engine, "Familia Ortega", 4).await;

    let outcome = engine
        .seat_from_waitlist(party_id, 900, &AssignmentOptions::default())
        .await
        .unwrap();

    // Zeroed matrix ties break to the first section
    assert_eq!(outcome.assignment.waiter_id, w1);
    assert_eq!(outcome.assignment.table_id, t1);
    assert_eq!(outcome.assignment.confidence, 100);

    // Table occupied with the party size recorded
    assert_eq!(outcome.table.state, TableState::Occupied);
    assert_eq!(outcome.table.party_size, Some(4));

    // Waitlist advanced with the chosen pair and a timestamp
    let party = outcome.party.unwrap();
    assert_eq!(party.status, WaitlistStatus::Seated);
    assert_eq!(party.table_id, Some(t1));
    assert_eq!(party.waiter_id, Some(w1));
    assert!(party.seated_at.is_some());

    // Exactly one ledger entry, carrying enough to reconstruct the call
    let entries = engine.ledger().query_last(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, LedgerAction::Assignment);
    assert_eq!(entry.party_id, Some(party_id));
    assert_eq!(entry.waiter_id, Some(w1));
    assert_eq!(entry.requested_by, Some(900));
    assert_eq!(entry.details["algorithm"], "fairness_v1");
    assert_eq!(entry.details["party_name"], "Familia Ortega");

    // Fairness monotonicity: exactly one cell incremented
    let report = engine.fairness_matrix().await.unwrap();
    let row = report.waiter_index[&w1];
    for (r, cells) in report.matrix.iter().enumerate() {
        for (b, &n) in cells.iter().enumerate() {
            let expected = if r == row && b == 3 { 1 } else { 0 };
            assert_eq!(n, expected, "cell [{r}][{b}]");
        }
    }
}

#[tokio::test]
async fn fairness_rotates_between_waiters() {
    let (_dir, engine) = test_engine().await;
    let w1 = add_waiter(&engine, "Ana", 1).await;
    let w2 = add_waiter(&engine, "Bruno", 2).await;
    for (name, section) in [("M1", 1), ("M2", 1), ("M3", 2), ("M4", 2)] {
        add_table(&engine, name, 4, section).await;
    }

    let mut seated_with = Vec::new();
    for i in 0..4 {
        let party = add_party(&engine, &format!("party-{i}"), 4).await;
        let outcome = engine
            .seat_from_waitlist(party, 1, &AssignmentOptions::default())
            .await
            .unwrap();
        seated_with.push(outcome.assignment.waiter_id);
    }

    // Strict alternation: the waiter who just took a 4-top is behind
    assert_eq!(seated_with, vec![w1, w2, w1, w2]);

    let report = engine.fairness_matrix().await.unwrap();
    assert_eq!(report.fairness_score, 100);
}

#[tokio::test]
async fn no_suitable_table_is_an_expected_outcome() {
    let (_dir, engine) = test_engine().await;
    add_waiter(&engine, "Ana", 1).await;
    // Only a 2-top on the floor; a party of 6 cannot be placed
    add_table(&engine, "M1", 2, 1).await;
    let party_id = add_party(&engine, "big group", 6).await;

    let err = engine
        .seat_from_waitlist(party_id, 1, &AssignmentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SeatingError::NoSuitableTable));
    assert!(!err.is_retryable());

    // Nothing was committed
    let party = waitlist::find_by_id(engine.pool(), party_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(party.status, WaitlistStatus::Waiting);
    assert!(engine.ledger().query_last(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn processed_parties_are_rejected() {
    let (_dir, engine) = test_engine().await;
    add_waiter(&engine, "Ana", 1).await;
    add_table(&engine, "M1", 4, 1).await;
    add_table(&engine, "M2", 4, 1).await;

    let party_id = add_party(&engine, "Ortega", 4).await;
    engine
        .seat_from_waitlist(party_id, 1, &AssignmentOptions::default())
        .await
        .unwrap();

    // Already seated
    let err = engine
        .seat_from_waitlist(party_id, 1, &AssignmentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));

    // Cancelled
    let cancelled = add_party(&engine, "late cancel", 2).await;
    waitlist::cancel(engine.pool(), cancelled).await.unwrap();
    let err = engine
        .seat_from_waitlist(cancelled, 1, &AssignmentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));

    // No-show
    let ghosted = add_party(&engine, "ghosted", 2).await;
    waitlist::mark_no_show(engine.pool(), ghosted).await.unwrap();
    let err = engine
        .seat_from_waitlist(ghosted, 1, &AssignmentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));

    // Unknown party
    let err = engine
        .seat_from_waitlist(424242, 1, &AssignmentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));
}

#[tokio::test]
async fn party_size_bounds_are_enforced() {
    let (_dir, engine) = test_engine().await;
    add_waiter(&engine, "Ana", 1).await;
    let table_id = add_table(&engine, "M1", 4, 1).await;

    for size in [0, 21] {
        let err = engine
            .find_assignment(size, &AssignmentOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SeatingError::Rejected(_)));

        let err = engine.seat_manually(table_id, size, 1).await.unwrap_err();
        assert!(matches!(err, SeatingError::Rejected(_)));
    }

    // The waitlist collaborator rejects out-of-range parties up front
    let err = waitlist::create(
        engine.pool(),
        WaitlistCreate {
            party_name: "too many".into(),
            party_size: 21,
            priority: PriorityClass::Normal,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        floor_engine::db::repository::RepoError::Validation(_)
    ));
}

#[tokio::test]
async fn manual_seating_shares_the_fairness_ledger() {
    let (_dir, engine) = test_engine().await;
    let w1 = add_waiter(&engine, "Ana", 1).await;
    let w2 = add_waiter(&engine, "Bruno", 2).await;
    let t1 = add_table(&engine, "M1", 4, 1).await;
    add_table(&engine, "M2", 4, 1).await;
    add_table(&engine, "M3", 4, 2).await;

    // Walk-in seated at Ana's table
    let outcome = engine.seat_manually(t1, 3, 7).await.unwrap();
    assert_eq!(outcome.assignment.waiter_id, w1);
    assert_eq!(outcome.assignment.algorithm, "manual");
    assert!(outcome.party.is_none());
    assert_eq!(outcome.table.state, TableState::Occupied);

    let entries = engine.ledger().query_last(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].details["algorithm"], "manual");
    assert_eq!(entries[0].party_id, None);

    // The walk-in counts toward fairness: the next 3-top goes to Bruno
    let party = add_party(&engine, "next", 3).await;
    let outcome = engine
        .seat_from_waitlist(party, 1, &AssignmentOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.assignment.waiter_id, w2);
}

#[tokio::test]
async fn manual_seating_preconditions() {
    let (_dir, engine) = test_engine().await;
    add_waiter(&engine, "Ana", 1).await;
    let t1 = add_table(&engine, "M1", 4, 1).await;
    let unstaffed = add_table(&engine, "M9", 4, 9).await;

    // Party larger than the table
    let err = engine.seat_manually(t1, 6, 1).await.unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));

    // No waiter staffs section 9
    let err = engine.seat_manually(unstaffed, 2, 1).await.unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));

    // Occupied table cannot be seated again
    engine.seat_manually(t1, 4, 1).await.unwrap();
    let err = engine.seat_manually(t1, 2, 1).await.unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));
}

#[tokio::test]
async fn clear_table_completes_the_cycle() {
    let (_dir, engine) = test_engine().await;
    add_waiter(&engine, "Ana", 1).await;
    let t1 = add_table(&engine, "M1", 4, 1).await;

    engine.seat_manually(t1, 4, 1).await.unwrap();
    let cleared = engine.clear_table(t1, 1).await.unwrap();
    assert_eq!(cleared.state, TableState::Available);
    assert_eq!(cleared.party_size, None);

    let entries = engine.ledger().query_last(10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, LedgerAction::TableCleared);
    assert_eq!(entries[0].party_size, Some(4));

    // Clearing an available table is a caller error
    let err = engine.clear_table(t1, 1).await.unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));

    // The table can be seated again after the clear
    engine.seat_manually(t1, 2, 1).await.unwrap();
}

#[tokio::test]
async fn held_tables_leave_the_floor_until_cleared() {
    let (_dir, engine) = test_engine().await;
    add_waiter(&engine, "Ana", 1).await;
    let t1 = add_table(&engine, "M1", 4, 1).await;

    let held = engine.hold_table(t1).await.unwrap();
    assert_eq!(held.state, TableState::Assigned);

    // A held table is not available to either entry path
    let err = engine.seat_manually(t1, 2, 1).await.unwrap_err();
    assert!(matches!(err, SeatingError::Rejected(_)));
    let party = add_party(&engine, "walkover", 4).await;
    let err = engine
        .seat_from_waitlist(party, 1, &AssignmentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SeatingError::NoSuitableTable));

    // Holding twice loses the optimistic race
    let err = engine.hold_table(t1).await.unwrap_err();
    assert!(matches!(err, SeatingError::Conflict(_)));
    assert!(err.is_retryable());

    // Cancellation: assigned → available
    let cleared = engine.clear_table(t1, 1).await.unwrap();
    assert_eq!(cleared.state, TableState::Available);
}

#[tokio::test]
async fn urgent_parties_chase_total_load() {
    let (_dir, engine) = test_engine().await;
    let w1 = add_waiter(&engine, "Ana", 1).await;
    let w2 = add_waiter(&engine, "Bruno", 2).await;
    let a1 = add_table(&engine, "M1", 2, 1).await;
    add_table(&engine, "M2", 2, 1).await;
    add_table(&engine, "M3", 2, 2).await;
    let b1 = add_table(&engine, "M4", 4, 2).await;
    let b2 = add_table(&engine, "M5", 4, 2).await;

    // History: Ana took one deuce (total 1); Bruno took two 4-tops
    // (deuce bucket still empty, total 2)
    engine.seat_manually(a1, 2, 1).await.unwrap();
    engine.clear_table(a1, 1).await.unwrap();
    engine.seat_manually(b1, 4, 1).await.unwrap();
    engine.seat_manually(b2, 4, 1).await.unwrap();

    // Non-urgent deuce: per-bucket fairness picks Bruno (0 deuces)
    let patient = add_party(&engine, "patient", 2).await;
    let outcome = engine
        .seat_from_waitlist(patient, 1, &AssignmentOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.assignment.waiter_id, w2);
    engine.clear_table(outcome.table.id, 1).await.unwrap();

    // Urgent deuce: lightest total wins — Ana (1) over Bruno (3)
    let urgent = add_party(&engine, "waited an hour", 2).await;
    let options = AssignmentOptions {
        urgent_party: true,
        ..Default::default()
    };
    let outcome = engine
        .seat_from_waitlist(urgent, 1, &options)
        .await
        .unwrap();
    assert_eq!(outcome.assignment.waiter_id, w1);
    assert_eq!(outcome.assignment.algorithm, "fairness_v1_urgent");
}
