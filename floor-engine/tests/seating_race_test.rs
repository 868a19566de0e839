//! 并发排位压力测试
//!
//! 多个独立请求同时竞争同一批桌台：条件更新是唯一的互斥机制，
//! 任何交错下都不允许双重占桌，输家必须拿到可重试的 Conflict
//! （或基于更新快照的 NoSuitableTable），而不是脏数据。

use floor_engine::db::repository::{dining_table, waiter, waitlist};
use floor_engine::{
    AssignmentOptions, EngineConfig, LedgerAction, LedgerQuery, SeatingEngine, SeatingError,
};
use futures::future::join_all;
use rand::Rng;
use shared::models::{DiningTableCreate, PriorityClass, TableState, WaiterCreate, WaitlistCreate};
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

async fn setup_floor(engine: &SeatingEngine, sections: &[(i64, &[i32])]) {
    for (section, capacities) in sections {
        let w = waiter::create(
            engine.pool(),
            WaiterCreate {
                name: format!("waiter-{section}"),
            },
        )
        .await
        .unwrap();
        waiter::start_shift(engine.pool(), w.id, *section, now_millis())
            .await
            .unwrap();
        for (i, capacity) in capacities.iter().enumerate() {
            dining_table::create(
                engine.pool(),
                DiningTableCreate {
                    name: format!("S{section}-T{i}"),
                    capacity: Some(*capacity),
                    section: Some(*section),
                },
            )
            .await
            .unwrap();
        }
    }
}

async fn add_parties(engine: &SeatingEngine, sizes: &[i32]) -> Vec<i64> {
    let mut ids = Vec::new();
    for (i, size) in sizes.iter().enumerate() {
        let entry = waitlist::create(
            engine.pool(),
            WaitlistCreate {
                party_name: format!("party-{i}"),
                party_size: *size,
                priority: PriorityClass::Normal,
            },
        )
        .await
        .unwrap();
        ids.push(entry.id);
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_table_many_requests_exactly_one_winner() {
    let (_dir, engine) = test_engine().await;
    setup_floor(&engine, &[(1, &[4])]).await;
    let parties = add_parties(&engine, &[4; 16]).await;

    let tasks: Vec<_> = parties
        .iter()
        .enumerate()
        .map(|(i, &party_id)| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .seat_from_waitlist(party_id, i as i64, &AssignmentOptions::default())
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut losers = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(SeatingError::Conflict(_)) | Err(SeatingError::NoSuitableTable) => losers += 1,
            Err(other) => panic!("unexpected failure mode: {other}"),
        }
    }
    assert_eq!(successes, 1, "exactly one request may win the table");
    assert_eq!(losers, 15);

    // The table ended occupied exactly once, with exactly one ledger entry
    let tables = dining_table::find_all(engine.pool()).await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].state, TableState::Occupied);

    let (entries, total) = engine
        .ledger()
        .query(&LedgerQuery {
            action: Some(LedgerAction::Assignment),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries.len(), 1);

    // 15 parties are still waiting for the next table
    let waiting = waitlist::find_waiting(engine.pool()).await.unwrap();
    assert_eq!(waiting.len(), 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn floor_wide_race_never_double_books() {
    let (_dir, engine) = test_engine().await;
    setup_floor(
        &engine,
        &[(1, &[2, 4, 4, 6]), (2, &[2, 4, 4, 6]), (3, &[2, 4, 4, 6])],
    )
    .await;

    let sizes: Vec<i32> = {
        let mut rng = rand::thread_rng();
        (0..30).map(|_| rng.gen_range(2..=5)).collect()
    };
    let parties = add_parties(&engine, &sizes).await;

    let tasks: Vec<_> = parties
        .iter()
        .enumerate()
        .map(|(i, &party_id)| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .seat_from_waitlist(party_id, i as i64, &AssignmentOptions::default())
                    .await
            })
        })
        .collect();

    let mut won_tables = Vec::new();
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(outcome) => won_tables.push(outcome.table.id),
            Err(SeatingError::Conflict(_)) | Err(SeatingError::NoSuitableTable) => {}
            Err(other) => panic!("unexpected failure mode: {other}"),
        }
    }
    assert!(!won_tables.is_empty());

    // No table was handed to two parties
    let mut deduped = won_tables.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), won_tables.len(), "double-booked table");

    // Every success is visible as exactly one occupied table + one
    // ledger entry + one seated party — never a partial commit
    let tables = dining_table::find_all(engine.pool()).await.unwrap();
    let occupied = tables
        .iter()
        .filter(|t| t.state == TableState::Occupied)
        .count();
    assert_eq!(occupied, won_tables.len());

    let (_, assignments) = engine
        .ledger()
        .query(&LedgerQuery {
            action: Some(LedgerAction::Assignment),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(assignments, won_tables.len() as u64);

    let waiting = waitlist::find_waiting(engine.pool()).await.unwrap();
    assert_eq!(waiting.len(), 30 - won_tables.len());

    // The hash chain survives arbitrary interleaving
    let verification = engine.verify_ledger().await.unwrap();
    assert!(verification.chain_intact);
    assert_eq!(verification.total_entries, won_tables.len() as u64);
}
