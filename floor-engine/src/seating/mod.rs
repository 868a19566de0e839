//! Seating Module - 公平排位引擎
//!
//! Three layers, leaf first:
//! - [`matrix`]: the fairness matrix, a pure fold over the ledger
//! - [`selector`]: deterministic (waiter, table) choice for a party
//! - [`coordinator`]: the transactional orchestrator — the only code
//!   allowed to mutate table/waitlist occupancy

pub mod coordinator;
pub mod error;
pub mod matrix;
pub mod selector;


pub use error::{SeatingError, SeatingResult};
pub use matrix::{FairnessMatrix, FairnessReport, PARTY_SIZE_BUCKETS, party_size_bucket};
pub use selector::{Assignment, AssignmentOptions, CAPACITY_SLACK, select_assignment};

use shared::models::{DiningTable, Waiter, WaitlistEntry};
use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::db::{DbService, repository};
use crate::ledger::{ChainVerification, LedgerStorage};
use crate::utils::time;

/// Committed result of a seating operation
#[derive(Debug, Clone, serde::Serialize)]
pub struct SeatingOutcome {
    pub assignment: Assignment,
    pub table: DiningTable,
    /// The advanced waitlist entry (walk-ins have none)
    pub party: Option<WaitlistEntry>,
}

/// Read-only view of the floor used for one selection round
#[derive(Debug)]
pub(crate) struct FloorSnapshot {
    pub tables: Vec<DiningTable>,
    pub waiters: Vec<Waiter>,
    pub matrix: FairnessMatrix,
}

/// 排位引擎 - the single component permitted to mutate table and
/// waitlist occupancy. Holds the pool, the ledger and the config;
/// cloning is cheap (shared pool).
#[derive(Clone)]
pub struct SeatingEngine {
    pool: SqlitePool,
    ledger: LedgerStorage,
    config: EngineConfig,
}

impl SeatingEngine {
    /// Open the database at `config.db_path` and build an engine on it.
    pub async fn new(config: EngineConfig) -> SeatingResult<Self> {
        let db = DbService::new(&config.db_path).await?;
        Ok(Self::from_pool(db.pool, config))
    }

    /// Build an engine over an existing pool (shared with collaborators).
    pub fn from_pool(pool: SqlitePool, config: EngineConfig) -> Self {
        let ledger = LedgerStorage::new(pool.clone());
        Self {
            pool,
            ledger,
            config,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn ledger(&self) -> &LedgerStorage {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start of the current business day — the fairness window.
    pub(crate) fn fairness_window_start(&self) -> i64 {
        time::business_day_start(self.config.business_day_cutoff, self.config.timezone)
    }

    /// All reads happen here, before any write is attempted.
    pub(crate) async fn snapshot(&self) -> SeatingResult<FloorSnapshot> {
        let tables = repository::dining_table::find_available(&self.pool).await?;
        let waiters = repository::waiter::find_eligible(&self.pool).await?;
        let counts = self
            .ledger
            .counts_since(self.fairness_window_start())
            .await?;
        let matrix = FairnessMatrix::build(&waiters, &counts);
        Ok(FloorSnapshot {
            tables,
            waiters,
            matrix,
        })
    }

    /// Propose the best (waiter, table) pair for a party without
    /// committing anything. `Ok(None)` means no suitable pair exists
    /// right now.
    pub async fn find_assignment(
        &self,
        party_size: i32,
        options: &AssignmentOptions,
    ) -> SeatingResult<Option<Assignment>> {
        validate_party_size(party_size)?;
        let snap = self.snapshot().await?;
        Ok(select_assignment(
            party_size,
            &snap.tables,
            &snap.waiters,
            &snap.matrix,
            options,
        ))
    }

    /// Current fairness matrix for observability/UI.
    pub async fn fairness_matrix(&self) -> SeatingResult<FairnessReport> {
        let waiters = repository::waiter::find_eligible(&self.pool).await?;
        let counts = self
            .ledger
            .counts_since(self.fairness_window_start())
            .await?;
        Ok(FairnessMatrix::build(&waiters, &counts).to_report())
    }

    /// Walk the ledger hash chain end to end.
    pub async fn verify_ledger(&self) -> SeatingResult<ChainVerification> {
        Ok(self.ledger.verify_chain().await?)
    }
}

pub(crate) fn validate_party_size(party_size: i32) -> SeatingResult<()> {
    if !(1..=20).contains(&party_size) {
        return Err(SeatingError::Rejected(format!(
            "Party size must be between 1 and 20, got {party_size}"
        )));
    }
    Ok(())
}
