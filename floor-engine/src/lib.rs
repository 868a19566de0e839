//! Floor Engine - 餐厅楼面排位与公平性引擎
//!
//! Matches waiting parties to physical tables and to the waiter staffing
//! that table's section, while keeping workload distribution across
//! waiters fair over the course of a shift. The engine is a library-style
//! component: it consumes a floor snapshot and a seating request, and
//! produces a committed assignment plus an immutable ledger entry. It
//! knows nothing about sessions, sockets or screens.
//!
//! # 模块结构
//!
//! ```text
//! floor-engine/src/
//! ├── config/        # 配置 (环境变量)
//! ├── db/            # 数据库层 (SQLite + repositories)
//! ├── ledger/        # Append-only 排位账本 (哈希链)
//! ├── seating/       # 公平矩阵、选择器、排位协调器
//! └── utils/         # 日志、营业日窗口
//! ```

pub mod config;
pub mod db;
pub mod ledger;
pub mod seating;
pub mod utils;

// Re-export 公共类型
pub use config::EngineConfig;
pub use db::DbService;
pub use ledger::{
    ChainVerification, LedgerAction, LedgerAppend, LedgerEntry, LedgerQuery, LedgerStorage,
};
pub use seating::{
    Assignment, AssignmentOptions, FairnessMatrix, FairnessReport, SeatingEngine, SeatingError,
    SeatingOutcome, SeatingResult,
};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
