//! 排位账本 (Seating Ledger)
//!
//! Append-only 不可变日志：每一次排位决定写入一条记录，公平矩阵
//! 永远是对本营业日账本的折叠，绝不维护可漂移的计数器。
//! SHA256 哈希链确保防篡改。

pub mod storage;
pub mod types;

pub use storage::{BucketCount, LedgerError, LedgerResult, LedgerStorage};
pub use types::{
    ChainBreak, ChainVerification, LedgerAction, LedgerAppend, LedgerEntry, LedgerListResponse,
    LedgerQuery,
};
