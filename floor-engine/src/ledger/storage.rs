//! 排位账本 SQLite 存储层
//!
//! Append-only 设计，没有任何删除/更新接口。
//! SHA256 哈希链确保防篡改。
//!
//! 追加只发生在排位协调器的写事务内部：事务的首条语句已持有
//! SQLite 写锁，链尾读取因此天然串行，不会出现序列号竞争。

use sha2::{Digest, Sha256};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;

use super::types::{
    ChainBreak, ChainVerification, LedgerAction, LedgerAppend, LedgerEntry, LedgerQuery,
};

/// 存储错误
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// SQLite 反序列化用（details 保持原始 JSON 文本，供哈希校验）
#[derive(Debug, Clone, sqlx::FromRow)]
struct LedgerRow {
    sequence: i64,
    timestamp: i64,
    action: LedgerAction,
    table_id: i64,
    table_name: String,
    waiter_id: Option<i64>,
    waiter_name: Option<String>,
    section: Option<i64>,
    party_id: Option<i64>,
    party_size: Option<i32>,
    requested_by: Option<i64>,
    details: String,
    prev_hash: String,
    curr_hash: String,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(r: LedgerRow) -> Self {
        LedgerEntry {
            sequence: r.sequence,
            timestamp: r.timestamp,
            action: r.action,
            table_id: r.table_id,
            table_name: r.table_name,
            waiter_id: r.waiter_id,
            waiter_name: r.waiter_name,
            section: r.section,
            party_id: r.party_id,
            party_size: r.party_size,
            requested_by: r.requested_by,
            details: serde_json::from_str(&r.details).unwrap_or_default(),
            prev_hash: r.prev_hash,
            curr_hash: r.curr_hash,
        }
    }
}

/// 链尾：最后一条记录的序列号和哈希
#[derive(Debug, sqlx::FromRow)]
struct ChainTail {
    sequence: i64,
    curr_hash: String,
}

/// 公平矩阵折叠用：某服务员、某 party 人数的分配次数
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct BucketCount {
    pub waiter_id: i64,
    pub party_size: i32,
    pub n: i64,
}

const COLUMNS: &str = "sequence, timestamp, action, table_id, table_name, waiter_id, waiter_name, section, party_id, party_size, requested_by, details, prev_hash, curr_hash";

/// 排位账本存储 (SQLite)
///
/// Append-only 设计：
/// - 仅提供 `append_in_tx` 和查询方法
/// - 没有 delete/update 接口
/// - SHA256 哈希链确保完整性
#[derive(Clone)]
pub struct LedgerStorage {
    pool: SqlitePool,
}

impl LedgerStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在调用方的写事务内追加一条账本记录
    ///
    /// 1. 读取链尾（序列号 + last_hash）
    /// 2. 计算新条目的哈希
    /// 3. 写入条目
    ///
    /// 调用方必须已在同一事务内完成首条写语句（持有写锁），
    /// 保证链尾读取与插入之间没有并发追加。
    pub async fn append_in_tx(
        &self,
        conn: &mut SqliteConnection,
        req: LedgerAppend,
    ) -> LedgerResult<LedgerEntry> {
        // 1. 读取链尾
        let tail = sqlx::query_as::<_, ChainTail>(
            "SELECT sequence, curr_hash FROM seating_ledger ORDER BY sequence DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await?;

        let (sequence, prev_hash) = match tail {
            Some(tail) => (tail.sequence + 1, tail.curr_hash),
            None => (1, "genesis".to_string()),
        };

        // 2. 计算哈希（所有存储字段参与；details 以最终落库的 JSON 文本参与）
        let timestamp = shared::util::now_millis();
        let details_json = serde_json::to_string(&req.details)?;
        let curr_hash = compute_entry_hash(
            &prev_hash,
            sequence,
            timestamp,
            &req.action,
            req.table_id,
            &req.table_name,
            req.waiter_id,
            req.waiter_name.as_deref(),
            req.section,
            req.party_id,
            req.party_size,
            req.requested_by,
            &details_json,
        );

        // 3. 写入
        sqlx::query(
            "INSERT INTO seating_ledger (sequence, timestamp, action, table_id, table_name, waiter_id, waiter_name, section, party_id, party_size, requested_by, details, prev_hash, curr_hash) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sequence)
        .bind(timestamp)
        .bind(req.action)
        .bind(req.table_id)
        .bind(req.table_name.clone())
        .bind(req.waiter_id)
        .bind(req.waiter_name.clone())
        .bind(req.section)
        .bind(req.party_id)
        .bind(req.party_size)
        .bind(req.requested_by)
        .bind(details_json)
        .bind(prev_hash.clone())
        .bind(curr_hash.clone())
        .execute(&mut *conn)
        .await?;

        Ok(LedgerEntry {
            sequence,
            timestamp,
            action: req.action,
            table_id: req.table_id,
            table_name: req.table_name,
            waiter_id: req.waiter_id,
            waiter_name: req.waiter_name,
            section: req.section,
            party_id: req.party_id,
            party_size: req.party_size,
            requested_by: req.requested_by,
            details: req.details,
            prev_hash,
            curr_hash,
        })
    }

    /// 查询账本
    pub async fn query(&self, q: &LedgerQuery) -> LedgerResult<(Vec<LedgerEntry>, u64)> {
        let mut conditions = Vec::new();

        if q.from.is_some() {
            conditions.push("timestamp >= ?");
        }
        if q.to.is_some() {
            conditions.push("timestamp <= ?");
        }
        if q.action.is_some() {
            conditions.push("action = ?");
        }
        if q.waiter_id.is_some() {
            conditions.push("waiter_id = ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM seating_ledger{where_clause}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(from) = q.from {
            count_q = count_q.bind(from);
        }
        if let Some(to) = q.to {
            count_q = count_q.bind(to);
        }
        if let Some(action) = q.action {
            count_q = count_q.bind(action);
        }
        if let Some(waiter_id) = q.waiter_id {
            count_q = count_q.bind(waiter_id);
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT {COLUMNS} FROM seating_ledger{where_clause} ORDER BY sequence DESC LIMIT ? OFFSET ?"
        );
        let mut select_q = sqlx::query_as::<_, LedgerRow>(&select_sql);
        if let Some(from) = q.from {
            select_q = select_q.bind(from);
        }
        if let Some(to) = q.to {
            select_q = select_q.bind(to);
        }
        if let Some(action) = q.action {
            select_q = select_q.bind(action);
        }
        if let Some(waiter_id) = q.waiter_id {
            select_q = select_q.bind(waiter_id);
        }
        let rows = select_q
            .bind(q.limit)
            .bind(q.offset)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows.into_iter().map(LedgerEntry::from).collect();
        Ok((entries, total as u64))
    }

    /// 查询最后 N 条账本记录（倒序）
    pub async fn query_last(&self, count: i64) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {COLUMNS} FROM seating_ledger ORDER BY sequence DESC LIMIT ?"
        ))
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    /// 公平矩阵折叠：自 `from` 起每个 (服务员, party 人数) 的分配次数
    pub async fn counts_since(&self, from: i64) -> LedgerResult<Vec<BucketCount>> {
        let counts = sqlx::query_as::<_, BucketCount>(
            "SELECT waiter_id, party_size, COUNT(*) AS n FROM seating_ledger WHERE action = 'assignment' AND timestamp >= ? AND waiter_id IS NOT NULL AND party_size IS NOT NULL GROUP BY waiter_id, party_size",
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// 验证整条哈希链
    ///
    /// 逐条检查：prev_hash 链接 + 按存储字段重算 curr_hash。
    pub async fn verify_chain(&self) -> LedgerResult<ChainVerification> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {COLUMNS} FROM seating_ledger ORDER BY sequence ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut breaks = Vec::new();
        let mut expected_prev = "genesis".to_string();

        for row in &rows {
            if row.prev_hash != expected_prev {
                breaks.push(ChainBreak {
                    sequence: row.sequence,
                    expected_hash: expected_prev.clone(),
                    actual_hash: row.prev_hash.clone(),
                });
            }
            let recomputed = compute_entry_hash(
                &row.prev_hash,
                row.sequence,
                row.timestamp,
                &row.action,
                row.table_id,
                &row.table_name,
                row.waiter_id,
                row.waiter_name.as_deref(),
                row.section,
                row.party_id,
                row.party_size,
                row.requested_by,
                &row.details,
            );
            if recomputed != row.curr_hash {
                breaks.push(ChainBreak {
                    sequence: row.sequence,
                    expected_hash: recomputed,
                    actual_hash: row.curr_hash.clone(),
                });
            }
            expected_prev = row.curr_hash.clone();
        }

        Ok(ChainVerification {
            total_entries: rows.len() as u64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}

/// 计算账本条目的 SHA256 哈希
///
/// 所有存储字段参与哈希，任何修改都会导致不匹配。
///
/// 设计要点：
/// - 变长字段间用 `\x00` 分隔，防止 `("ab","cd")` 与 `("abc","d")` 碰撞
/// - 定长字段（i64/i32）用 LE 字节序，无需分隔
/// - Optional 字段用 `\x00`=None / `\x01`+bytes=Some 区分，避免 None 与空值碰撞
/// - action 使用 serde 序列化（snake_case，跨版本稳定），而非 Debug trait
/// - details 以落库的 JSON 文本参与哈希，校验时直接取存储文本重算
#[allow(clippy::too_many_arguments)]
fn compute_entry_hash(
    prev_hash: &str,
    sequence: i64,
    timestamp: i64,
    action: &LedgerAction,
    table_id: i64,
    table_name: &str,
    waiter_id: Option<i64>,
    waiter_name: Option<&str>,
    section: Option<i64>,
    party_id: Option<i64>,
    party_size: Option<i32>,
    requested_by: Option<i64>,
    details_json: &str,
) -> String {
    let mut hasher = Sha256::new();

    // 链接前一条哈希
    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\x00");

    // 定长字段
    hasher.update(sequence.to_le_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update(table_id.to_le_bytes());

    // action — serde snake_case (稳定格式，与 DB 存储一致)
    let action_str = serde_json::to_string(action).unwrap_or_default();
    hasher.update(action_str.as_bytes());
    hasher.update(b"\x00");

    hasher.update(table_name.as_bytes());
    hasher.update(b"\x00");

    // Optional 字段 — tag byte 区分 None/Some
    hash_optional_i64(&mut hasher, waiter_id);
    hash_optional_str(&mut hasher, waiter_name);
    hash_optional_i64(&mut hasher, section);
    hash_optional_i64(&mut hasher, party_id);
    hash_optional_i64(&mut hasher, party_size.map(i64::from));
    hash_optional_i64(&mut hasher, requested_by);

    // details JSON 文本
    hasher.update(details_json.as_bytes());
    hasher.update(b"\x00");

    format!("{:x}", hasher.finalize())
}

/// Optional 字符串哈希：`\x00` = None, `\x01` + bytes + `\x00` = Some
fn hash_optional_str(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}

/// Optional 整数哈希：`\x00` = None, `\x01` + LE bytes = Some
fn hash_optional_i64(hasher: &mut Sha256, value: Option<i64>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.to_le_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
}
