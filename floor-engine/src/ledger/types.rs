//! 排位账本类型定义
//!
//! 所有条目不可变、不可删除，支持 SHA256 哈希链防篡改。

use serde::{Deserialize, Serialize};

/// 账本事件类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LedgerAction {
    /// 排位决定：一个 party 被分配到 (桌台, 服务员)
    Assignment,
    /// 桌台清台，回到可用状态
    TableCleared,
}

impl std::fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 账本条目（不可变）
///
/// 每条记录包含 SHA256 哈希链，确保防篡改。
/// - `prev_hash`: 前一条记录的哈希
/// - `curr_hash`: 当前记录的哈希（包含 prev_hash + 所有字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// 全局递增序列号（唯一标识）
    pub sequence: i64,
    /// 时间戳（Unix 毫秒）
    pub timestamp: i64,
    /// 事件类型
    pub action: LedgerAction,
    pub table_id: i64,
    pub table_name: String,
    /// 被分配的服务员（清台事件可为空）
    pub waiter_id: Option<i64>,
    pub waiter_name: Option<String>,
    pub section: Option<i64>,
    /// Waitlist 来源 party（手动排位为空）
    pub party_id: Option<i64>,
    pub party_size: Option<i32>,
    /// 发起操作的主持人/操作员
    pub requested_by: Option<i64>,
    /// 结构化详情（JSON：算法标签、置信度、理由、party 名称）
    pub details: serde_json::Value,
    /// 前一条账本记录哈希
    pub prev_hash: String,
    /// 当前记录哈希（SHA256）
    pub curr_hash: String,
}

/// 追加账本条目请求
#[derive(Debug, Clone)]
pub struct LedgerAppend {
    pub action: LedgerAction,
    pub table_id: i64,
    pub table_name: String,
    pub waiter_id: Option<i64>,
    pub waiter_name: Option<String>,
    pub section: Option<i64>,
    pub party_id: Option<i64>,
    pub party_size: Option<i32>,
    pub requested_by: Option<i64>,
    pub details: serde_json::Value,
}

/// 账本查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerQuery {
    /// 起始时间（Unix 毫秒，含）
    pub from: Option<i64>,
    /// 截止时间（Unix 毫秒，含）
    pub to: Option<i64>,
    /// 事件类型过滤
    pub action: Option<LedgerAction>,
    /// 服务员过滤
    pub waiter_id: Option<i64>,
    /// 分页偏移
    #[serde(default)]
    pub offset: i64,
    /// 分页大小（默认 50）
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            action: None,
            waiter_id: None,
            offset: 0,
            limit: default_limit(),
        }
    }
}

/// 账本列表响应
#[derive(Debug, Serialize)]
pub struct LedgerListResponse {
    pub items: Vec<LedgerEntry>,
    pub total: u64,
}

/// 哈希链验证结果
#[derive(Debug, Serialize)]
pub struct ChainVerification {
    /// 验证的记录总数
    pub total_entries: u64,
    /// 链是否完整
    pub chain_intact: bool,
    /// 断裂点列表
    pub breaks: Vec<ChainBreak>,
}

/// 哈希链断裂点
#[derive(Debug, Serialize)]
pub struct ChainBreak {
    /// 断裂处的序列号
    pub sequence: i64,
    /// 期望的哈希
    pub expected_hash: String,
    /// 实际的哈希
    pub actual_hash: String,
}
