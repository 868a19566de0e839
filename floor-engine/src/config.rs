//! Engine Configuration

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::utils::time;

/// 引擎配置 - 楼面排位引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | FLOOR_DB_PATH | /var/lib/floor/floor.db | SQLite 数据库路径 |
/// | FLOOR_TIMEZONE | Europe/Madrid | 业务时区 |
/// | BUSINESS_DAY_CUTOFF | 04:00 | 营业日分界时间 (HH:MM) |
/// | COMMIT_TIMEOUT_MS | 10000 | 排位事务提交超时(毫秒) |
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SQLite database path
    pub db_path: String,
    /// Business timezone — the fairness window is "today" in this zone
    pub timezone: Tz,
    /// Business day cutoff: before this local time, the fairness window
    /// still belongs to yesterday's business day
    pub business_day_cutoff: NaiveTime,
    /// Upper bound on a seating commit attempt; an elapsed timeout
    /// surfaces as a retryable conflict
    pub commit_timeout_ms: u64,
}

impl EngineConfig {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let timezone = std::env::var("FLOOR_TIMEZONE")
            .ok()
            .and_then(|v| v.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::Europe::Madrid);

        let cutoff = std::env::var("BUSINESS_DAY_CUTOFF").unwrap_or_else(|_| "04:00".into());

        Self {
            db_path: std::env::var("FLOOR_DB_PATH")
                .unwrap_or_else(|_| "/var/lib/floor/floor.db".into()),
            timezone,
            business_day_cutoff: time::parse_cutoff(&cutoff),
            commit_timeout_ms: std::env::var("COMMIT_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: "floor.db".into(),
            timezone: chrono_tz::Europe::Madrid,
            business_day_cutoff: NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
            commit_timeout_ms: 10_000,
        }
    }
}
