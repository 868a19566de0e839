//! 时间工具函数 — 营业日窗口
//!
//! 公平矩阵的统计窗口是"当前营业日"：从业务时区的 cutoff 时间点
//! 起算，而不是自然日零点。所有转换在这里完成，存储层只接收
//! `i64` Unix millis。

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

/// 解析 cutoff 时间字符串 (HH:MM)，失败返回 00:00
pub fn parse_cutoff(cutoff: &str) -> NaiveTime {
    NaiveTime::parse_from_str(cutoff, "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse business_day_cutoff '{}': {}, falling back to 00:00",
            cutoff,
            e
        );
        NaiveTime::MIN
    })
}

/// 日期 + cutoff 时间 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_cutoff_millis(date: NaiveDate, cutoff: NaiveTime, tz: Tz) -> i64 {
    let naive = date.and_time(cutoff);
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 当前营业日的起始时间戳 (业务时区)
///
/// 当前时间 < cutoff → 还在"昨天"的营业日
pub fn business_day_start(cutoff: NaiveTime, tz: Tz) -> i64 {
    let now_local = chrono::Utc::now().with_timezone(&tz);
    let mut date = now_local.date_naive();
    if now_local.time() < cutoff {
        date = date.pred_opt().unwrap_or(date);
    }
    date_cutoff_millis(date, cutoff, tz)
}
