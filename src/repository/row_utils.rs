// ==========================================
// 果酒压榨台账 - 行映射工具
// ==========================================
// 职责: 日期/时间/枚举列的统一读写格式
// 格式: 日期 %Y-%m-%d，时间 %Y-%m-%d %H:%M:%S（与 datetime('now') 一致）
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// 格式化时间戳
pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

/// 格式化日期
pub fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

/// 当前本地时间（秒级精度，便于与库中文本对齐）
pub fn now_ts() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    NaiveDateTime::parse_from_str(&fmt_ts(&now), DATETIME_FMT).unwrap_or(now)
}

/// 解析时间戳列
pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 解析可空时间戳列
pub fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

/// 解析日期列
pub fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 解析枚举列（未知取值视为数据损坏）
pub fn parse_enum<T>(idx: usize, raw: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("未知枚举取值: {}", raw).into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PressRunStatus;

    #[test]
    fn test_ts_roundtrip() {
        let ts = now_ts();
        assert_eq!(parse_ts(0, &fmt_ts(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_parse_enum_unknown() {
        assert!(parse_enum(3, "bogus", PressRunStatus::from_db_str).is_err());
        assert_eq!(
            parse_enum(3, "completed", PressRunStatus::from_db_str).unwrap(),
            PressRunStatus::Completed
        );
    }
}
