// ==========================================
// 果酒压榨台账 - 命名序列器
// ==========================================
// 压榨批次: {YYYY-MM-DD}-{序号两位}，如 2024-03-15-02
// 酒批: {YYYY-MM-DD}_{品种指纹}_{容器编号}，冲突时追加 _2, _3, ...
// 红线: 候选名称的读取必须与消费它的写入处于同一 IMMEDIATE 事务
// ==========================================

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// 指纹中单独列出的品种数上限
const FINGERPRINT_MAX_VARIETIES: usize = 3;

// ==========================================
// NamingSequencer - 命名序列器（无状态）
// ==========================================
pub struct NamingSequencer;

impl NamingSequencer {
    /// 某日压榨名称的 LIKE 前缀，如 `2024-03-15-`
    pub fn press_run_prefix(date: NaiveDate) -> String {
        format!("{}-", date.format("%Y-%m-%d"))
    }

    /// 根据已有名称计算下一个压榨名称
    ///
    /// # 参数
    /// - `date`: 命名日期
    /// - `existing`: 以该日期前缀开头的已有名称（非数字后缀忽略）
    pub fn next_press_run_name(date: NaiveDate, existing: &[String]) -> String {
        let prefix = Self::press_run_prefix(date);
        let max_seq = existing
            .iter()
            .filter_map(|name| name.strip_prefix(&prefix))
            .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{:02}", prefix, max_seq + 1)
    }

    /// 酒批基础名称
    pub fn batch_base_name(date: NaiveDate, fingerprint: &str, vessel_code: &str) -> String {
        format!("{}_{}_{}", date.format("%Y-%m-%d"), fingerprint, vessel_code)
    }

    /// 在后缀空间内寻找未占用的名称
    ///
    /// # 参数
    /// - `base`: 基础名称（首选）
    /// - `max_suffix`: 最大后缀（含）
    /// - `exists`: 名称占用检查（事务内读取）
    ///
    /// # 返回
    /// - Ok(Some(name)): 可用名称
    /// - Ok(None): 后缀空间耗尽
    pub fn resolve_unique<E, F>(
        base: &str,
        max_suffix: u32,
        mut exists: F,
    ) -> Result<Option<String>, E>
    where
        F: FnMut(&str) -> Result<bool, E>,
    {
        if !exists(base)? {
            return Ok(Some(base.to_string()));
        }
        for suffix in 2..=max_suffix {
            let candidate = format!("{}_{}", base, suffix);
            if !exists(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// 品种指纹
    ///
    /// 按品种标签聚合重量，比例降序（同比例按标签）排列，渲染为 `KIN60-DAB40`；
    /// 超过 3 个品种时其余部分折叠为 `MIX{pct}`。无重量时返回 `MIX0`。
    pub fn variety_fingerprint<'a, I>(weights: I) -> String
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut by_tag: BTreeMap<&str, f64> = BTreeMap::new();
        for (tag, weight) in weights {
            *by_tag.entry(tag).or_insert(0.0) += weight;
        }
        let total: f64 = by_tag.values().sum();
        if total <= 0.0 {
            return "MIX0".to_string();
        }

        let mut ranked: Vec<(&str, f64)> = by_tag
            .into_iter()
            .map(|(tag, w)| (tag, w / total))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut parts: Vec<String> = ranked
            .iter()
            .take(FINGERPRINT_MAX_VARIETIES)
            .map(|(tag, fraction)| format!("{}{}", tag, pct(*fraction)))
            .collect();
        if ranked.len() > FINGERPRINT_MAX_VARIETIES {
            let rest: f64 = ranked[FINGERPRINT_MAX_VARIETIES..].iter().map(|(_, f)| f).sum();
            parts.push(format!("MIX{}", pct(rest)));
        }
        parts.join("-")
    }
}

fn pct(fraction: f64) -> u32 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u32
}
