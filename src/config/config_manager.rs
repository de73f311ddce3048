// ==========================================
// 果酒压榨台账 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![ConfigScope::Global.scope_id(), key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![ConfigScope::Global.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 读取数值配置；缺失时取默认值，无法解析或不满足 `valid` 时告警并取默认值
    fn get_parsed_or_default<T>(
        &self,
        key: &str,
        default: T,
        valid: fn(&T) -> bool,
    ) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => {
                tracing::debug!(config_key = key, default = %default, "配置未设置，使用默认值");
                return Ok(default);
            }
        };
        match raw.trim().parse::<T>() {
            Ok(v) if valid(&v) => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值无效，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![ConfigScope::Global.scope_id()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 分配引擎配置 =====

    /// 读取分配引擎配置（容差、耗尽阈值、酒批名后缀上限）
    pub fn get_allocation_config(&self) -> Result<AllocationConfig, Box<dyn Error>> {
        let defaults = AllocationConfig::default();
        let positive = |v: &f64| v.is_finite() && *v >= 0.0;

        Ok(AllocationConfig {
            volume_tolerance_l: self.get_parsed_or_default(
                config_keys::VOLUME_TOLERANCE_L,
                defaults.volume_tolerance_l,
                positive,
            )?,
            capacity_tolerance_l: self.get_parsed_or_default(
                config_keys::CAPACITY_TOLERANCE_L,
                defaults.capacity_tolerance_l,
                positive,
            )?,
            fraction_epsilon: self.get_parsed_or_default(
                config_keys::FRACTION_EPSILON,
                defaults.fraction_epsilon,
                |v: &f64| v.is_finite() && *v > 0.0,
            )?,
            depletion_epsilon_kg: self.get_parsed_or_default(
                config_keys::DEPLETION_EPSILON_KG,
                defaults.depletion_epsilon_kg,
                positive,
            )?,
            batch_name_max_suffix: self.get_parsed_or_default(
                config_keys::BATCH_NAME_MAX_SUFFIX,
                defaults.batch_name_max_suffix,
                |v: &u32| *v >= 2,
            )?,
        })
    }
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone)]
pub enum ConfigScope {
    Global, // 全局（当前唯一使用的作用域）
}

impl ConfigScope {
    pub fn scope_id(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分配容差
    pub const VOLUME_TOLERANCE_L: &str = "allocation/volume_tolerance_l";
    pub const CAPACITY_TOLERANCE_L: &str = "allocation/capacity_tolerance_l";
    pub const FRACTION_EPSILON: &str = "allocation/fraction_epsilon";

    // 采购批次耗尽判定
    pub const DEPLETION_EPSILON_KG: &str = "allocation/depletion_epsilon_kg";

    // 命名
    pub const BATCH_NAME_MAX_SUFFIX: &str = "naming/batch_name_max_suffix";
}
