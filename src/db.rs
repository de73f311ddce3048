// ==========================================
// 果酒压榨台账 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，并发完成压榨时后到的写事务排队等待而不是直接报 busy
// - 提供幂等建表脚本（init_schema），测试与二进制共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 说明：
/// - variety / purchase_lot / vessel 属于外部协作方（采购台账、容器登记）的表，
///   本核心只读取，并且只写 purchase_lot 的消耗/耗尽字段、vessel.status。
/// - merge_history 对 press_run 的外键为 ON DELETE SET NULL：
///   压榨记录被物理删除后，体积流转历史仍然保留。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS variety (
            variety_id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS purchase_lot (
            lot_id TEXT PRIMARY KEY,
            variety_id TEXT NOT NULL,
            vendor_id TEXT NOT NULL,
            total_input_weight_kg REAL NOT NULL,
            total_cost REAL NOT NULL,
            allocated_weight_kg REAL NOT NULL DEFAULT 0,
            depleted INTEGER NOT NULL DEFAULT 0,
            depleted_at TEXT,
            depleted_by TEXT,
            depleted_by_press_run_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS vessel (
            vessel_id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            capacity_l REAL NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS press_run (
            press_run_id TEXT PRIMARY KEY,
            name TEXT UNIQUE,
            press_date TEXT NOT NULL,
            status TEXT NOT NULL,
            total_input_weight_kg REAL NOT NULL DEFAULT 0,
            total_juice_volume_l REAL,
            extraction_rate REAL,
            notes TEXT,
            created_by TEXT NOT NULL,
            completed_at TEXT,
            completed_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS press_load (
            load_id TEXT PRIMARY KEY,
            press_run_id TEXT NOT NULL REFERENCES press_run(press_run_id) ON DELETE CASCADE,
            lot_id TEXT NOT NULL REFERENCES purchase_lot(lot_id),
            sequence INTEGER NOT NULL,
            input_weight_kg REAL NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_press_load_run ON press_load(press_run_id, sequence);

        CREATE TABLE IF NOT EXISTS batch (
            batch_id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            vessel_id TEXT REFERENCES vessel(vessel_id),
            status TEXT NOT NULL,
            current_volume_l REAL NOT NULL,
            origin_press_run_id TEXT REFERENCES press_run(press_run_id) ON DELETE SET NULL,
            start_date TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_batch_vessel ON batch(vessel_id, status);

        CREATE TABLE IF NOT EXISTS batch_composition (
            entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES batch(batch_id) ON DELETE CASCADE,
            lot_id TEXT NOT NULL REFERENCES purchase_lot(lot_id),
            variety_id TEXT NOT NULL,
            input_weight_kg REAL NOT NULL,
            juice_volume_l REAL NOT NULL,
            fraction_of_batch REAL NOT NULL,
            material_cost REAL NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(batch_id, lot_id)
        );

        CREATE TABLE IF NOT EXISTS merge_history (
            merge_id TEXT PRIMARY KEY,
            target_batch_id TEXT NOT NULL REFERENCES batch(batch_id),
            source_press_run_id TEXT REFERENCES press_run(press_run_id) ON DELETE SET NULL,
            source_batch_id TEXT REFERENCES batch(batch_id) ON DELETE SET NULL,
            volume_added_l REAL NOT NULL,
            volume_before_l REAL NOT NULL,
            volume_after_l REAL NOT NULL,
            transfer_loss_l REAL NOT NULL DEFAULT 0,
            notes TEXT,
            merged_at TEXT NOT NULL,
            merged_by TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_merge_history_target ON merge_history(target_batch_id, merged_at);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_action_entity ON action_log(entity_type, entity_id, action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
