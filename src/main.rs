// ==========================================
// 果酒压榨台账 - 数据库初始化入口
// ==========================================
// 职责: 初始化日志、打开/创建数据库、建表，并输出 schema 版本与生效配置
// ==========================================

use anyhow::Context;
use press_ledger::app::{get_default_db_path, AppState};
use press_ledger::db::read_schema_version;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    press_ledger::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 系统版本: {}", press_ledger::APP_NAME, press_ledger::VERSION);
    tracing::info!("==================================================");

    // 命令行第一个参数可覆盖数据库路径
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path.clone())
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let conn = press_ledger::db::open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    let version = read_schema_version(&conn).context("读取 schema_version 失败")?;
    tracing::info!(schema_version = ?version, "数据库 schema 已就绪");

    let config_json = serde_json::to_string_pretty(&state.allocation_config)?;
    tracing::info!("生效的分配配置:\n{}", config_json);

    let overrides = state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow::anyhow!("读取配置快照失败: {}", e))?;
    tracing::info!("config_kv 覆写: {}", overrides);

    Ok(())
}
