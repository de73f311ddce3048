// ==========================================
// 果酒压榨台账 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{BatchApi, PressRunApi};
use crate::app::audit_adapter::ActionLogAuditPublisher;
use crate::config::{AllocationConfig, ConfigManager};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::events::OptionalAuditPublisher;
use crate::repository::{
    ActionLogRepository, BatchRepository, MergeHistoryRepository, PressLoadRepository,
    PressRunRepository, PurchaseLotRepository, VesselRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源；同一进程共享一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的分配配置（启动时从 config_kv 读取）
    pub allocation_config: AllocationConfig,

    /// 压榨批次API
    pub press_run_api: Arc<PressRunApi>,

    /// 酒批API
    pub batch_api: Arc<BatchApi>,

    /// 采购批次仓储（采购台账协作方）
    pub purchase_lot_repo: Arc<PurchaseLotRepository>,

    /// 容器仓储（容器登记协作方）
    pub vessel_repo: Arc<VesselRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并幂等建表
    /// 2. 读取分配配置
    /// 3. 初始化所有Repository与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let allocation_config = config_manager
            .get_allocation_config()
            .map_err(|e| format!("读取分配配置失败: {}", e))?;
        tracing::info!(?allocation_config, "分配配置已加载");

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let press_run_repo = Arc::new(PressRunRepository::new(conn.clone()));
        let load_repo = Arc::new(PressLoadRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let merge_history_repo = Arc::new(MergeHistoryRepository::new(conn.clone()));
        let purchase_lot_repo = Arc::new(PurchaseLotRepository::new(conn.clone()));
        let vessel_repo = Arc::new(VesselRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // 审计事件写入 action_log
        let audit = OptionalAuditPublisher::with_publisher(Arc::new(ActionLogAuditPublisher::new(
            action_log_repo.clone(),
        )));

        // ==========================================
        // 创建API实例
        // ==========================================
        let press_run_api = Arc::new(PressRunApi::new(
            conn.clone(),
            press_run_repo,
            load_repo,
            audit.clone(),
            allocation_config,
        ));
        let batch_api = Arc::new(BatchApi::new(
            conn,
            batch_repo,
            merge_history_repo,
            audit,
            allocation_config,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            allocation_config,
            press_run_api,
            batch_api,
            purchase_lot_repo,
            vessel_repo,
            action_log_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先使用 PRESS_LEDGER_DB_PATH；否则放在用户数据目录下
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("PRESS_LEDGER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./press_ledger.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("press-ledger");
        // 确保目录存在；失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("press_ledger.db");
        } else {
            tracing::warn!("无法创建数据目录 {}，使用当前目录", dir.display());
        }
    }

    path.to_string_lossy().to_string()
}
