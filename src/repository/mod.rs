// ==========================================
// 果酒压榨台账 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 事务: 写路径使用 `_tx` 关联函数 + transaction::with_immediate_transaction
// ==========================================

pub mod action_log_repo;
pub mod allocation_store;
pub mod batch_repo;
pub mod error;
pub mod merge_history_repo;
pub mod press_run_repo;
pub mod purchase_repo;
pub mod row_utils;
pub mod transaction;
pub mod vessel_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use allocation_store::SqliteAllocationStore;
pub use batch_repo::BatchRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use merge_history_repo::MergeHistoryRepository;
pub use press_run_repo::{PressLoadRepository, PressRunRepository};
pub use purchase_repo::PurchaseLotRepository;
pub use transaction::with_immediate_transaction;
pub use vessel_repo::VesselRepository;
