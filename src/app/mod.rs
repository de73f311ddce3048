// ==========================================
// 果酒压榨台账 - 应用层
// ==========================================
// 职责: 装配共享连接、仓储、配置与 API 实例
// ==========================================

pub mod audit_adapter;
pub mod state;

// 重导出
pub use audit_adapter::ActionLogAuditPublisher;
pub use state::{get_default_db_path, AppState};
