// ==========================================
// 果酒压榨台账 - API 层
// ==========================================
// 职责: 提供进程内业务 API 接口，供请求处理层调用
// ==========================================

pub mod batch_api;
pub mod error;
pub mod press_run_api;

// 重导出核心类型
pub use batch_api::{BatchApi, TransferOutcome};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use press_run_api::PressRunApi;
