// ==========================================
// 果酒压榨台账 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod batch;
pub mod press_run;
pub mod purchase;
pub mod types;
pub mod vessel;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use batch::{Batch, CompositionEntry, MergeHistoryRecord};
pub use press_run::{PressLoad, PressRun, PressRunCompletion};
pub use purchase::{LotDepletion, PurchaseLot};
pub use types::{BatchStatus, EntityType, PressRunStatus, VesselStatus};
pub use vessel::{Vessel, VesselAssignment};
