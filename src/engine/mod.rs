// ==========================================
// 果酒压榨台账 - 引擎层
// ==========================================
// 职责: 果汁分配、成分重算、命名、耗尽判定（纯函数）与计划落库
// 红线: Engine 不拼 SQL；写入只经由 AllocationStore
// ==========================================

pub mod allocation;
pub mod apply;
pub mod composition;
pub mod depletion;
pub mod events;
pub mod naming;
pub mod transfer;

// 重导出核心引擎
pub use allocation::{
    allocate, ActiveBatch, AllocationError, AllocationPlan, AllocationRequest, AllocationResult,
    AssignmentPlan, BatchTarget, LotAllocation, LotShare, VesselState,
};
pub use apply::{apply_plan, AllocationOutcome, AllocationStore, ApplyContext, BatchOutcome};
pub use composition::{check_invariants, compose, InvariantReport, LotContribution};
pub use depletion::{reaches_depletion, LotConsumption};
pub use events::{AuditEvent, AuditEventPublisher, NoOpAuditPublisher, OptionalAuditPublisher};
pub use naming::NamingSequencer;
pub use transfer::{plan_transfer, TransferPlan};
