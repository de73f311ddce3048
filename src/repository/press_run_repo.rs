// ==========================================
// 果酒压榨台账 - 压榨批次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

mod load;
mod run;

pub use load::PressLoadRepository;
pub use run::PressRunRepository;
