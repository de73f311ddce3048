// ==========================================
// 果酒压榨台账 - 操作日志数据仓储
// ==========================================
// 用途: 审计事件发布器的持久化落点（action_log 表）
// 红线: 只追加，不更新
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
