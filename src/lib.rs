// ==========================================
// 果酒压榨台账 - 核心库
// ==========================================
// 职责: 压榨批次果汁分配、酒批成分溯源、合并历史
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配与成分计算
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, EntityType, PressRunStatus, VesselStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Batch, CompositionEntry, MergeHistoryRecord, PressLoad, PressRun,
    PurchaseLot, Vessel, VesselAssignment,
};

// 引擎
pub use engine::{allocate, apply_plan, compose, AllocationOutcome, AllocationPlan};

// API
pub use api::{ApiError, ApiResult, BatchApi, PressRunApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "果酒压榨台账";
