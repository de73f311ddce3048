// ==========================================
// 果酒压榨台账 - 领域类型定义
// ==========================================
// 职责: 状态枚举及其数据库字符串映射
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 压榨批次状态 (Press Run Status)
// ==========================================
// 生命周期: in_progress → completed（分配终态）
//           in_progress → cancelled（终态，不产生酒批）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressRunStatus {
    InProgress, // 压榨中（可增删上料）
    Completed,  // 已完成（已分配果汁）
    Cancelled,  // 已取消
}

impl fmt::Display for PressRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PressRunStatus {
    /// 从数据库字符串解析（未知值返回 None，由仓储层转为错误）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(PressRunStatus::InProgress),
            "completed" => Some(PressRunStatus::Completed),
            "cancelled" => Some(PressRunStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PressRunStatus::InProgress => "in_progress",
            PressRunStatus::Completed => "completed",
            PressRunStatus::Cancelled => "cancelled",
        }
    }
}

// ==========================================
// 酒批状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Fermentation, // 发酵中
    Aging,        // 陈酿中
    Packaged,     // 已灌装
    Archived,     // 已归档（容器已清空）
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BatchStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "fermentation" => Some(BatchStatus::Fermentation),
            "aging" => Some(BatchStatus::Aging),
            "packaged" => Some(BatchStatus::Packaged),
            "archived" => Some(BatchStatus::Archived),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Fermentation => "fermentation",
            BatchStatus::Aging => "aging",
            BatchStatus::Packaged => "packaged",
            BatchStatus::Archived => "archived",
        }
    }

    /// 是否占用容器（容器的“活动酒批”）
    pub fn occupies_vessel(&self) -> bool {
        matches!(self, BatchStatus::Fermentation | BatchStatus::Aging)
    }

    /// 占用容器状态的数据库字符串（供 SQL IN 子句使用）
    pub const OCCUPYING_DB_STRS: [&'static str; 2] = ["fermentation", "aging"];
}

// ==========================================
// 容器状态 (Vessel Status)
// ==========================================
// Reserved = “已预留给压榨”，分配完成后清除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselStatus {
    Available,   // 空闲
    Reserved,    // 预留给压榨
    InUse,       // 使用中
    Cleaning,    // 清洗中
    Maintenance, // 维护中
    Retired,     // 已停用
}

impl fmt::Display for VesselStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl VesselStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(VesselStatus::Available),
            "reserved" => Some(VesselStatus::Reserved),
            "in_use" => Some(VesselStatus::InUse),
            "cleaning" => Some(VesselStatus::Cleaning),
            "maintenance" => Some(VesselStatus::Maintenance),
            "retired" => Some(VesselStatus::Retired),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            VesselStatus::Available => "available",
            VesselStatus::Reserved => "reserved",
            VesselStatus::InUse => "in_use",
            VesselStatus::Cleaning => "cleaning",
            VesselStatus::Maintenance => "maintenance",
            VesselStatus::Retired => "retired",
        }
    }

    /// 是否可以接收果汁
    pub fn accepts_juice(&self) -> bool {
        matches!(
            self,
            VesselStatus::Available | VesselStatus::Reserved | VesselStatus::InUse
        )
    }
}

// ==========================================
// 审计实体类型 (Audit Entity Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    PressRun,
    PressLoad,
    Batch,
    PurchaseLot,
    Vessel,
    MergeHistory,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::PressRun => "press_run",
            EntityType::PressLoad => "press_load",
            EntityType::Batch => "batch",
            EntityType::PurchaseLot => "purchase_lot",
            EntityType::Vessel => "vessel",
            EntityType::MergeHistory => "merge_history",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
