// ==========================================
// 果酒压榨台账 - 压榨批次领域模型
// ==========================================
// 压榨批次 (PressRun) 聚合多条上料记录 (PressLoad)
// 上料记录只在 in_progress 期间可变；完成后冻结，作为分配依据保留
// ==========================================

use crate::domain::types::PressRunStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// PressRun - 压榨批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressRun {
    pub press_run_id: String,
    pub name: Option<String>, // 完成时由命名序列器分配，如 2024-03-15-02
    pub press_date: NaiveDate,
    pub status: PressRunStatus,
    pub total_input_weight_kg: f64,          // 有效上料重量合计
    pub total_juice_volume_l: Option<f64>,   // 完成时实测出汁量
    pub extraction_rate: Option<f64>,        // 出汁率 L/kg
    pub notes: Option<String>,
    pub created_by: String,
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PressRun {
    /// 新建压榨批次（in_progress，无名称，重量为 0）
    pub fn new(press_date: NaiveDate, notes: Option<String>, created_by: String) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            press_run_id: uuid::Uuid::new_v4().to_string(),
            name: None,
            press_date,
            status: PressRunStatus::InProgress,
            total_input_weight_kg: 0.0,
            total_juice_volume_l: None,
            extraction_rate: None,
            notes,
            created_by,
            completed_at: None,
            completed_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == PressRunStatus::InProgress
    }
}

// ==========================================
// PressLoad - 上料记录
// ==========================================
// sequence: 1..n 连续编号（删除后重排）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressLoad {
    pub load_id: String,
    pub press_run_id: String,
    pub lot_id: String,
    pub sequence: i32,
    pub input_weight_kg: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// PressRunCompletion - 完成压榨时写回的字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressRunCompletion {
    pub press_run_id: String,
    pub name: String,
    pub total_input_weight_kg: f64,
    pub total_juice_volume_l: f64,
    pub extraction_rate: f64,
    pub completed_at: NaiveDateTime,
    pub completed_by: String,
}

/// 出汁率（L/kg）；重量为 0 时返回 0
pub fn extraction_rate(total_juice_volume_l: f64, total_input_weight_kg: f64) -> f64 {
    if total_input_weight_kg > 0.0 {
        total_juice_volume_l / total_input_weight_kg
    } else {
        0.0
    }
}
