// ==========================================
// 果酒压榨台账 - 酒批 / 成分 / 合并历史领域模型
// ==========================================
// 不变量（每个酒批）:
// - Σ fraction_of_batch ≈ 1.0
// - Σ juice_volume_l ≈ current_volume_l
// 合并历史: 只追加、不修改；来源压榨被物理删除时引用置空
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Batch - 酒批
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub name: String,
    pub vessel_id: Option<String>, // 容器清空后置空
    pub status: BatchStatus,
    pub current_volume_l: f64,
    pub origin_press_run_id: Option<String>,
    pub start_date: NaiveDate,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Batch {
    /// 是否为所在容器的活动酒批
    pub fn is_active(&self) -> bool {
        self.vessel_id.is_some() && self.status.occupies_vessel()
    }
}

// ==========================================
// CompositionEntry - 酒批成分（溯源）条目
// ==========================================
// entry_id: None 表示尚未落库的新条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionEntry {
    pub entry_id: Option<i64>,
    pub batch_id: String,
    pub lot_id: String,
    pub variety_id: String,
    pub input_weight_kg: f64,
    pub juice_volume_l: f64,
    pub fraction_of_batch: f64,
    pub material_cost: f64,
}

// ==========================================
// MergeHistoryRecord - 合并/转移历史
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeHistoryRecord {
    pub merge_id: String,
    pub target_batch_id: String,
    pub source_press_run_id: Option<String>,
    pub source_batch_id: Option<String>,
    pub volume_added_l: f64,
    pub volume_before_l: f64,
    pub volume_after_l: f64,
    pub transfer_loss_l: f64,
    pub notes: Option<String>,
    pub merged_at: NaiveDateTime,
    pub merged_by: String,
}

impl MergeHistoryRecord {
    /// 构造一条来自压榨批次的合并记录
    pub fn from_press_run(
        target_batch_id: &str,
        press_run_id: &str,
        volume_before_l: f64,
        volume_added_l: f64,
        transfer_loss_l: f64,
        merged_at: NaiveDateTime,
        merged_by: &str,
    ) -> Self {
        Self {
            merge_id: uuid::Uuid::new_v4().to_string(),
            target_batch_id: target_batch_id.to_string(),
            source_press_run_id: Some(press_run_id.to_string()),
            source_batch_id: None,
            volume_added_l,
            volume_before_l,
            volume_after_l: volume_before_l + volume_added_l,
            transfer_loss_l,
            notes: loss_note(transfer_loss_l),
            merged_at,
            merged_by: merged_by.to_string(),
        }
    }

    /// 构造一条酒批间转移记录
    pub fn from_batch(
        target_batch_id: &str,
        source_batch_id: &str,
        volume_before_l: f64,
        volume_added_l: f64,
        transfer_loss_l: f64,
        merged_at: NaiveDateTime,
        merged_by: &str,
    ) -> Self {
        Self {
            merge_id: uuid::Uuid::new_v4().to_string(),
            target_batch_id: target_batch_id.to_string(),
            source_press_run_id: None,
            source_batch_id: Some(source_batch_id.to_string()),
            volume_added_l,
            volume_before_l,
            volume_after_l: volume_before_l + volume_added_l,
            transfer_loss_l,
            notes: loss_note(transfer_loss_l),
            merged_at,
            merged_by: merged_by.to_string(),
        }
    }
}

/// 有转移损耗时生成备注
fn loss_note(transfer_loss_l: f64) -> Option<String> {
    if transfer_loss_l > 0.0 {
        Some(format!("转移损耗 {:.3} L", transfer_loss_l))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_record_from_press_run() {
        let ts = chrono::Local::now().naive_local();
        let rec = MergeHistoryRecord::from_press_run("B1", "PR1", 200.0, 100.0, 1.5, ts, "alice");
        assert_eq!(rec.volume_after_l, 300.0);
        assert_eq!(rec.source_press_run_id.as_deref(), Some("PR1"));
        assert!(rec.source_batch_id.is_none());
        assert!(rec.notes.unwrap().contains("1.500"));

        let rec = MergeHistoryRecord::from_batch("B1", "B0", 10.0, 5.0, 0.0, ts, "bob");
        assert!(rec.notes.is_none());
        assert_eq!(rec.source_batch_id.as_deref(), Some("B0"));
    }
}
