// ==========================================
// 果酒压榨台账 - 容器领域模型
// ==========================================
// 归属: 容器登记（外部协作方）
// 本核心只读取容量/状态，并在分配后写回状态
// ==========================================

use crate::domain::types::VesselStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Vessel - 发酵容器
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub vessel_id: String,
    pub code: String,      // 容器编号，如 T01
    pub capacity_l: f64,   // 额定容量
    pub status: VesselStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// VesselAssignment - 果汁分配指令（瞬态）
// ==========================================
// net_volume_l = gross_volume_l - transfer_loss_l
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselAssignment {
    pub vessel_id: String,
    pub gross_volume_l: f64,
    pub transfer_loss_l: f64,
}

impl VesselAssignment {
    pub fn new(vessel_id: impl Into<String>, gross_volume_l: f64, transfer_loss_l: f64) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            gross_volume_l,
            transfer_loss_l,
        }
    }

    /// 无损耗的分配
    pub fn lossless(vessel_id: impl Into<String>, volume_l: f64) -> Self {
        Self::new(vessel_id, volume_l, 0.0)
    }

    pub fn net_volume_l(&self) -> f64 {
        self.gross_volume_l - self.transfer_loss_l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_volume() {
        let a = VesselAssignment::new("T01", 300.0, 2.5);
        assert!((a.net_volume_l() - 297.5).abs() < 1e-12);
        assert_eq!(VesselAssignment::lossless("T02", 100.0).net_volume_l(), 100.0);
    }
}
