// ==========================================
// 果酒压榨台账 - 采购批次领域模型
// ==========================================
// 归属: 采购台账（外部协作方）
// 红线: 本核心只修改消耗量与耗尽标记
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// PurchaseLot - 水果采购批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLot {
    pub lot_id: String,
    pub variety_id: String,
    pub variety_name: Option<String>, // 品种名（LEFT JOIN variety，可为空）
    pub vendor_id: String,
    pub total_input_weight_kg: f64,  // 采购总重量
    pub total_cost: f64,             // 采购总成本
    pub allocated_weight_kg: f64,    // 累计已分配重量（跨所有压榨批次）
    pub depleted: bool,
    pub depleted_at: Option<NaiveDateTime>,
    pub depleted_by: Option<String>,
    pub depleted_by_press_run_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PurchaseLot {
    /// 单位成本（元/kg），采购重量为 0 时返回 0
    pub fn unit_cost_per_kg(&self) -> f64 {
        if self.total_input_weight_kg > 0.0 {
            self.total_cost / self.total_input_weight_kg
        } else {
            0.0
        }
    }

    /// 指纹用的品种标签：品种名前 3 个字母数字字符（大写），无品种名时退回品种 ID
    pub fn variety_tag(&self) -> String {
        let source = self
            .variety_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.variety_id);
        let tag: String = source
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        if tag.is_empty() {
            "VAR".to_string()
        } else {
            tag
        }
    }
}

/// 批次耗尽标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotDepletion {
    pub lot_id: String,
    pub depleted_at: NaiveDateTime,
    pub depleted_by: String,
    pub press_run_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(variety_name: Option<&str>) -> PurchaseLot {
        let now = chrono::Local::now().naive_local();
        PurchaseLot {
            lot_id: "LOT-1".to_string(),
            variety_id: "var-kingston".to_string(),
            variety_name: variety_name.map(|s| s.to_string()),
            vendor_id: "V1".to_string(),
            total_input_weight_kg: 500.0,
            total_cost: 250.0,
            allocated_weight_kg: 100.0,
            depleted: false,
            depleted_at: None,
            depleted_by: None,
            depleted_by_press_run_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_variety_tag() {
        assert_eq!(lot(Some("Granny Smith")).variety_tag(), "GRA");
        assert_eq!(lot(Some("  ")).variety_tag(), "VAR");
        assert_eq!(lot(None).variety_tag(), "VAR");
        assert_eq!(lot(Some("k-1 x")).variety_tag(), "K1X");
    }

    #[test]
    fn test_unit_cost() {
        let l = lot(None);
        assert!((l.unit_cost_per_kg() - 0.5).abs() < 1e-12);
    }
}
