// ==========================================
// 果酒压榨台账 - 采购批次耗尽判定
// ==========================================
// 契约: depleted ⇔ 累计分配重量 ≥ 采购总重量 - ε
// 表示: purchase_lot.allocated_weight_kg 物化计数器（跨所有压榨批次累加）
// ==========================================

use serde::{Deserialize, Serialize};

/// 某采购批次在一次压榨完成中的消耗
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotConsumption {
    pub lot_id: String,
    pub consumed_weight_kg: f64,
    pub total_input_weight_kg: f64,
}

impl LotConsumption {
    /// 计入本次消耗后的库内累计值是否达到耗尽阈值
    ///
    /// # 参数
    /// - allocated_kg: 存储中的累计分配重量（已包含本次消耗）
    pub fn depletes(&self, allocated_kg: f64, epsilon_kg: f64) -> bool {
        reaches_depletion(allocated_kg, self.total_input_weight_kg, epsilon_kg)
    }
}

/// 累计分配重量是否达到耗尽阈值
pub fn reaches_depletion(allocated_kg: f64, total_input_weight_kg: f64, epsilon_kg: f64) -> bool {
    allocated_kg >= total_input_weight_kg - epsilon_kg
}
