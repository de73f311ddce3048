// ==========================================
// 果酒压榨台账 - 酒批成分重算（纯函数）
// ==========================================
// compose: 既有成分 + 新贡献 → 新成分列表（不原地修改）
//   - 同一采购批次的贡献累加到既有条目（重量/体积/成本求和）
//   - 所有条目比例统一按 体积 / 新总体积 重算
// 不变量: Σ fraction ≈ 1.0，Σ juice_volume_l ≈ 新总体积
// ==========================================

use crate::domain::batch::CompositionEntry;
use serde::{Deserialize, Serialize};

/// 一次合并/新建中某采购批次的贡献
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotContribution {
    pub lot_id: String,
    pub variety_id: String,
    pub input_weight_kg: f64,
    pub juice_volume_l: f64, // 计入酒批的净体积
    pub material_cost: f64,
}

/// 成分不变量检查结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvariantReport {
    pub fraction_sum: f64,
    pub volume_sum_l: f64,
    pub expected_volume_l: f64,
}

impl InvariantReport {
    pub fn holds(&self, epsilon: f64) -> bool {
        (self.fraction_sum - 1.0).abs() < epsilon
            && (self.volume_sum_l - self.expected_volume_l).abs() < epsilon
    }
}

/// 重算成分
///
/// # 参数
/// - `batch_id`: 目标酒批（新条目归属）
/// - `existing`: 既有成分（保持原顺序与 entry_id）
/// - `contributions`: 新贡献（按出现顺序追加新条目）
/// - `new_total_volume_l`: 合并后的酒批体积
pub fn compose(
    batch_id: &str,
    existing: &[CompositionEntry],
    contributions: &[LotContribution],
    new_total_volume_l: f64,
) -> Vec<CompositionEntry> {
    let mut entries: Vec<CompositionEntry> = existing.to_vec();

    for c in contributions {
        match entries.iter_mut().find(|e| e.lot_id == c.lot_id) {
            Some(entry) => {
                entry.input_weight_kg += c.input_weight_kg;
                entry.juice_volume_l += c.juice_volume_l;
                entry.material_cost += c.material_cost;
            }
            None => entries.push(CompositionEntry {
                entry_id: None,
                batch_id: batch_id.to_string(),
                lot_id: c.lot_id.clone(),
                variety_id: c.variety_id.clone(),
                input_weight_kg: c.input_weight_kg,
                juice_volume_l: c.juice_volume_l,
                fraction_of_batch: 0.0,
                material_cost: c.material_cost,
            }),
        }
    }

    refresh_fractions(&mut entries, new_total_volume_l);
    entries
}

/// 按比例缩减成分（酒批间转出）
///
/// 体积/重量/成本按 `remaining / current` 缩放，比例保持不变；
/// 剩余体积为 0 时体积清零、比例保留（归档酒批的溯源快照）
pub fn scale_down(
    entries: &[CompositionEntry],
    current_volume_l: f64,
    remaining_volume_l: f64,
) -> Vec<CompositionEntry> {
    let factor = if current_volume_l > 0.0 {
        (remaining_volume_l / current_volume_l).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut scaled: Vec<CompositionEntry> = entries
        .iter()
        .map(|e| CompositionEntry {
            input_weight_kg: e.input_weight_kg * factor,
            juice_volume_l: e.juice_volume_l * factor,
            material_cost: e.material_cost * factor,
            ..e.clone()
        })
        .collect();
    if remaining_volume_l > 0.0 {
        refresh_fractions(&mut scaled, remaining_volume_l);
    }
    scaled
}

/// 从酒批成分中按比例取出贡献（酒批间转入）
///
/// # 参数
/// - `gross_share`: 转出毛体积 / 来源体积（决定重量与成本）
/// - `net_volume_l`: 目标实际收到的净体积（按来源比例拆分）
pub fn extract_contributions(
    entries: &[CompositionEntry],
    gross_share: f64,
    net_volume_l: f64,
) -> Vec<LotContribution> {
    entries
        .iter()
        .map(|e| LotContribution {
            lot_id: e.lot_id.clone(),
            variety_id: e.variety_id.clone(),
            input_weight_kg: e.input_weight_kg * gross_share,
            juice_volume_l: net_volume_l * e.fraction_of_batch,
            material_cost: e.material_cost * gross_share,
        })
        .collect()
}

/// 计算成分不变量
pub fn check_invariants(entries: &[CompositionEntry], expected_volume_l: f64) -> InvariantReport {
    InvariantReport {
        fraction_sum: entries.iter().map(|e| e.fraction_of_batch).sum(),
        volume_sum_l: entries.iter().map(|e| e.juice_volume_l).sum(),
        expected_volume_l,
    }
}

fn refresh_fractions(entries: &mut [CompositionEntry], total_volume_l: f64) {
    if total_volume_l <= 0.0 {
        return;
    }
    for entry in entries.iter_mut() {
        entry.fraction_of_batch = entry.juice_volume_l / total_volume_l;
    }
}
