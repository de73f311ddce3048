// ==========================================
// 果酒压榨台账 - 酒批间转移（纯函数）
// ==========================================
// 来源: 体积/重量/成本按剩余比例缩减，比例不变；转空后归档并释放容器
// 目标: 按来源比例取出的贡献经 compose 合并，记一条 source_batch_id 合并历史
// 损耗: 与压榨分配一致，重量/成本按毛体积份额转移，目标只计入净体积
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::batch::CompositionEntry;
use crate::domain::vessel::Vessel;
use crate::engine::allocation::{ActiveBatch, AllocationError, AllocationResult};
use crate::engine::composition::{compose, extract_contributions, scale_down};
use serde::{Deserialize, Serialize};

/// 转移计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub source_batch_id: String,
    pub target_batch_id: String,
    pub volume_l: f64, // 实际取出体积（容差内按来源体积修正）
    pub transfer_loss_l: f64,
    pub net_volume_l: f64,
    pub source_before_l: f64,
    pub source_after_l: f64,
    pub source_drained: bool,
    pub source_composition: Vec<CompositionEntry>,
    pub target_before_l: f64,
    pub target_after_l: f64,
    pub target_composition: Vec<CompositionEntry>,
}

/// 生成酒批间转移计划
///
/// # 参数
/// - `volume_l`: 从来源取出的毛体积
/// - `loss_l`: 转移损耗（目标实收 = volume_l - loss_l）
pub fn plan_transfer(
    source: &ActiveBatch,
    target: &ActiveBatch,
    target_vessel: &Vessel,
    volume_l: f64,
    loss_l: f64,
    config: &AllocationConfig,
) -> AllocationResult<TransferPlan> {
    if !volume_l.is_finite() || volume_l <= 0.0 {
        return Err(AllocationError::InvalidInput(format!(
            "转移体积必须为正数: {}",
            volume_l
        )));
    }
    if !loss_l.is_finite() || loss_l < 0.0 || loss_l >= volume_l {
        return Err(AllocationError::InvalidInput(format!(
            "转移损耗必须满足 0 ≤ 损耗 < 转移体积: {}",
            loss_l
        )));
    }
    if source.batch.batch_id == target.batch.batch_id {
        return Err(AllocationError::InvalidState(
            "来源与目标酒批相同".to_string(),
        ));
    }
    for b in [&source.batch, &target.batch] {
        if !b.is_active() {
            return Err(AllocationError::InvalidState(format!(
                "酒批 {} 状态为 {}，不在容器中活动",
                b.batch_id, b.status
            )));
        }
    }

    let source_before = source.batch.current_volume_l;
    if volume_l > source_before + config.capacity_tolerance_l {
        return Err(AllocationError::InvalidState(format!(
            "转移体积 {:.3} L 超过来源酒批现有体积 {:.3} L",
            volume_l, source_before
        )));
    }

    // 在容差内按来源实际体积取出；余量不超过容差时一并取空
    let mut moved = volume_l.min(source_before);
    let source_drained = source_before - moved <= config.capacity_tolerance_l;
    if source_drained {
        moved = source_before;
    }
    let source_after = source_before - moved;
    let net = moved - loss_l;
    if net <= 0.0 {
        return Err(AllocationError::InvalidInput(format!(
            "转移损耗必须小于实际取出体积: 取出 {:.3} L, 损耗 {:.3} L",
            moved, loss_l
        )));
    }

    let target_before = target.batch.current_volume_l;
    let remaining = target_vessel.capacity_l - target_before;
    if net > remaining + config.capacity_tolerance_l {
        return Err(AllocationError::InvalidState(format!(
            "容器 {} 容量不足: 当前 {:.3} L, 容量 {:.3} L, 剩余 {:.3} L, 请求净体积 {:.3} L",
            target_vessel.code, target_before, target_vessel.capacity_l, remaining, net
        )));
    }

    let gross_share = if source_before > 0.0 { moved / source_before } else { 0.0 };

    let contributions = extract_contributions(&source.composition, gross_share, net);
    let target_after = target_before + net;
    let target_composition = compose(
        &target.batch.batch_id,
        &target.composition,
        &contributions,
        target_after,
    );
    let source_composition = scale_down(&source.composition, source_before, source_after);

    Ok(TransferPlan {
        source_batch_id: source.batch.batch_id.clone(),
        target_batch_id: target.batch.batch_id.clone(),
        volume_l: moved,
        transfer_loss_l: loss_l,
        net_volume_l: net,
        source_before_l: source_before,
        source_after_l: source_after,
        source_drained,
        source_composition,
        target_before_l: target_before,
        target_after_l: target_after,
        target_composition,
    })
}
