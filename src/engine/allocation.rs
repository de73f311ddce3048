// ==========================================
// 果酒压榨台账 - 果汁分配引擎（纯函数）
// ==========================================
// 输入: 压榨批次 + 有效上料 + 采购批次 + 容器分配指令 + 容器当前状态 + 实测出汁量
// 输出: AllocationPlan（不做任何写入，由 engine::apply 落库）
// ==========================================
// 前置校验（全部在写入之前完成）:
// 1) 输入合法性: 至少一条分配、容器不重复、毛体积 > 0、0 ≤ 损耗 < 毛体积
// 2) 压榨批次必须 in_progress；上料总重 > 0
// 3) 采购批次存在且未耗尽
// 4) Σ 毛体积 ≤ 实测出汁量 + 体积容差
// 5) 每个容器: 可接收果汁，净体积 ≤ 剩余容量 + 容量容差
// ==========================================
// 拆分规则（每条分配）:
// - 同一采购批次的多条上料先聚合: fraction_lot = 批次重量 / 总重量
// - 毛体积份额 gross × fraction_lot 记入计划；损耗不归属任何批次，
//   酒批成分记录净体积 net × fraction_lot
// - share = gross / 实测出汁量；投入重量 = 批次重量 × share，
//   原料成本 = 本次消耗成本 × share
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::batch::{Batch, CompositionEntry};
use crate::domain::press_run::{extraction_rate, PressLoad, PressRun};
use crate::domain::purchase::PurchaseLot;
use crate::domain::vessel::{Vessel, VesselAssignment};
use crate::engine::composition::{compose, LotContribution};
use crate::engine::depletion::LotConsumption;
use crate::engine::naming::NamingSequencer;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::instrument;

// ==========================================
// AllocationError - 分配引擎错误
// ==========================================
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("参数无效: {0}")]
    InvalidInput(String),

    #[error("状态不允许: {0}")]
    InvalidState(String),

    #[error("{entity} 不存在: {id}")]
    NotFound { entity: String, id: String },

    #[error("冲突: {0}")]
    Conflict(String),

    #[error("酒批名称后缀已耗尽: {0}")]
    NameSuffixExhausted(String),

    #[error("存储失败: {0}")]
    Storage(#[from] RepositoryError),
}

pub type AllocationResult<T> = Result<T, AllocationError>;

// ==========================================
// 输入
// ==========================================

/// 容器中的活动酒批及其成分
#[derive(Debug, Clone)]
pub struct ActiveBatch {
    pub batch: Batch,
    pub composition: Vec<CompositionEntry>,
}

/// 容器当前状态（在写事务内读取）
#[derive(Debug, Clone)]
pub struct VesselState {
    pub vessel: Vessel,
    pub active_batch: Option<ActiveBatch>,
}

impl VesselState {
    pub fn current_volume_l(&self) -> f64 {
        self.active_batch
            .as_ref()
            .map(|b| b.batch.current_volume_l)
            .unwrap_or(0.0)
    }

    pub fn remaining_capacity_l(&self) -> f64 {
        self.vessel.capacity_l - self.current_volume_l()
    }
}

/// 分配请求
pub struct AllocationRequest<'a> {
    pub press_run: &'a PressRun,
    pub loads: &'a [PressLoad],
    pub lots: &'a HashMap<String, PurchaseLot>,
    pub assignments: &'a [VesselAssignment],
    pub vessel_states: &'a HashMap<String, VesselState>,
    pub total_juice_volume_l: f64,
}

// ==========================================
// 输出
// ==========================================

/// 采购批次在本次压榨中的聚合份额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotShare {
    pub lot_id: String,
    pub variety_id: String,
    pub variety_tag: String,
    pub weight_kg: f64,     // 本次压榨中该批次的上料重量合计
    pub fraction: f64,      // weight_kg / 总重量
    pub consumed_cost: f64, // 本次消耗的原料成本
}

/// 单条分配中某采购批次的拆分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotAllocation {
    pub lot_id: String,
    pub variety_id: String,
    pub fraction: f64,
    pub input_weight_kg: f64,
    pub gross_volume_l: f64,
    pub net_volume_l: f64,
    pub material_cost: f64,
}

/// 分配目标: 新建酒批或合并入活动酒批
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchTarget {
    Create { batch_id: String, fingerprint: String },
    Merge { batch: Batch },
}

/// 单个容器的分配计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub vessel_id: String,
    pub vessel_code: String,
    pub gross_volume_l: f64,
    pub transfer_loss_l: f64,
    pub net_volume_l: f64,
    pub volume_before_l: f64,
    pub volume_after_l: f64,
    pub target: BatchTarget,
    pub lot_allocations: Vec<LotAllocation>,
    pub composition: Vec<CompositionEntry>, // 重算后的完整成分
}

impl AssignmentPlan {
    pub fn batch_id(&self) -> &str {
        match &self.target {
            BatchTarget::Create { batch_id, .. } => batch_id,
            BatchTarget::Merge { batch } => &batch.batch_id,
        }
    }
}

/// 完整分配计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub press_run_id: String,
    pub total_input_weight_kg: f64,
    pub total_juice_volume_l: f64,
    pub extraction_rate: f64,
    pub assigned_gross_volume_l: f64,
    pub lot_shares: Vec<LotShare>,
    pub assignments: Vec<AssignmentPlan>,
    pub consumptions: Vec<LotConsumption>,
}

// ==========================================
// allocate - 生成分配计划
// ==========================================

/// 生成分配计划（不写库）
///
/// # 错误
/// - InvalidInput: 分配指令或出汁量非法
/// - InvalidState: 压榨状态错误、总重为 0、体积/容量超限、容器不可用
/// - NotFound: 采购批次或容器缺失
/// - Conflict: 采购批次已耗尽
#[instrument(skip_all, fields(
    press_run_id = %request.press_run.press_run_id,
    loads = request.loads.len(),
    assignments = request.assignments.len()
))]
pub fn allocate(
    request: &AllocationRequest<'_>,
    config: &AllocationConfig,
) -> AllocationResult<AllocationPlan> {
    validate_inputs(request)?;

    if !request.press_run.is_in_progress() {
        return Err(AllocationError::InvalidState(format!(
            "压榨批次 {} 状态为 {}，只有 in_progress 可以完成",
            request.press_run.press_run_id, request.press_run.status
        )));
    }

    let (total_weight, lot_shares) = aggregate_loads(request)?;

    let assigned_gross: f64 = request.assignments.iter().map(|a| a.gross_volume_l).sum();
    if assigned_gross > request.total_juice_volume_l + config.volume_tolerance_l {
        return Err(AllocationError::InvalidState(format!(
            "分配体积超过可用果汁: 分配 {:.3} L, 实测 {:.3} L",
            assigned_gross, request.total_juice_volume_l
        )));
    }
    if assigned_gross > request.total_juice_volume_l {
        tracing::warn!(
            assigned_gross,
            total_juice = request.total_juice_volume_l,
            "分配体积在容差范围内超出实测出汁量"
        );
    }

    let assignments = request
        .assignments
        .iter()
        .map(|a| plan_assignment(request, a, &lot_shares, config))
        .collect::<AllocationResult<Vec<_>>>()?;

    let consumptions = lot_shares
        .iter()
        .map(|s| {
            let lot = &request.lots[&s.lot_id];
            LotConsumption {
                lot_id: s.lot_id.clone(),
                consumed_weight_kg: s.weight_kg,
                total_input_weight_kg: lot.total_input_weight_kg,
            }
        })
        .collect();

    tracing::debug!(
        total_weight,
        assigned_gross,
        lots = lot_shares.len(),
        "分配计划已生成"
    );

    Ok(AllocationPlan {
        press_run_id: request.press_run.press_run_id.clone(),
        total_input_weight_kg: total_weight,
        total_juice_volume_l: request.total_juice_volume_l,
        extraction_rate: extraction_rate(request.total_juice_volume_l, total_weight),
        assigned_gross_volume_l: assigned_gross,
        lot_shares,
        assignments,
        consumptions,
    })
}

/// 输入合法性校验
fn validate_inputs(request: &AllocationRequest<'_>) -> AllocationResult<()> {
    let total = request.total_juice_volume_l;
    if !total.is_finite() || total <= 0.0 {
        return Err(AllocationError::InvalidInput(format!(
            "实测出汁量必须为正数: {}",
            total
        )));
    }
    if request.assignments.is_empty() {
        return Err(AllocationError::InvalidInput("至少需要一条容器分配".to_string()));
    }

    let mut seen = HashSet::new();
    for a in request.assignments {
        if !seen.insert(a.vessel_id.as_str()) {
            return Err(AllocationError::InvalidInput(format!(
                "容器 {} 重复分配",
                a.vessel_id
            )));
        }
        if !a.gross_volume_l.is_finite() || a.gross_volume_l <= 0.0 {
            return Err(AllocationError::InvalidInput(format!(
                "容器 {} 毛体积必须为正数: {}",
                a.vessel_id, a.gross_volume_l
            )));
        }
        if !a.transfer_loss_l.is_finite()
            || a.transfer_loss_l < 0.0
            || a.transfer_loss_l >= a.gross_volume_l
        {
            return Err(AllocationError::InvalidInput(format!(
                "容器 {} 转移损耗必须满足 0 ≤ 损耗 < 毛体积: {}",
                a.vessel_id, a.transfer_loss_l
            )));
        }
    }
    Ok(())
}

/// 按采购批次聚合上料（保持首次出现顺序）
fn aggregate_loads(request: &AllocationRequest<'_>) -> AllocationResult<(f64, Vec<LotShare>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut weights: HashMap<&str, f64> = HashMap::new();
    for load in request.loads {
        let w = weights.entry(load.lot_id.as_str()).or_insert_with(|| {
            order.push(load.lot_id.as_str());
            0.0
        });
        *w += load.input_weight_kg;
    }

    let total_weight: f64 = weights.values().sum();
    if total_weight <= 0.0 {
        return Err(AllocationError::InvalidState(format!(
            "压榨批次 {} 上料总重量为 0",
            request.press_run.press_run_id
        )));
    }

    let mut shares = Vec::with_capacity(order.len());
    for lot_id in order {
        let lot = request
            .lots
            .get(lot_id)
            .ok_or_else(|| AllocationError::NotFound {
                entity: "PurchaseLot".to_string(),
                id: lot_id.to_string(),
            })?;
        if lot.depleted {
            return Err(AllocationError::Conflict(format!(
                "采购批次 {} 已耗尽",
                lot_id
            )));
        }
        let weight = weights[lot_id];
        shares.push(LotShare {
            lot_id: lot.lot_id.clone(),
            variety_id: lot.variety_id.clone(),
            variety_tag: lot.variety_tag(),
            weight_kg: weight,
            fraction: weight / total_weight,
            consumed_cost: lot.unit_cost_per_kg() * weight,
        });
    }
    Ok((total_weight, shares))
}

/// 单个容器的分配计划
fn plan_assignment(
    request: &AllocationRequest<'_>,
    assignment: &VesselAssignment,
    lot_shares: &[LotShare],
    config: &AllocationConfig,
) -> AllocationResult<AssignmentPlan> {
    let state = request
        .vessel_states
        .get(&assignment.vessel_id)
        .ok_or_else(|| AllocationError::NotFound {
            entity: "Vessel".to_string(),
            id: assignment.vessel_id.clone(),
        })?;
    let vessel = &state.vessel;

    if !vessel.status.accepts_juice() {
        return Err(AllocationError::InvalidState(format!(
            "容器 {} 当前状态为 {}，不可接收果汁",
            vessel.code, vessel.status
        )));
    }

    let net = assignment.net_volume_l();
    let current = state.current_volume_l();
    let remaining = state.remaining_capacity_l();
    if net > remaining + config.capacity_tolerance_l {
        return Err(AllocationError::InvalidState(format!(
            "容器 {} 容量不足: 当前 {:.3} L, 容量 {:.3} L, 剩余 {:.3} L, 请求净体积 {:.3} L",
            vessel.code, current, vessel.capacity_l, remaining, net
        )));
    }

    let share = assignment.gross_volume_l / request.total_juice_volume_l;
    let lot_allocations: Vec<LotAllocation> = lot_shares
        .iter()
        .map(|s| LotAllocation {
            lot_id: s.lot_id.clone(),
            variety_id: s.variety_id.clone(),
            fraction: s.fraction,
            input_weight_kg: s.weight_kg * share,
            gross_volume_l: assignment.gross_volume_l * s.fraction,
            net_volume_l: net * s.fraction,
            material_cost: s.consumed_cost * share,
        })
        .collect();

    let contributions: Vec<LotContribution> = lot_allocations
        .iter()
        .map(|a| LotContribution {
            lot_id: a.lot_id.clone(),
            variety_id: a.variety_id.clone(),
            input_weight_kg: a.input_weight_kg,
            juice_volume_l: a.net_volume_l,
            material_cost: a.material_cost,
        })
        .collect();

    let volume_after = current + net;
    let (target, composition) = match &state.active_batch {
        Some(active) => {
            let composition = compose(
                &active.batch.batch_id,
                &active.composition,
                &contributions,
                volume_after,
            );
            (
                BatchTarget::Merge {
                    batch: active.batch.clone(),
                },
                composition,
            )
        }
        None => {
            let batch_id = uuid::Uuid::new_v4().to_string();
            let fingerprint = NamingSequencer::variety_fingerprint(
                lot_shares.iter().map(|s| (s.variety_tag.as_str(), s.weight_kg)),
            );
            let composition = compose(&batch_id, &[], &contributions, volume_after);
            (BatchTarget::Create { batch_id, fingerprint }, composition)
        }
    };

    Ok(AssignmentPlan {
        vessel_id: vessel.vessel_id.clone(),
        vessel_code: vessel.code.clone(),
        gross_volume_l: assignment.gross_volume_l,
        transfer_loss_l: assignment.transfer_loss_l,
        net_volume_l: net,
        volume_before_l: current,
        volume_after_l: volume_after,
        target,
        lot_allocations,
        composition,
    })
}
