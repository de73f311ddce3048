// ==========================================
// 果酒压榨台账 - 分配计划落库
// ==========================================
// 职责: 把 AllocationPlan 依次写入存储
// 顺序: 压榨命名并完成 → 逐容器新建/合并酒批 → 容器状态 → 采购批次消耗与耗尽
// 红线: 调用方必须在同一 IMMEDIATE 事务中执行，任何一步失败整体回滚
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::batch::{Batch, CompositionEntry, MergeHistoryRecord};
use crate::domain::press_run::PressRunCompletion;
use crate::domain::purchase::LotDepletion;
use crate::domain::types::{BatchStatus, VesselStatus};
use crate::engine::allocation::{AllocationError, AllocationPlan, AllocationResult, BatchTarget};
use crate::engine::composition::check_invariants;
use crate::engine::naming::NamingSequencer;
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ==========================================
// AllocationStore - 分配落库接口
// ==========================================
// 生产实现: repository::SqliteAllocationStore（事务内 `_tx` 仓储函数）
pub trait AllocationStore {
    fn press_run_names_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>>;
    fn complete_press_run(&self, completion: &PressRunCompletion) -> RepositoryResult<()>;
    fn batch_name_exists(&self, name: &str) -> RepositoryResult<bool>;
    fn insert_batch(&self, batch: &Batch) -> RepositoryResult<()>;
    fn update_batch_volume(&self, batch_id: &str, current_volume_l: f64) -> RepositoryResult<()>;
    fn save_composition(
        &self,
        entries: &[CompositionEntry],
    ) -> RepositoryResult<Vec<CompositionEntry>>;
    fn append_merge_history(&self, record: &MergeHistoryRecord) -> RepositoryResult<()>;
    fn add_lot_allocated_weight(&self, lot_id: &str, weight_kg: f64) -> RepositoryResult<f64>;
    fn mark_lot_depleted(&self, depletion: &LotDepletion) -> RepositoryResult<bool>;
    fn set_vessel_status(&self, vessel_id: &str, status: VesselStatus) -> RepositoryResult<()>;
}

/// 落库上下文
#[derive(Debug, Clone)]
pub struct ApplyContext<'a> {
    pub actor: &'a str,
    pub completion_date: NaiveDate, // 压榨名称、酒批名称与开始日期使用
    pub now: NaiveDateTime,
}

/// 单个容器的落库结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub batch_name: String,
    pub vessel_id: String,
    pub created: bool,
    pub volume_before_l: f64,
    pub volume_after_l: f64,
    pub merge_id: Option<String>,
    pub composition: Vec<CompositionEntry>,
}

/// 一次完成压榨的落库结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub press_run_id: String,
    pub press_run_name: String,
    pub total_input_weight_kg: f64,
    pub total_juice_volume_l: f64,
    pub extraction_rate: f64,
    pub batches: Vec<BatchOutcome>,
    pub depleted_lot_ids: Vec<String>,
}

/// 执行分配计划
///
/// # 错误
/// - NameSuffixExhausted: 酒批名称后缀空间耗尽
/// - Storage: 任意存储失败（调用方回滚事务）
#[instrument(
    skip_all,
    fields(press_run_id = %plan.press_run_id, assignments = plan.assignments.len())
)]
pub fn apply_plan<S: AllocationStore + ?Sized>(
    store: &S,
    plan: &AllocationPlan,
    ctx: &ApplyContext<'_>,
    config: &AllocationConfig,
) -> AllocationResult<AllocationOutcome> {
    // 1. 压榨命名（候选读取与写入同一事务）
    let prefix = NamingSequencer::press_run_prefix(ctx.completion_date);
    let existing = store.press_run_names_with_prefix(&prefix)?;
    let press_run_name = NamingSequencer::next_press_run_name(ctx.completion_date, &existing);

    store.complete_press_run(&PressRunCompletion {
        press_run_id: plan.press_run_id.clone(),
        name: press_run_name.clone(),
        total_input_weight_kg: plan.total_input_weight_kg,
        total_juice_volume_l: plan.total_juice_volume_l,
        extraction_rate: plan.extraction_rate,
        completed_at: ctx.now,
        completed_by: ctx.actor.to_string(),
    })?;

    // 2. 逐容器落库
    let mut batches = Vec::with_capacity(plan.assignments.len());
    for assignment in &plan.assignments {
        let outcome = match &assignment.target {
            BatchTarget::Create {
                batch_id,
                fingerprint,
            } => {
                let base = NamingSequencer::batch_base_name(
                    ctx.completion_date,
                    fingerprint,
                    &assignment.vessel_code,
                );
                let name =
                    NamingSequencer::resolve_unique(&base, config.batch_name_max_suffix, |n| {
                        store.batch_name_exists(n)
                    })?
                    .ok_or_else(|| AllocationError::NameSuffixExhausted(base.clone()))?;

                store.insert_batch(&Batch {
                    batch_id: batch_id.clone(),
                    name: name.clone(),
                    vessel_id: Some(assignment.vessel_id.clone()),
                    status: BatchStatus::Fermentation,
                    current_volume_l: assignment.volume_after_l,
                    origin_press_run_id: Some(plan.press_run_id.clone()),
                    start_date: ctx.completion_date,
                    created_by: ctx.actor.to_string(),
                    created_at: ctx.now,
                    updated_at: ctx.now,
                })?;
                let composition = store.save_composition(&assignment.composition)?;
                tracing::info!(
                    batch_id = %batch_id,
                    batch_name = %name,
                    vessel = %assignment.vessel_code,
                    "新建酒批"
                );

                BatchOutcome {
                    batch_id: batch_id.clone(),
                    batch_name: name,
                    vessel_id: assignment.vessel_id.clone(),
                    created: true,
                    volume_before_l: assignment.volume_before_l,
                    volume_after_l: assignment.volume_after_l,
                    merge_id: None,
                    composition,
                }
            }
            BatchTarget::Merge { batch } => {
                store.update_batch_volume(&batch.batch_id, assignment.volume_after_l)?;
                let composition = store.save_composition(&assignment.composition)?;
                let record = MergeHistoryRecord::from_press_run(
                    &batch.batch_id,
                    &plan.press_run_id,
                    assignment.volume_before_l,
                    assignment.net_volume_l,
                    assignment.transfer_loss_l,
                    ctx.now,
                    ctx.actor,
                );
                store.append_merge_history(&record)?;
                tracing::info!(
                    batch_id = %batch.batch_id,
                    before = assignment.volume_before_l,
                    after = assignment.volume_after_l,
                    "合并入活动酒批"
                );

                BatchOutcome {
                    batch_id: batch.batch_id.clone(),
                    batch_name: batch.name.clone(),
                    vessel_id: assignment.vessel_id.clone(),
                    created: false,
                    volume_before_l: assignment.volume_before_l,
                    volume_after_l: assignment.volume_after_l,
                    merge_id: Some(record.merge_id),
                    composition,
                }
            }
        };

        let report = check_invariants(&outcome.composition, outcome.volume_after_l);
        if !report.holds(config.fraction_epsilon) {
            tracing::warn!(
                batch_id = %outcome.batch_id,
                fraction_sum = report.fraction_sum,
                volume_sum = report.volume_sum_l,
                expected = report.expected_volume_l,
                "酒批成分不变量偏差超出容差"
            );
        }

        // 预留标记清除：容器此后承载活动酒批
        store.set_vessel_status(&assignment.vessel_id, VesselStatus::InUse)?;
        batches.push(outcome);
    }

    // 3. 采购批次消耗与耗尽（以库内累计值为准）
    let mut depleted_lot_ids = Vec::new();
    for consumption in &plan.consumptions {
        let allocated =
            store.add_lot_allocated_weight(&consumption.lot_id, consumption.consumed_weight_kg)?;
        if consumption.depletes(allocated, config.depletion_epsilon_kg) {
            let marked = store.mark_lot_depleted(&LotDepletion {
                lot_id: consumption.lot_id.clone(),
                depleted_at: ctx.now,
                depleted_by: ctx.actor.to_string(),
                press_run_id: plan.press_run_id.clone(),
            })?;
            if marked {
                tracing::info!(lot_id = %consumption.lot_id, allocated, "采购批次已耗尽");
                depleted_lot_ids.push(consumption.lot_id.clone());
            }
        }
    }

    Ok(AllocationOutcome {
        press_run_id: plan.press_run_id.clone(),
        press_run_name,
        total_input_weight_kg: plan.total_input_weight_kg,
        total_juice_volume_l: plan.total_juice_volume_l,
        extraction_rate: plan.extraction_rate,
        batches,
        depleted_lot_ids,
    })
}
