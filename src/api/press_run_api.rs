// ==========================================
// 果酒压榨台账 - 压榨批次 API
// ==========================================
// 职责: 压榨批次生命周期（上料增删改、完成分配、取消、物理删除）
// 事务: 每个写操作是一个 BEGIN IMMEDIATE 事务；审计事件在提交后发布
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::config::AllocationConfig;
use crate::domain::press_run::{PressLoad, PressRun};
use crate::domain::purchase::PurchaseLot;
use crate::domain::types::{EntityType, PressRunStatus};
use crate::domain::vessel::VesselAssignment;
use crate::engine::allocation::{allocate, ActiveBatch, AllocationRequest, VesselState};
use crate::engine::apply::{apply_plan, AllocationOutcome, ApplyContext};
use crate::engine::events::OptionalAuditPublisher;
use crate::repository::allocation_store::SqliteAllocationStore;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::press_run_repo::{PressLoadRepository, PressRunRepository};
use crate::repository::purchase_repo::PurchaseLotRepository;
use crate::repository::row_utils::now_ts;
use crate::repository::transaction::with_immediate_transaction;
use crate::repository::vessel_repo::VesselRepository;

// ==========================================
// PressRunApi - 压榨批次 API
// ==========================================

/// 压榨批次API
///
/// 职责：
/// 1. 压榨批次创建与查询
/// 2. 上料记录维护（序号连续、重量合计同步）
/// 3. 完成压榨：分配果汁到容器、新建/合并酒批、耗尽采购批次
/// 4. 审计事件发布
pub struct PressRunApi {
    conn: Arc<Mutex<Connection>>,
    press_run_repo: Arc<PressRunRepository>,
    load_repo: Arc<PressLoadRepository>,
    audit: OptionalAuditPublisher,
    config: AllocationConfig,
}

impl PressRunApi {
    /// 创建新的PressRunApi实例
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        press_run_repo: Arc<PressRunRepository>,
        load_repo: Arc<PressLoadRepository>,
        audit: OptionalAuditPublisher,
        config: AllocationConfig,
    ) -> Self {
        Self {
            conn,
            press_run_repo,
            load_repo,
            audit,
            config,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询压榨批次
    pub fn get_press_run(&self, press_run_id: &str) -> ApiResult<PressRun> {
        self.press_run_repo
            .find_by_id(press_run_id)?
            .ok_or_else(|| press_run_not_found(press_run_id))
    }

    /// 查询压榨批次的有效上料（按序号）
    pub fn list_loads(&self, press_run_id: &str) -> ApiResult<Vec<PressLoad>> {
        self.get_press_run(press_run_id)?;
        Ok(self.load_repo.list_active(press_run_id)?)
    }

    // ==========================================
    // 压榨批次
    // ==========================================

    /// 创建压榨批次（in_progress，无名称）
    ///
    /// # 参数
    /// - press_date: 压榨日期
    /// - notes: 备注
    /// - actor: 操作人
    pub fn create_press_run(
        &self,
        press_date: NaiveDate,
        notes: Option<String>,
        actor: &str,
    ) -> ApiResult<PressRun> {
        validate_actor(actor)?;
        let run = PressRun::new(press_date, notes, actor.to_string());
        self.press_run_repo.insert(&run)?;

        tracing::info!(press_run_id = %run.press_run_id, %press_date, "创建压榨批次");
        self.audit.publish_create(
            EntityType::PressRun,
            &run.press_run_id,
            json!({ "press_date": run.press_date, "notes": run.notes }),
            actor,
            None,
        );
        Ok(run)
    }

    /// 取消压榨批次（in_progress → cancelled，不产生酒批，不改动采购批次）
    pub fn cancel_press_run(&self, press_run_id: &str, actor: &str) -> ApiResult<PressRun> {
        validate_actor(actor)?;
        let run = with_immediate_transaction(&self.conn, |tx| -> ApiResult<PressRun> {
            require_in_progress(tx, press_run_id)?;
            PressRunRepository::update_status_tx(
                tx,
                press_run_id,
                PressRunStatus::InProgress,
                PressRunStatus::Cancelled,
            )?;
            PressRunRepository::find_by_id_tx(tx, press_run_id)?
                .ok_or_else(|| press_run_not_found(press_run_id))
        })?;

        tracing::info!(press_run_id, "压榨批次已取消");
        self.audit.publish_update(
            EntityType::PressRun,
            press_run_id,
            json!({ "status": run.status }),
            actor,
            Some("取消压榨".to_string()),
        );
        Ok(run)
    }

    /// 物理删除压榨批次
    ///
    /// 合并历史与酒批保留，来源引用置空
    ///
    /// # 返回
    /// - Ok(n): 被解绑的合并历史行数
    pub fn hard_delete_press_run(&self, press_run_id: &str, actor: &str) -> ApiResult<usize> {
        validate_actor(actor)?;
        let detached = with_immediate_transaction(&self.conn, |tx| -> ApiResult<usize> {
            Ok(PressRunRepository::hard_delete_tx(tx, press_run_id)?)
        })?;

        tracing::info!(press_run_id, detached, "压榨批次已物理删除");
        self.audit.publish_delete(
            EntityType::PressRun,
            press_run_id,
            json!({ "detached_merge_history": detached }),
            actor,
            None,
        );
        Ok(detached)
    }

    // ==========================================
    // 上料
    // ==========================================

    /// 新增上料
    ///
    /// # 参数
    /// - press_run_id: 压榨批次ID
    /// - lot_id: 采购批次ID
    /// - input_weight_kg: 上料重量（> 0）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(PressLoad): 新上料（序号 = 现有最大序号 + 1）
    /// - Err(NotFound): 压榨批次或采购批次不存在
    /// - Err(Conflict): 采购批次已耗尽
    /// - Err(InvalidState): 压榨批次不在 in_progress
    pub fn add_load(
        &self,
        press_run_id: &str,
        lot_id: &str,
        input_weight_kg: f64,
        actor: &str,
    ) -> ApiResult<PressLoad> {
        validate_actor(actor)?;
        validate_weight(input_weight_kg)?;

        let result = with_immediate_transaction(&self.conn, |tx| -> ApiResult<(PressLoad, f64)> {
            require_in_progress(tx, press_run_id)?;
            require_usable_lot(tx, lot_id)?;

            let sequence = PressLoadRepository::max_sequence_tx(tx, press_run_id)? + 1;
            let now = now_ts();
            let load = PressLoad {
                load_id: uuid::Uuid::new_v4().to_string(),
                press_run_id: press_run_id.to_string(),
                lot_id: lot_id.to_string(),
                sequence,
                input_weight_kg,
                created_at: now,
                updated_at: now,
            };
            PressLoadRepository::insert_tx(tx, &load)?;
            let total = refresh_total_weight(tx, press_run_id)?;
            Ok((load, total))
        })?;
        let (load, total) = result;

        tracing::debug!(
            press_run_id,
            load_id = %load.load_id,
            sequence = load.sequence,
            total,
            "新增上料"
        );
        self.audit.publish_create(
            EntityType::PressLoad,
            &load.load_id,
            json!({
                "press_run_id": press_run_id,
                "lot_id": lot_id,
                "sequence": load.sequence,
                "input_weight_kg": input_weight_kg,
                "total_input_weight_kg": total,
            }),
            actor,
            None,
        );
        Ok(load)
    }

    /// 修改上料（替换采购批次与重量）
    pub fn update_load(
        &self,
        load_id: &str,
        lot_id: &str,
        input_weight_kg: f64,
        actor: &str,
    ) -> ApiResult<PressLoad> {
        validate_actor(actor)?;
        validate_weight(input_weight_kg)?;

        let (before, after, total) =
            with_immediate_transaction(&self.conn, |tx| -> ApiResult<(PressLoad, PressLoad, f64)> {
                let before = require_load(tx, load_id)?;
                require_in_progress(tx, &before.press_run_id)?;
                require_usable_lot(tx, lot_id)?;

                PressLoadRepository::update_tx(tx, load_id, lot_id, input_weight_kg)?;
                let total = refresh_total_weight(tx, &before.press_run_id)?;
                let after = require_load(tx, load_id)?;
                Ok((before, after, total))
            })?;

        self.audit.publish_update(
            EntityType::PressLoad,
            load_id,
            json!({
                "press_run_id": after.press_run_id,
                "lot_id": { "before": before.lot_id, "after": after.lot_id },
                "input_weight_kg": { "before": before.input_weight_kg, "after": after.input_weight_kg },
                "total_input_weight_kg": total,
            }),
            actor,
            None,
        );
        Ok(after)
    }

    /// 删除上料（软删除后重排序号为 1..n）
    ///
    /// # 返回
    /// - Ok(n): 剩余有效上料数量
    pub fn delete_load(&self, load_id: &str, actor: &str) -> ApiResult<usize> {
        validate_actor(actor)?;

        let (load, remaining, total) =
            with_immediate_transaction(&self.conn, |tx| -> ApiResult<(PressLoad, usize, f64)> {
                let load = require_load(tx, load_id)?;
                require_in_progress(tx, &load.press_run_id)?;

                PressLoadRepository::soft_delete_tx(tx, load_id)?;
                let remaining = PressLoadRepository::renumber_tx(tx, &load.press_run_id)?;
                let total = refresh_total_weight(tx, &load.press_run_id)?;
                Ok((load, remaining, total))
            })?;

        tracing::debug!(load_id, remaining, total, "删除上料并重排序号");
        self.audit.publish_delete(
            EntityType::PressLoad,
            load_id,
            json!({
                "press_run_id": load.press_run_id,
                "lot_id": load.lot_id,
                "input_weight_kg": load.input_weight_kg,
                "remaining_loads": remaining,
                "total_input_weight_kg": total,
            }),
            actor,
            None,
        );
        Ok(remaining)
    }

    // ==========================================
    // 完成压榨（果汁分配）
    // ==========================================

    /// 完成压榨并分配果汁
    ///
    /// 校验 → 纯计算分配计划 → 落库，全部在同一 IMMEDIATE 事务中；
    /// 容器状态与活动酒批在事务内读取，同一容器的并发完成因此串行：
    /// 一个新建酒批，另一个合并入该酒批。
    ///
    /// # 参数
    /// - press_run_id: 压榨批次ID
    /// - total_juice_volume_l: 实测出汁量
    /// - assignments: 容器分配指令
    /// - completion_date: 完成日期（用于压榨与酒批命名）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(AllocationOutcome): 命名、酒批与耗尽结果
    /// - Err(ApiError): 任一校验失败时不发生任何写入；落库失败整体回滚
    pub fn complete_press_run(
        &self,
        press_run_id: &str,
        total_juice_volume_l: f64,
        assignments: &[VesselAssignment],
        completion_date: NaiveDate,
        actor: &str,
    ) -> ApiResult<AllocationOutcome> {
        validate_actor(actor)?;
        let config = self.config;

        let outcome = with_immediate_transaction(&self.conn, |tx| -> ApiResult<AllocationOutcome> {
            let press_run = PressRunRepository::find_by_id_tx(tx, press_run_id)?
                .ok_or_else(|| press_run_not_found(press_run_id))?;
            let loads = PressLoadRepository::list_active_tx(tx, press_run_id)?;

            let mut lots: HashMap<String, PurchaseLot> = HashMap::new();
            for load in &loads {
                if lots.contains_key(&load.lot_id) {
                    continue;
                }
                if let Some(lot) = PurchaseLotRepository::find_by_id_tx(tx, &load.lot_id)? {
                    lots.insert(lot.lot_id.clone(), lot);
                }
            }

            let mut vessel_states: HashMap<String, VesselState> = HashMap::new();
            for assignment in assignments {
                if vessel_states.contains_key(&assignment.vessel_id) {
                    continue;
                }
                let vessel = match VesselRepository::find_by_id_tx(tx, &assignment.vessel_id)? {
                    Some(vessel) => vessel,
                    None => continue,
                };
                let active = BatchRepository::find_active_for_vessel_tx(tx, &vessel.vessel_id)?;
                let active_batch = match active {
                    Some(batch) => {
                        let composition =
                            BatchRepository::list_composition_tx(tx, &batch.batch_id)?;
                        Some(ActiveBatch { batch, composition })
                    }
                    None => None,
                };
                vessel_states.insert(
                    vessel.vessel_id.clone(),
                    VesselState {
                        vessel,
                        active_batch,
                    },
                );
            }

            let request = AllocationRequest {
                press_run: &press_run,
                loads: &loads,
                lots: &lots,
                assignments,
                vessel_states: &vessel_states,
                total_juice_volume_l,
            };
            let plan = allocate(&request, &config)?;

            let ctx = ApplyContext {
                actor,
                completion_date,
                now: now_ts(),
            };
            let store = SqliteAllocationStore::new(tx);
            Ok(apply_plan(&store, &plan, &ctx, &config)?)
        })?;

        tracing::info!(
            press_run_id,
            name = %outcome.press_run_name,
            batches = outcome.batches.len(),
            depleted = outcome.depleted_lot_ids.len(),
            "压榨批次已完成"
        );
        self.publish_completion(&outcome, actor);
        Ok(outcome)
    }

    /// 完成压榨后的审计事件（提交后发布）
    fn publish_completion(&self, outcome: &AllocationOutcome, actor: &str) {
        self.audit.publish_update(
            EntityType::PressRun,
            &outcome.press_run_id,
            json!({
                "status": PressRunStatus::Completed,
                "name": outcome.press_run_name,
                "total_input_weight_kg": outcome.total_input_weight_kg,
                "total_juice_volume_l": outcome.total_juice_volume_l,
                "extraction_rate": outcome.extraction_rate,
            }),
            actor,
            Some("完成压榨".to_string()),
        );

        for batch in &outcome.batches {
            let payload = json!({
                "name": batch.batch_name,
                "vessel_id": batch.vessel_id,
                "press_run_id": outcome.press_run_id,
                "volume_before_l": batch.volume_before_l,
                "volume_after_l": batch.volume_after_l,
                "merge_id": batch.merge_id,
                "composition": batch.composition,
            });
            if batch.created {
                self.audit
                    .publish_create(EntityType::Batch, &batch.batch_id, payload, actor, None);
            } else {
                self.audit.publish_update(
                    EntityType::Batch,
                    &batch.batch_id,
                    payload,
                    actor,
                    Some("压榨果汁合并".to_string()),
                );
            }
        }

        for lot_id in &outcome.depleted_lot_ids {
            self.audit.publish_update(
                EntityType::PurchaseLot,
                lot_id,
                json!({ "depleted": true, "press_run_id": outcome.press_run_id }),
                actor,
                Some("采购批次耗尽".to_string()),
            );
        }
    }
}

// ==========================================
// 事务内校验辅助函数
// ==========================================

fn press_run_not_found(press_run_id: &str) -> ApiError {
    ApiError::NotFound(format!("PressRun(id={})不存在", press_run_id))
}

fn validate_actor(actor: &str) -> ApiResult<()> {
    if actor.trim().is_empty() {
        return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
    }
    Ok(())
}

fn validate_weight(input_weight_kg: f64) -> ApiResult<()> {
    if !input_weight_kg.is_finite() || input_weight_kg <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "上料重量必须为正数: {}",
            input_weight_kg
        )));
    }
    Ok(())
}

/// 压榨批次存在且 in_progress
fn require_in_progress(conn: &Connection, press_run_id: &str) -> ApiResult<PressRun> {
    let run = PressRunRepository::find_by_id_tx(conn, press_run_id)?
        .ok_or_else(|| press_run_not_found(press_run_id))?;
    if !run.is_in_progress() {
        return Err(ApiError::InvalidState(format!(
            "压榨批次 {} 状态为 {}，上料只能在 in_progress 期间修改",
            press_run_id, run.status
        )));
    }
    Ok(run)
}

/// 采购批次存在且未耗尽
fn require_usable_lot(conn: &Connection, lot_id: &str) -> ApiResult<PurchaseLot> {
    let lot = PurchaseLotRepository::find_by_id_tx(conn, lot_id)?
        .ok_or_else(|| ApiError::NotFound(format!("PurchaseLot(id={})不存在", lot_id)))?;
    if lot.depleted {
        return Err(ApiError::Conflict(format!("采购批次 {} 已耗尽", lot_id)));
    }
    Ok(lot)
}

fn require_load(conn: &Connection, load_id: &str) -> ApiResult<PressLoad> {
    PressLoadRepository::find_tx(conn, load_id)?
        .ok_or_else(|| ApiError::NotFound(format!("PressLoad(id={})不存在", load_id)))
}

/// 重算并写回上料重量合计
fn refresh_total_weight(conn: &Connection, press_run_id: &str) -> ApiResult<f64> {
    let total = PressLoadRepository::sum_active_weight_tx(conn, press_run_id)?;
    PressRunRepository::update_total_weight_tx(conn, press_run_id, total)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::types::VesselStatus;
    use crate::domain::vessel::Vessel;

    struct Fixture {
        api: PressRunApi,
        lots: PurchaseLotRepository,
        vessels: VesselRepository,
    }

    fn fixture() -> Fixture {
        crate::logging::init_test();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let api = PressRunApi::new(
            conn.clone(),
            Arc::new(PressRunRepository::new(conn.clone())),
            Arc::new(PressLoadRepository::new(conn.clone())),
            OptionalAuditPublisher::none(),
            AllocationConfig::default(),
        );
        let lots = PurchaseLotRepository::new(conn.clone());
        lots.upsert_variety("kingston", "Kingston Black").unwrap();
        Fixture {
            api,
            lots,
            vessels: VesselRepository::new(conn),
        }
    }

    fn seed_lot(f: &Fixture, lot_id: &str, weight: f64) {
        let now = now_ts();
        f.lots
            .insert(&PurchaseLot {
                lot_id: lot_id.to_string(),
                variety_id: "kingston".to_string(),
                variety_name: None,
                vendor_id: "orchard".to_string(),
                total_input_weight_kg: weight,
                total_cost: weight * 0.5,
                allocated_weight_kg: 0.0,
                depleted: false,
                depleted_at: None,
                depleted_by: None,
                depleted_by_press_run_id: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn seed_vessel(f: &Fixture, vessel_id: &str, capacity: f64) {
        let now = now_ts();
        f.vessels
            .insert(&Vessel {
                vessel_id: vessel_id.to_string(),
                code: vessel_id.to_string(),
                capacity_l: capacity,
                status: VesselStatus::Available,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_add_load_sequences_and_total() {
        let f = fixture();
        seed_lot(&f, "L1", 1000.0);
        let run = f.api.create_press_run(date(), None, "cellar").unwrap();

        let a = f.api.add_load(&run.press_run_id, "L1", 300.0, "cellar").unwrap();
        let b = f.api.add_load(&run.press_run_id, "L1", 200.0, "cellar").unwrap();
        assert_eq!((a.sequence, b.sequence), (1, 2));

        let run = f.api.get_press_run(&run.press_run_id).unwrap();
        assert!((run.total_input_weight_kg - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_load_rejections() {
        let f = fixture();
        seed_lot(&f, "L1", 1000.0);
        let run = f.api.create_press_run(date(), None, "cellar").unwrap();

        let err = f.api.add_load(&run.press_run_id, "L1", 0.0, "cellar").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = f.api.add_load(&run.press_run_id, "missing", 10.0, "cellar").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = f.api.add_load("missing", "L1", 10.0, "cellar").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        f.api.cancel_press_run(&run.press_run_id, "cellar").unwrap();
        let err = f.api.add_load(&run.press_run_id, "L1", 10.0, "cellar").unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[test]
    fn test_delete_load_renumbers() {
        let f = fixture();
        seed_lot(&f, "L1", 1000.0);
        let run = f.api.create_press_run(date(), None, "cellar").unwrap();
        let ids: Vec<String> = (0..4)
            .map(|i| {
                f.api
                    .add_load(&run.press_run_id, "L1", 10.0 + i as f64, "cellar")
                    .unwrap()
                    .load_id
            })
            .collect();

        let remaining = f.api.delete_load(&ids[1], "cellar").unwrap();
        assert_eq!(remaining, 3);

        let loads = f.api.list_loads(&run.press_run_id).unwrap();
        let seqs: Vec<i32> = loads.iter().map(|l| l.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let order: Vec<&str> = loads.iter().map(|l| l.load_id.as_str()).collect();
        assert_eq!(order, vec![ids[0].as_str(), ids[2].as_str(), ids[3].as_str()]);

        let run = f.api.get_press_run(&run.press_run_id).unwrap();
        assert!((run.total_input_weight_kg - (10.0 + 12.0 + 13.0)).abs() < 1e-9);
    }

    #[test]
    fn test_update_load_replaces_lot_and_weight() {
        let f = fixture();
        seed_lot(&f, "L1", 1000.0);
        seed_lot(&f, "L2", 1000.0);
        let run = f.api.create_press_run(date(), None, "cellar").unwrap();
        let load = f.api.add_load(&run.press_run_id, "L1", 100.0, "cellar").unwrap();

        let updated = f.api.update_load(&load.load_id, "L2", 250.0, "cellar").unwrap();
        assert_eq!(updated.lot_id, "L2");
        assert_eq!(updated.sequence, 1);

        let run = f.api.get_press_run(&run.press_run_id).unwrap();
        assert!((run.total_input_weight_kg - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_complete_names_run_and_creates_batch() {
        let f = fixture();
        seed_lot(&f, "L1", 600.0);
        seed_lot(&f, "L2", 1000.0);
        seed_vessel(&f, "T01", 1000.0);
        let run = f.api.create_press_run(date(), None, "cellar").unwrap();
        f.api.add_load(&run.press_run_id, "L1", 600.0, "cellar").unwrap();
        f.api.add_load(&run.press_run_id, "L2", 400.0, "cellar").unwrap();

        let outcome = f
            .api
            .complete_press_run(
                &run.press_run_id,
                650.0,
                &[VesselAssignment::lossless("T01", 650.0)],
                date(),
                "cellar",
            )
            .unwrap();

        assert_eq!(outcome.press_run_name, "2024-03-15-01");
        assert_eq!(outcome.batches.len(), 1);
        assert!(outcome.batches[0].created);
        assert_eq!(outcome.depleted_lot_ids, vec!["L1".to_string()]);

        let run = f.api.get_press_run(&run.press_run_id).unwrap();
        assert_eq!(run.status, PressRunStatus::Completed);
        assert!((run.extraction_rate.unwrap() - 0.65).abs() < 1e-9);

        // 已完成的压榨不可再完成
        let err = f
            .api
            .complete_press_run(
                &run.press_run_id,
                650.0,
                &[VesselAssignment::lossless("T01", 10.0)],
                date(),
                "cellar",
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[test]
    fn test_cancel_requires_in_progress() {
        let f = fixture();
        let run = f.api.create_press_run(date(), None, "cellar").unwrap();
        let cancelled = f.api.cancel_press_run(&run.press_run_id, "cellar").unwrap();
        assert_eq!(cancelled.status, PressRunStatus::Cancelled);

        let err = f.api.cancel_press_run(&run.press_run_id, "cellar").unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }
}
