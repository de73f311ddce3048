// ==========================================
// 果酒压榨台账 - 酒批 API
// ==========================================
// 职责: 酒批与成分查询、合并历史查询、酒批间转移
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::config::AllocationConfig;
use crate::domain::batch::{Batch, CompositionEntry, MergeHistoryRecord};
use crate::domain::types::{EntityType, VesselStatus};
use crate::engine::allocation::ActiveBatch;
use crate::engine::composition::check_invariants;
use crate::engine::events::OptionalAuditPublisher;
use crate::engine::transfer::plan_transfer;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::merge_history_repo::MergeHistoryRepository;
use crate::repository::row_utils::now_ts;
use crate::repository::transaction::with_immediate_transaction;
use crate::repository::vessel_repo::VesselRepository;

/// 酒批间转移结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub merge_id: String,
    pub source_batch_id: String,
    pub target_batch_id: String,
    pub net_volume_l: f64,
    pub source_after_l: f64,
    pub source_archived: bool,
    pub target_after_l: f64,
    pub source_composition: Vec<CompositionEntry>,
    pub target_composition: Vec<CompositionEntry>,
}

// ==========================================
// BatchApi - 酒批 API
// ==========================================
pub struct BatchApi {
    conn: Arc<Mutex<Connection>>,
    batch_repo: Arc<BatchRepository>,
    merge_history_repo: Arc<MergeHistoryRepository>,
    audit: OptionalAuditPublisher,
    config: AllocationConfig,
}

impl BatchApi {
    /// 创建新的BatchApi实例
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        batch_repo: Arc<BatchRepository>,
        merge_history_repo: Arc<MergeHistoryRepository>,
        audit: OptionalAuditPublisher,
        config: AllocationConfig,
    ) -> Self {
        Self {
            conn,
            batch_repo,
            merge_history_repo,
            audit,
            config,
        }
    }

    /// 查询酒批
    pub fn get_batch(&self, batch_id: &str) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_id(batch_id)?
            .ok_or_else(|| batch_not_found(batch_id))
    }

    /// 查询酒批成分（溯源条目，按录入顺序）
    pub fn composition(&self, batch_id: &str) -> ApiResult<Vec<CompositionEntry>> {
        self.get_batch(batch_id)?;
        Ok(self.batch_repo.list_composition(batch_id)?)
    }

    /// 查询酒批的合并历史（按时间先后）
    pub fn merge_history(&self, batch_id: &str) -> ApiResult<Vec<MergeHistoryRecord>> {
        self.get_batch(batch_id)?;
        Ok(self.merge_history_repo.list_by_target(batch_id)?)
    }

    /// 酒批间转移
    ///
    /// # 参数
    /// - source_batch_id: 来源酒批
    /// - target_batch_id: 目标酒批
    /// - volume_l: 从来源取出的体积
    /// - loss_l: 转移损耗（目标实收 = volume_l - loss_l）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(TransferOutcome): 来源转空时已归档并释放容器
    /// - Err(NotFound): 酒批或目标容器不存在
    /// - Err(InvalidState): 酒批不活动、同一酒批、体积或容量超限
    /// - Err(InvalidInput): 体积或损耗非法
    pub fn transfer_between_batches(
        &self,
        source_batch_id: &str,
        target_batch_id: &str,
        volume_l: f64,
        loss_l: f64,
        actor: &str,
    ) -> ApiResult<TransferOutcome> {
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        let config = self.config;

        let outcome = with_immediate_transaction(&self.conn, |tx| -> ApiResult<TransferOutcome> {
            let source = load_active(tx, source_batch_id)?;
            let target = load_active(tx, target_batch_id)?;
            let target_vessel_id = target.batch.vessel_id.clone().ok_or_else(|| {
                ApiError::InvalidState(format!("目标酒批 {} 不在容器中", target_batch_id))
            })?;
            let target_vessel = VesselRepository::find_by_id_tx(tx, &target_vessel_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Vessel(id={})不存在", target_vessel_id)))?;

            let plan = plan_transfer(&source, &target, &target_vessel, volume_l, loss_l, &config)?;

            BatchRepository::update_volume_tx(tx, source_batch_id, plan.source_after_l)?;
            let source_composition =
                BatchRepository::save_composition_tx(tx, &plan.source_composition)?;
            BatchRepository::update_volume_tx(tx, target_batch_id, plan.target_after_l)?;
            let target_composition =
                BatchRepository::save_composition_tx(tx, &plan.target_composition)?;

            let record = MergeHistoryRecord::from_batch(
                target_batch_id,
                source_batch_id,
                plan.target_before_l,
                plan.net_volume_l,
                plan.transfer_loss_l,
                now_ts(),
                actor,
            );
            MergeHistoryRepository::insert_tx(tx, &record)?;

            if plan.source_drained {
                BatchRepository::archive_tx(tx, source_batch_id)?;
                if let Some(vessel_id) = &source.batch.vessel_id {
                    VesselRepository::set_status_tx(tx, vessel_id, VesselStatus::Available)?;
                }
            }

            for (batch_id, entries, volume) in [
                (source_batch_id, &source_composition, plan.source_after_l),
                (target_batch_id, &target_composition, plan.target_after_l),
            ] {
                if volume <= 0.0 {
                    continue;
                }
                let report = check_invariants(entries, volume);
                if !report.holds(config.fraction_epsilon) {
                    tracing::warn!(
                        batch_id,
                        fraction_sum = report.fraction_sum,
                        volume_sum = report.volume_sum_l,
                        expected = report.expected_volume_l,
                        "酒批成分不变量偏差超出容差"
                    );
                }
            }

            Ok(TransferOutcome {
                merge_id: record.merge_id,
                source_batch_id: source_batch_id.to_string(),
                target_batch_id: target_batch_id.to_string(),
                net_volume_l: plan.net_volume_l,
                source_after_l: plan.source_after_l,
                source_archived: plan.source_drained,
                target_after_l: plan.target_after_l,
                source_composition,
                target_composition,
            })
        })?;

        tracing::info!(
            source = source_batch_id,
            target = target_batch_id,
            net = outcome.net_volume_l,
            archived = outcome.source_archived,
            "酒批间转移完成"
        );
        self.audit.publish_update(
            EntityType::Batch,
            source_batch_id,
            json!({
                "transferred_to": target_batch_id,
                "volume_l": volume_l,
                "volume_after_l": outcome.source_after_l,
                "archived": outcome.source_archived,
            }),
            actor,
            Some("酒批转出".to_string()),
        );
        self.audit.publish_update(
            EntityType::Batch,
            target_batch_id,
            json!({
                "transferred_from": source_batch_id,
                "net_volume_l": outcome.net_volume_l,
                "transfer_loss_l": loss_l,
                "volume_after_l": outcome.target_after_l,
                "merge_id": outcome.merge_id,
            }),
            actor,
            Some("酒批转入".to_string()),
        );
        Ok(outcome)
    }
}

fn batch_not_found(batch_id: &str) -> ApiError {
    ApiError::NotFound(format!("Batch(id={})不存在", batch_id))
}

/// 事务内读取酒批及其成分
fn load_active(conn: &Connection, batch_id: &str) -> ApiResult<ActiveBatch> {
    let batch = BatchRepository::find_by_id_tx(conn, batch_id)?
        .ok_or_else(|| batch_not_found(batch_id))?;
    let composition = BatchRepository::list_composition_tx(conn, batch_id)?;
    Ok(ActiveBatch { batch, composition })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::types::BatchStatus;
    use crate::domain::vessel::Vessel;
    use chrono::NaiveDate;

    fn setup() -> (Arc<Mutex<Connection>>, BatchApi) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let api = BatchApi::new(
            conn.clone(),
            Arc::new(BatchRepository::new(conn.clone())),
            Arc::new(MergeHistoryRepository::new(conn.clone())),
            OptionalAuditPublisher::none(),
            AllocationConfig::default(),
        );
        (conn, api)
    }

    // 直接写入容器、酒批和单条成分（采购批次需先存在）
    fn seed_batch(
        conn: &Arc<Mutex<Connection>>,
        batch_id: &str,
        vessel_id: &str,
        lot_id: &str,
        volume: f64,
    ) {
        let now = now_ts();
        VesselRepository::new(conn.clone())
            .insert(&Vessel {
                vessel_id: vessel_id.to_string(),
                code: vessel_id.to_string(),
                capacity_l: 500.0,
                status: VesselStatus::InUse,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        let guard = conn.lock().unwrap();
        guard
            .execute_batch(&format!(
                "INSERT OR IGNORE INTO variety (variety_id, name) VALUES ('v', 'Dabinett');
                 INSERT INTO purchase_lot (lot_id, variety_id, vendor_id, total_input_weight_kg,
                     total_cost, allocated_weight_kg, depleted, created_at, updated_at)
                 VALUES ('{lot}', 'v', 'o', 1000, 500, 0, 0, '2024-03-01 00:00:00', '2024-03-01 00:00:00');",
                lot = lot_id
            ))
            .unwrap();
        BatchRepository::insert_tx(
            &guard,
            &Batch {
                batch_id: batch_id.to_string(),
                name: batch_id.to_string(),
                vessel_id: Some(vessel_id.to_string()),
                status: BatchStatus::Fermentation,
                current_volume_l: volume,
                origin_press_run_id: None,
                start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                created_by: "t".to_string(),
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
        BatchRepository::save_composition_tx(
            &guard,
            &[CompositionEntry {
                entry_id: None,
                batch_id: batch_id.to_string(),
                lot_id: lot_id.to_string(),
                variety_id: "v".to_string(),
                input_weight_kg: volume * 1.5,
                juice_volume_l: volume,
                fraction_of_batch: 1.0,
                material_cost: volume * 0.75,
            }],
        )
        .unwrap();
    }

    #[test]
    fn test_reads_require_existing_batch() {
        let (_conn, api) = setup();
        assert!(matches!(api.get_batch("nope").unwrap_err(), ApiError::NotFound(_)));
        assert!(matches!(api.composition("nope").unwrap_err(), ApiError::NotFound(_)));
        assert!(matches!(api.merge_history("nope").unwrap_err(), ApiError::NotFound(_)));
    }

    #[test]
    fn test_partial_transfer_records_history() {
        let (conn, api) = setup();
        seed_batch(&conn, "S", "T01", "L1", 200.0);
        seed_batch(&conn, "T", "T02", "L2", 100.0);

        let outcome = api.transfer_between_batches("S", "T", 50.0, 1.0, "cellar").unwrap();
        assert!(!outcome.source_archived);
        assert!((outcome.source_after_l - 150.0).abs() < 1e-9);
        assert!((outcome.target_after_l - 149.0).abs() < 1e-9);

        let target = api.composition("T").unwrap();
        assert!(check_invariants(&target, 149.0).holds(1e-6));
        assert_eq!(target.len(), 2);

        let history = api.merge_history("T").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source_batch_id.as_deref(), Some("S"));
        assert!(history[0].source_press_run_id.is_none());
        assert!((history[0].volume_added_l - 49.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_transfer_archives_source_and_frees_vessel() {
        let (conn, api) = setup();
        seed_batch(&conn, "S", "T01", "L1", 80.0);
        seed_batch(&conn, "T", "T02", "L2", 100.0);

        let outcome = api.transfer_between_batches("S", "T", 80.0, 0.0, "cellar").unwrap();
        assert!(outcome.source_archived);

        let source = api.get_batch("S").unwrap();
        assert_eq!(source.status, BatchStatus::Archived);
        assert!(source.vessel_id.is_none());
        assert_eq!(source.current_volume_l, 0.0);

        let vessel = VesselRepository::new(conn.clone()).find_by_id("T01").unwrap().unwrap();
        assert_eq!(vessel.status, VesselStatus::Available);

        // 已归档的酒批不能再转出
        let err = api.transfer_between_batches("S", "T", 1.0, 0.0, "cellar").unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }
}
