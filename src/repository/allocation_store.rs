// ==========================================
// 果酒压榨台账 - 分配落库接口的 SQLite 实现
// ==========================================
// 持有事务内连接引用，全部委托给各仓储的 `_tx` 函数
// ==========================================

use crate::domain::batch::{Batch, CompositionEntry, MergeHistoryRecord};
use crate::domain::press_run::PressRunCompletion;
use crate::domain::purchase::LotDepletion;
use crate::domain::types::VesselStatus;
use crate::engine::apply::AllocationStore;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::merge_history_repo::MergeHistoryRepository;
use crate::repository::press_run_repo::PressRunRepository;
use crate::repository::purchase_repo::PurchaseLotRepository;
use crate::repository::vessel_repo::VesselRepository;
use rusqlite::Connection;

pub struct SqliteAllocationStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteAllocationStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl AllocationStore for SqliteAllocationStore<'_> {
    fn press_run_names_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        PressRunRepository::names_with_prefix_tx(self.conn, prefix)
    }

    fn complete_press_run(&self, completion: &PressRunCompletion) -> RepositoryResult<()> {
        PressRunRepository::complete_tx(self.conn, completion)
    }

    fn batch_name_exists(&self, name: &str) -> RepositoryResult<bool> {
        BatchRepository::name_exists_tx(self.conn, name)
    }

    fn insert_batch(&self, batch: &Batch) -> RepositoryResult<()> {
        BatchRepository::insert_tx(self.conn, batch).map(|_| ())
    }

    fn update_batch_volume(&self, batch_id: &str, current_volume_l: f64) -> RepositoryResult<()> {
        BatchRepository::update_volume_tx(self.conn, batch_id, current_volume_l)
    }

    fn save_composition(
        &self,
        entries: &[CompositionEntry],
    ) -> RepositoryResult<Vec<CompositionEntry>> {
        BatchRepository::save_composition_tx(self.conn, entries)
    }

    fn append_merge_history(&self, record: &MergeHistoryRecord) -> RepositoryResult<()> {
        MergeHistoryRepository::insert_tx(self.conn, record).map(|_| ())
    }

    fn add_lot_allocated_weight(&self, lot_id: &str, weight_kg: f64) -> RepositoryResult<f64> {
        PurchaseLotRepository::add_allocated_weight_tx(self.conn, lot_id, weight_kg)
    }

    fn mark_lot_depleted(&self, depletion: &LotDepletion) -> RepositoryResult<bool> {
        PurchaseLotRepository::mark_depleted_tx(self.conn, depletion)
    }

    fn set_vessel_status(&self, vessel_id: &str, status: VesselStatus) -> RepositoryResult<()> {
        VesselRepository::set_status_tx(self.conn, vessel_id, status)
    }
}
