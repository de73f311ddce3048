// ==========================================
// 果酒压榨台账 - 合并历史数据仓储
// ==========================================
// 只追加、不修改: 仓储只提供 insert / 读取
// 来源压榨被物理删除时由 PressRunRepository::hard_delete_tx 置空引用
// ==========================================

use crate::domain::batch::MergeHistoryRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_ts, parse_ts};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MergeHistoryRepository - 合并历史仓储
// ==========================================
pub struct MergeHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MergeHistoryRepository {
    /// 创建新的MergeHistoryRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 事务内追加一条合并记录
    pub fn insert_tx(conn: &Connection, record: &MergeHistoryRecord) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO merge_history (
                merge_id, target_batch_id, source_press_run_id, source_batch_id,
                volume_added_l, volume_before_l, volume_after_l, transfer_loss_l,
                notes, merged_at, merged_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                record.merge_id,
                record.target_batch_id,
                record.source_press_run_id,
                record.source_batch_id,
                record.volume_added_l,
                record.volume_before_l,
                record.volume_after_l,
                record.transfer_loss_l,
                record.notes,
                fmt_ts(&record.merged_at),
                record.merged_by,
            ],
        )?;
        Ok(record.merge_id.clone())
    }

    /// 查询目标酒批的合并历史（按时间先后）
    pub fn list_by_target(&self, batch_id: &str) -> RepositoryResult<Vec<MergeHistoryRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT merge_id, target_batch_id, source_press_run_id, source_batch_id,
                      volume_added_l, volume_before_l, volume_after_l, transfer_loss_l,
                      notes, merged_at, merged_by
               FROM merge_history
               WHERE target_batch_id = ?1
               ORDER BY merged_at, rowid"#,
        )?;
        let records = stmt
            .query_map(params![batch_id], map_merge_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn map_merge_row(row: &Row<'_>) -> rusqlite::Result<MergeHistoryRecord> {
    Ok(MergeHistoryRecord {
        merge_id: row.get(0)?,
        target_batch_id: row.get(1)?,
        source_press_run_id: row.get(2)?,
        source_batch_id: row.get(3)?,
        volume_added_l: row.get(4)?,
        volume_before_l: row.get(5)?,
        volume_after_l: row.get(6)?,
        transfer_loss_l: row.get(7)?,
        notes: row.get(8)?,
        merged_at: parse_ts(9, &row.get::<_, String>(9)?)?,
        merged_by: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::row_utils::now_ts;

    #[test]
    fn test_append_and_list_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO batch (batch_id, name, status, current_volume_l, start_date,
                   created_by, created_at, updated_at)
               VALUES ('B1', 'b1', 'fermentation', 200, '2024-03-15', 't',
                   '2024-03-15 08:00:00', '2024-03-15 08:00:00')"#,
            [],
        )
        .unwrap();

        let ts = now_ts();
        let first = MergeHistoryRecord {
            merge_id: "M1".to_string(),
            target_batch_id: "B1".to_string(),
            source_press_run_id: None,
            source_batch_id: None,
            volume_added_l: 100.0,
            volume_before_l: 200.0,
            volume_after_l: 300.0,
            transfer_loss_l: 0.0,
            notes: None,
            merged_at: ts,
            merged_by: "alice".to_string(),
        };
        let mut second = first.clone();
        second.merge_id = "M2".to_string();
        second.volume_before_l = 300.0;
        second.volume_after_l = 350.0;
        second.volume_added_l = 50.0;

        MergeHistoryRepository::insert_tx(&conn, &first).unwrap();
        MergeHistoryRepository::insert_tx(&conn, &second).unwrap();

        let repo = MergeHistoryRepository::new(Arc::new(Mutex::new(conn)));
        let records = repo.list_by_target("B1").unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.merge_id.as_str()).collect();
        assert_eq!(ids, vec!["M1", "M2"]);
        assert!(repo.list_by_target("B2").unwrap().is_empty());
    }
}
