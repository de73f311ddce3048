// ==========================================
// 果酒压榨台账 - 酒批与成分数据仓储
// ==========================================
// 职责: batch / batch_composition 表的读写
// 活动酒批: status ∈ {fermentation, aging} 且 vessel_id 非空且未软删除
// 红线: Repository 不含业务逻辑（成分重算由 engine::composition 完成）
// ==========================================

use crate::domain::batch::{Batch, CompositionEntry};
use crate::domain::types::BatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_date, fmt_ts, now_ts, parse_date, parse_enum, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_BATCH: &str = r#"
    SELECT batch_id, name, vessel_id, status, current_volume_l, origin_press_run_id,
           start_date, created_by, created_at, updated_at
    FROM batch
"#;

const SELECT_COMPOSITION: &str = r#"
    SELECT entry_id, batch_id, lot_id, variety_id, input_weight_kg, juice_volume_l,
           fraction_of_batch, material_cost
    FROM batch_composition
"#;

// ==========================================
// BatchRepository - 酒批仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 创建新的BatchRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 酒批查询
    // ==========================================

    /// 按ID查询（软删除视为不存在）
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, batch_id)
    }

    /// 事务内按ID查询
    pub fn find_by_id_tx(conn: &Connection, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let sql = format!("{} WHERE batch_id = ?1 AND deleted_at IS NULL", SELECT_BATCH);
        let batch = conn
            .query_row(&sql, params![batch_id], map_batch_row)
            .optional()?;
        Ok(batch)
    }

    /// 事务内查询容器当前的活动酒批
    ///
    /// 说明：必须在 IMMEDIATE 事务中调用，保证“是否已有活动酒批”的判定
    /// 与随后的新建/合并写入串行化
    pub fn find_active_for_vessel_tx(
        conn: &Connection,
        vessel_id: &str,
    ) -> RepositoryResult<Option<Batch>> {
        let sql = format!(
            r#"{} WHERE vessel_id = ?1 AND status IN (?2, ?3) AND deleted_at IS NULL
               ORDER BY created_at DESC LIMIT 1"#,
            SELECT_BATCH
        );
        let [fermentation, aging] = BatchStatus::OCCUPYING_DB_STRS;
        let batch = conn
            .query_row(&sql, params![vessel_id, fermentation, aging], map_batch_row)
            .optional()?;
        Ok(batch)
    }

    /// 事务内检查酒批名称是否已被占用（含软删除记录）
    pub fn name_exists_tx(conn: &Connection, name: &str) -> RepositoryResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM batch WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ==========================================
    // 酒批写入
    // ==========================================

    /// 事务内新建酒批
    pub fn insert_tx(conn: &Connection, batch: &Batch) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO batch (
                batch_id, name, vessel_id, status, current_volume_l, origin_press_run_id,
                start_date, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                batch.batch_id,
                batch.name,
                batch.vessel_id,
                batch.status.to_db_str(),
                batch.current_volume_l,
                batch.origin_press_run_id,
                fmt_date(&batch.start_date),
                batch.created_by,
                fmt_ts(&batch.created_at),
                fmt_ts(&batch.updated_at),
            ],
        )?;
        Ok(batch.batch_id.clone())
    }

    /// 事务内更新酒批当前体积
    pub fn update_volume_tx(
        conn: &Connection,
        batch_id: &str,
        current_volume_l: f64,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE batch SET current_volume_l = ?2, updated_at = ?3
               WHERE batch_id = ?1 AND deleted_at IS NULL"#,
            params![batch_id, current_volume_l, fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Batch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    /// 事务内归档酒批并释放容器（vessel_id 置空）
    pub fn archive_tx(conn: &Connection, batch_id: &str) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE batch SET status = ?2, vessel_id = NULL, updated_at = ?3
               WHERE batch_id = ?1 AND deleted_at IS NULL"#,
            params![batch_id, BatchStatus::Archived.to_db_str(), fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Batch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 成分（溯源）
    // ==========================================

    /// 查询酒批成分（按录入顺序）
    pub fn list_composition(&self, batch_id: &str) -> RepositoryResult<Vec<CompositionEntry>> {
        let conn = self.get_conn()?;
        Self::list_composition_tx(&conn, batch_id)
    }

    /// 事务内查询酒批成分
    pub fn list_composition_tx(
        conn: &Connection,
        batch_id: &str,
    ) -> RepositoryResult<Vec<CompositionEntry>> {
        let sql = format!("{} WHERE batch_id = ?1 ORDER BY entry_id", SELECT_COMPOSITION);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![batch_id], map_composition_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// 事务内保存成分列表
    ///
    /// 说明：entry_id 为 Some 的条目按ID更新，为 None 的条目新增；
    /// 返回保存后带 entry_id 的完整列表
    pub fn save_composition_tx(
        conn: &Connection,
        entries: &[CompositionEntry],
    ) -> RepositoryResult<Vec<CompositionEntry>> {
        let ts = fmt_ts(&now_ts());
        let mut update = conn.prepare(
            r#"UPDATE batch_composition
               SET input_weight_kg = ?2, juice_volume_l = ?3, fraction_of_batch = ?4,
                   material_cost = ?5, updated_at = ?6
               WHERE entry_id = ?1"#,
        )?;
        let mut insert = conn.prepare(
            r#"INSERT INTO batch_composition (
                batch_id, lot_id, variety_id, input_weight_kg, juice_volume_l,
                fraction_of_batch, material_cost, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )?;

        let mut saved = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut entry = entry.clone();
            match entry.entry_id {
                Some(id) => {
                    let rows = update.execute(params![
                        id,
                        entry.input_weight_kg,
                        entry.juice_volume_l,
                        entry.fraction_of_batch,
                        entry.material_cost,
                        ts,
                    ])?;
                    if rows == 0 {
                        return Err(RepositoryError::NotFound {
                            entity: "CompositionEntry".to_string(),
                            id: id.to_string(),
                        });
                    }
                }
                None => {
                    insert.execute(params![
                        entry.batch_id,
                        entry.lot_id,
                        entry.variety_id,
                        entry.input_weight_kg,
                        entry.juice_volume_l,
                        entry.fraction_of_batch,
                        entry.material_cost,
                        ts,
                    ])?;
                    entry.entry_id = Some(conn.last_insert_rowid());
                }
            }
            saved.push(entry);
        }
        Ok(saved)
    }
}

fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<Batch> {
    Ok(Batch {
        batch_id: row.get(0)?,
        name: row.get(1)?,
        vessel_id: row.get(2)?,
        status: parse_enum(3, &row.get::<_, String>(3)?, BatchStatus::from_db_str)?,
        current_volume_l: row.get(4)?,
        origin_press_run_id: row.get(5)?,
        start_date: parse_date(6, &row.get::<_, String>(6)?)?,
        created_by: row.get(7)?,
        created_at: parse_ts(8, &row.get::<_, String>(8)?)?,
        updated_at: parse_ts(9, &row.get::<_, String>(9)?)?,
    })
}

fn map_composition_row(row: &Row<'_>) -> rusqlite::Result<CompositionEntry> {
    Ok(CompositionEntry {
        entry_id: Some(row.get(0)?),
        batch_id: row.get(1)?,
        lot_id: row.get(2)?,
        variety_id: row.get(3)?,
        input_weight_kg: row.get(4)?,
        juice_volume_l: row.get(5)?,
        fraction_of_batch: row.get(6)?,
        material_cost: row.get(7)?,
    })
}
