use crate::domain::press_run::PressLoad;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_ts, now_ts, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_LOAD: &str = r#"
    SELECT load_id, press_run_id, lot_id, sequence, input_weight_kg, created_at, updated_at
    FROM press_load
"#;

// ==========================================
// PressLoadRepository - 上料记录仓储
// ==========================================
// 所有写入函数均为 `_tx` 形式，由 API 层在 IMMEDIATE 事务中调用
pub struct PressLoadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PressLoadRepository {
    /// 创建新的PressLoadRepository实例
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
    // 查询
    // ==========================================

    /// 查询压榨批次的有效上料（按序号排序）
    pub fn list_active(&self, press_run_id: &str) -> RepositoryResult<Vec<PressLoad>> {
        let conn = self.get_conn()?;
        Self::list_active_tx(&conn, press_run_id)
    }

    /// 事务内查询有效上料
    pub fn list_active_tx(
        conn: &Connection,
        press_run_id: &str,
    ) -> RepositoryResult<Vec<PressLoad>> {
        let sql = format!(
            "{} WHERE press_run_id = ?1 AND deleted_at IS NULL ORDER BY sequence, created_at",
            SELECT_LOAD
        );
        let mut stmt = conn.prepare(&sql)?;
        let loads = stmt
            .query_map(params![press_run_id], map_load_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loads)
    }

    /// 事务内按ID查询有效上料
    pub fn find_tx(conn: &Connection, load_id: &str) -> RepositoryResult<Option<PressLoad>> {
        let sql = format!("{} WHERE load_id = ?1 AND deleted_at IS NULL", SELECT_LOAD);
        let load = conn
            .query_row(&sql, params![load_id], map_load_row)
            .optional()?;
        Ok(load)
    }

    /// 事务内查询当前最大序号（无上料时为 0）
    pub fn max_sequence_tx(conn: &Connection, press_run_id: &str) -> RepositoryResult<i32> {
        let max: Option<i32> = conn.query_row(
            r#"SELECT MAX(sequence) FROM press_load
               WHERE press_run_id = ?1 AND deleted_at IS NULL"#,
            params![press_run_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    /// 事务内汇总有效上料重量
    pub fn sum_active_weight_tx(conn: &Connection, press_run_id: &str) -> RepositoryResult<f64> {
        let total: f64 = conn.query_row(
            r#"SELECT COALESCE(SUM(input_weight_kg), 0) FROM press_load
               WHERE press_run_id = ?1 AND deleted_at IS NULL"#,
            params![press_run_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 事务内新增上料
    pub fn insert_tx(conn: &Connection, load: &PressLoad) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO press_load (
                load_id, press_run_id, lot_id, sequence, input_weight_kg, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                load.load_id,
                load.press_run_id,
                load.lot_id,
                load.sequence,
                load.input_weight_kg,
                fmt_ts(&load.created_at),
                fmt_ts(&load.updated_at),
            ],
        )?;
        Ok(load.load_id.clone())
    }

    /// 事务内替换上料的批次与重量
    pub fn update_tx(
        conn: &Connection,
        load_id: &str,
        lot_id: &str,
        input_weight_kg: f64,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE press_load SET lot_id = ?2, input_weight_kg = ?3, updated_at = ?4
               WHERE load_id = ?1 AND deleted_at IS NULL"#,
            params![load_id, lot_id, input_weight_kg, fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PressLoad".to_string(),
                id: load_id.to_string(),
            });
        }
        Ok(())
    }

    /// 事务内软删除上料
    pub fn soft_delete_tx(conn: &Connection, load_id: &str) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE press_load SET deleted_at = ?2, updated_at = ?2
               WHERE load_id = ?1 AND deleted_at IS NULL"#,
            params![load_id, fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PressLoad".to_string(),
                id: load_id.to_string(),
            });
        }
        Ok(())
    }

    /// 事务内把有效上料重排为 1..n（保持原有相对顺序）
    ///
    /// # 返回
    /// - Ok(n): 重排后的上料数量
    pub fn renumber_tx(conn: &Connection, press_run_id: &str) -> RepositoryResult<usize> {
        let loads = Self::list_active_tx(conn, press_run_id)?;
        let ts = fmt_ts(&now_ts());
        let mut stmt = conn.prepare(
            "UPDATE press_load SET sequence = ?2, updated_at = ?3 WHERE load_id = ?1",
        )?;
        for (idx, load) in loads.iter().enumerate() {
            let seq = (idx + 1) as i32;
            if load.sequence != seq {
                stmt.execute(params![load.load_id, seq, ts])?;
            }
        }
        Ok(loads.len())
    }
}

fn map_load_row(row: &Row<'_>) -> rusqlite::Result<PressLoad> {
    Ok(PressLoad {
        load_id: row.get(0)?,
        press_run_id: row.get(1)?,
        lot_id: row.get(2)?,
        sequence: row.get(3)?,
        input_weight_kg: row.get(4)?,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
        updated_at: parse_ts(6, &row.get::<_, String>(6)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::press_run::PressRun;
    use crate::repository::press_run_repo::PressRunRepository;
    use chrono::NaiveDate;

    fn setup() -> (Arc<Mutex<Connection>>, String) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO purchase_lot (lot_id, variety_id, vendor_id, total_input_weight_kg,
                   total_cost, created_at, updated_at)
               VALUES ('L1', 'kingston', 'orchard', 1000, 500, '2024-03-01 08:00:00', '2024-03-01 08:00:00')"#,
            [],
        )
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let run = PressRun::new(date, None, "t".to_string());
        PressRunRepository::insert_tx(&conn, &run).unwrap();
        (Arc::new(Mutex::new(conn)), run.press_run_id)
    }

    fn make_load(press_run_id: &str, seq: i32, weight: f64) -> PressLoad {
        let now = now_ts();
        PressLoad {
            load_id: uuid::Uuid::new_v4().to_string(),
            press_run_id: press_run_id.to_string(),
            lot_id: "L1".to_string(),
            sequence: seq,
            input_weight_kg: weight,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_renumber_after_delete_keeps_order() {
        let (conn, run_id) = setup();
        let guard = conn.lock().unwrap();
        let loads: Vec<PressLoad> = (1..=4)
            .map(|i| make_load(&run_id, i, i as f64 * 10.0))
            .collect();
        for load in &loads {
            PressLoadRepository::insert_tx(&guard, load).unwrap();
        }

        PressLoadRepository::soft_delete_tx(&guard, &loads[1].load_id).unwrap();
        assert_eq!(PressLoadRepository::renumber_tx(&guard, &run_id).unwrap(), 3);

        let remaining = PressLoadRepository::list_active_tx(&guard, &run_id).unwrap();
        let seqs: Vec<i32> = remaining.iter().map(|l| l.sequence).collect();
        let weights: Vec<f64> = remaining.iter().map(|l| l.input_weight_kg).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(weights, vec![10.0, 30.0, 40.0]);
        assert_eq!(PressLoadRepository::max_sequence_tx(&guard, &run_id).unwrap(), 3);
        assert_eq!(PressLoadRepository::sum_active_weight_tx(&guard, &run_id).unwrap(), 80.0);
    }

    #[test]
    fn test_empty_run_has_zero_max_and_sum() {
        let (conn, run_id) = setup();
        let repo = PressLoadRepository::new(conn.clone());
        assert!(repo.list_active(&run_id).unwrap().is_empty());

        let guard = conn.lock().unwrap();
        assert_eq!(PressLoadRepository::max_sequence_tx(&guard, &run_id).unwrap(), 0);
        assert_eq!(PressLoadRepository::sum_active_weight_tx(&guard, &run_id).unwrap(), 0.0);
        assert!(PressLoadRepository::soft_delete_tx(&guard, "missing").is_err());
    }
}
