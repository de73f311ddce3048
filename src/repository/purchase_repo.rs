// ==========================================
// 果酒压榨台账 - 采购批次数据仓储
// ==========================================
// 采购台账属于外部协作方；本仓储提供:
// - getLot / markDepleted（协作方接口）
// - 分配消耗量累计（物化计数器 allocated_weight_kg）
// - insert / soft_delete（供协作方或测试装载数据）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::purchase::{LotDepletion, PurchaseLot};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_ts, now_ts, parse_opt_ts, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_LOT: &str = r#"
    SELECT
        l.lot_id, l.variety_id, v.name, l.vendor_id,
        l.total_input_weight_kg, l.total_cost, l.allocated_weight_kg,
        l.depleted, l.depleted_at, l.depleted_by, l.depleted_by_press_run_id,
        l.created_at, l.updated_at
    FROM purchase_lot l
    LEFT JOIN variety v ON v.variety_id = l.variety_id
"#;

// ==========================================
// PurchaseLotRepository - 采购批次仓储
// ==========================================
pub struct PurchaseLotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PurchaseLotRepository {
    /// 创建新的PurchaseLotRepository实例
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
    // 协作方写入（装载数据）
    // ==========================================

    /// 登记品种（品种目录）
    pub fn upsert_variety(&self, variety_id: &str, name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO variety (variety_id, name) VALUES (?1, ?2)
               ON CONFLICT(variety_id) DO UPDATE SET name = excluded.name"#,
            params![variety_id, name],
        )?;
        Ok(())
    }

    /// 新增采购批次
    pub fn insert(&self, lot: &PurchaseLot) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO purchase_lot (
                lot_id, variety_id, vendor_id, total_input_weight_kg, total_cost,
                allocated_weight_kg, depleted, depleted_at, depleted_by, depleted_by_press_run_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                lot.lot_id,
                lot.variety_id,
                lot.vendor_id,
                lot.total_input_weight_kg,
                lot.total_cost,
                lot.allocated_weight_kg,
                lot.depleted,
                lot.depleted_at.as_ref().map(fmt_ts),
                lot.depleted_by,
                lot.depleted_by_press_run_id,
                fmt_ts(&lot.created_at),
                fmt_ts(&lot.updated_at),
            ],
        )?;
        Ok(lot.lot_id.clone())
    }

    /// 软删除采购批次
    pub fn soft_delete(&self, lot_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE purchase_lot SET deleted_at = ?2, updated_at = ?2 WHERE lot_id = ?1 AND deleted_at IS NULL",
            params![lot_id, fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PurchaseLot".to_string(),
                id: lot_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按ID查询（软删除视为不存在）
    pub fn find_by_id(&self, lot_id: &str) -> RepositoryResult<Option<PurchaseLot>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, lot_id)
    }

    /// 事务内按ID查询
    pub fn find_by_id_tx(conn: &Connection, lot_id: &str) -> RepositoryResult<Option<PurchaseLot>> {
        let sql = format!("{} WHERE l.lot_id = ?1 AND l.deleted_at IS NULL", SELECT_LOT);
        let lot = conn
            .query_row(&sql, params![lot_id], map_lot_row)
            .optional()?;
        Ok(lot)
    }

    // ==========================================
    // 分配与耗尽
    // ==========================================

    /// 事务内累加分配重量，返回累加后的值
    pub fn add_allocated_weight_tx(
        conn: &Connection,
        lot_id: &str,
        weight_kg: f64,
    ) -> RepositoryResult<f64> {
        let rows = conn.execute(
            r#"UPDATE purchase_lot
               SET allocated_weight_kg = allocated_weight_kg + ?2, updated_at = ?3
               WHERE lot_id = ?1 AND deleted_at IS NULL"#,
            params![lot_id, weight_kg, fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PurchaseLot".to_string(),
                id: lot_id.to_string(),
            });
        }
        let total: f64 = conn.query_row(
            "SELECT allocated_weight_kg FROM purchase_lot WHERE lot_id = ?1",
            params![lot_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// 事务内标记耗尽
    ///
    /// # 返回
    /// - Ok(true): 本次完成标记
    /// - Ok(false): 已经是耗尽状态（只标记一次）
    pub fn mark_depleted_tx(conn: &Connection, depletion: &LotDepletion) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"UPDATE purchase_lot
               SET depleted = 1, depleted_at = ?2, depleted_by = ?3,
                   depleted_by_press_run_id = ?4, updated_at = ?2
               WHERE lot_id = ?1 AND depleted = 0 AND deleted_at IS NULL"#,
            params![
                depletion.lot_id,
                fmt_ts(&depletion.depleted_at),
                depletion.depleted_by,
                depletion.press_run_id,
            ],
        )?;
        Ok(rows == 1)
    }

    /// 标记耗尽（协作方接口 markDepleted）
    pub fn mark_depleted(&self, depletion: &LotDepletion) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Self::mark_depleted_tx(&conn, depletion)
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn map_lot_row(row: &Row<'_>) -> rusqlite::Result<PurchaseLot> {
    Ok(PurchaseLot {
        lot_id: row.get(0)?,
        variety_id: row.get(1)?,
        variety_name: row.get(2)?,
        vendor_id: row.get(3)?,
        total_input_weight_kg: row.get(4)?,
        total_cost: row.get(5)?,
        allocated_weight_kg: row.get(6)?,
        depleted: row.get(7)?,
        depleted_at: parse_opt_ts(8, row.get(8)?)?,
        depleted_by: row.get(9)?,
        depleted_by_press_run_id: row.get(10)?,
        created_at: parse_ts(11, &row.get::<_, String>(11)?)?,
        updated_at: parse_ts(12, &row.get::<_, String>(12)?)?,
    })
}
