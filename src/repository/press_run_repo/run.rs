use crate::domain::press_run::{PressRun, PressRunCompletion};
use crate::domain::types::PressRunStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_ts, now_ts, parse_date, parse_enum, parse_opt_ts, parse_ts,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_PRESS_RUN: &str = r#"
    SELECT
        press_run_id, name, press_date, status,
        total_input_weight_kg, total_juice_volume_l, extraction_rate,
        notes, created_by, completed_at, completed_by,
        created_at, updated_at
    FROM press_run
"#;

// ==========================================
// PressRunRepository - 压榨批次仓储
// ==========================================
pub struct PressRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PressRunRepository {
    /// 创建新的PressRunRepository实例
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
    // 写入
    // ==========================================

    /// 事务内新建压榨批次
    pub fn insert_tx(conn: &Connection, run: &PressRun) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO press_run (
                press_run_id, name, press_date, status,
                total_input_weight_kg, total_juice_volume_l, extraction_rate,
                notes, created_by, completed_at, completed_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            params![
                run.press_run_id,
                run.name,
                fmt_date(&run.press_date),
                run.status.to_db_str(),
                run.total_input_weight_kg,
                run.total_juice_volume_l,
                run.extraction_rate,
                run.notes,
                run.created_by,
                run.completed_at.as_ref().map(fmt_ts),
                run.completed_by,
                fmt_ts(&run.created_at),
                fmt_ts(&run.updated_at),
            ],
        )?;
        Ok(run.press_run_id.clone())
    }

    /// 新建压榨批次
    pub fn insert(&self, run: &PressRun) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, run)
    }

    /// 事务内写回上料重量合计
    pub fn update_total_weight_tx(
        conn: &Connection,
        press_run_id: &str,
        total_input_weight_kg: f64,
    ) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE press_run SET total_input_weight_kg = ?2, updated_at = ?3 WHERE press_run_id = ?1",
            params![press_run_id, total_input_weight_kg, fmt_ts(&now_ts())],
        )?;
        Ok(())
    }

    /// 事务内更新状态（带来源状态检查）
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: 记录不存在或状态已被其他事务改变
    pub fn update_status_tx(
        conn: &Connection,
        press_run_id: &str,
        from: PressRunStatus,
        to: PressRunStatus,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE press_run SET status = ?3, updated_at = ?4
               WHERE press_run_id = ?1 AND status = ?2 AND deleted_at IS NULL"#,
            params![press_run_id, from.to_db_str(), to.to_db_str(), fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PressRun".to_string(),
                id: press_run_id.to_string(),
            });
        }
        Ok(())
    }

    /// 事务内写回完成信息（名称、合计、出汁率）
    pub fn complete_tx(conn: &Connection, completion: &PressRunCompletion) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE press_run
               SET status = ?2, name = ?3, total_input_weight_kg = ?4,
                   total_juice_volume_l = ?5, extraction_rate = ?6,
                   completed_at = ?7, completed_by = ?8, updated_at = ?7
               WHERE press_run_id = ?1 AND status = ?9 AND deleted_at IS NULL"#,
            params![
                completion.press_run_id,
                PressRunStatus::Completed.to_db_str(),
                completion.name,
                completion.total_input_weight_kg,
                completion.total_juice_volume_l,
                completion.extraction_rate,
                fmt_ts(&completion.completed_at),
                completion.completed_by,
                PressRunStatus::InProgress.to_db_str(),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PressRun".to_string(),
                id: completion.press_run_id.clone(),
            });
        }
        Ok(())
    }

    /// 事务内物理删除压榨批次
    ///
    /// 说明：合并历史与酒批中的来源引用先置空（外键同样声明了 ON DELETE SET NULL），
    /// 上料记录随之删除。
    ///
    /// # 返回
    /// - Ok(n): 被解绑的合并历史行数
    pub fn hard_delete_tx(conn: &Connection, press_run_id: &str) -> RepositoryResult<usize> {
        let detached = conn.execute(
            "UPDATE merge_history SET source_press_run_id = NULL WHERE source_press_run_id = ?1",
            params![press_run_id],
        )?;
        conn.execute(
            "UPDATE batch SET origin_press_run_id = NULL WHERE origin_press_run_id = ?1",
            params![press_run_id],
        )?;
        conn.execute(
            "DELETE FROM press_load WHERE press_run_id = ?1",
            params![press_run_id],
        )?;
        let rows = conn.execute(
            "DELETE FROM press_run WHERE press_run_id = ?1",
            params![press_run_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PressRun".to_string(),
                id: press_run_id.to_string(),
            });
        }
        Ok(detached)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按ID查询（软删除视为不存在）
    pub fn find_by_id(&self, press_run_id: &str) -> RepositoryResult<Option<PressRun>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, press_run_id)
    }

    /// 事务内按ID查询
    pub fn find_by_id_tx(
        conn: &Connection,
        press_run_id: &str,
    ) -> RepositoryResult<Option<PressRun>> {
        let sql = format!(
            "{} WHERE press_run_id = ?1 AND deleted_at IS NULL",
            SELECT_PRESS_RUN
        );
        let run = conn
            .query_row(&sql, params![press_run_id], map_press_run_row)
            .optional()?;
        Ok(run)
    }

    /// 事务内查询以指定前缀开头的压榨名称（命名序列器候选读取）
    ///
    /// 说明：包含软删除记录，避免名称复用
    pub fn names_with_prefix_tx(conn: &Connection, prefix: &str) -> RepositoryResult<Vec<String>> {
        let pattern = format!("{}%", escape_like(prefix));
        let mut stmt = conn.prepare(
            r#"SELECT name FROM press_run
               WHERE name LIKE ?1 ESCAPE '\'
               ORDER BY name"#,
        )?;
        let names = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

/// 转义 LIKE 通配符
pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn map_press_run_row(row: &Row<'_>) -> rusqlite::Result<PressRun> {
    Ok(PressRun {
        press_run_id: row.get(0)?,
        name: row.get(1)?,
        press_date: parse_date(2, &row.get::<_, String>(2)?)?,
        status: parse_enum(3, &row.get::<_, String>(3)?, PressRunStatus::from_db_str)?,
        total_input_weight_kg: row.get(4)?,
        total_juice_volume_l: row.get(5)?,
        extraction_rate: row.get(6)?,
        notes: row.get(7)?,
        created_by: row.get(8)?,
        completed_at: parse_opt_ts(9, row.get(9)?)?,
        completed_by: row.get(10)?,
        created_at: parse_ts(11, &row.get::<_, String>(11)?)?,
        updated_at: parse_ts(12, &row.get::<_, String>(12)?)?,
    })
}
