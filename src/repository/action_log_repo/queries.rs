use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::row_utils::parse_ts;
use rusqlite::{params, Result as SqliteResult, Row};

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询指定实体的操作日志（按时间先后）
    pub fn list_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, entity_type, entity_id, action_type, action_ts, actor,
                   payload_json, detail
            FROM action_log
            WHERE entity_type = ? AND entity_id = ?
            ORDER BY action_ts, rowid
            "#,
        )?;

        let logs = stmt
            .query_map(params![entity_type, entity_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询最近的 N 条日志
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, entity_type, entity_id, action_type, action_ts, actor,
                   payload_json, detail
            FROM action_log
            ORDER BY action_ts DESC, rowid DESC
            LIMIT ?
            "#,
        )?;

        let logs = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 映射数据库行到 ActionLog（payload_json 解析失败时置空）
    fn map_row(&self, row: &Row) -> SqliteResult<ActionLog> {
        let payload: Option<String> = row.get(6)?;
        Ok(ActionLog {
            action_id: row.get(0)?,
            entity_type: row.get(1)?,
            entity_id: row.get(2)?,
            action_type: row.get(3)?,
            action_ts: parse_ts(4, &row.get::<_, String>(4)?)?,
            actor: row.get(5)?,
            payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }
}
