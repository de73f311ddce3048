// ==========================================
// 果酒压榨台账 - 容器数据仓储
// ==========================================
// 容器登记属于外部协作方；本仓储提供 getVessel / setStatus
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::types::VesselStatus;
use crate::domain::vessel::Vessel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_ts, now_ts, parse_enum, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// VesselRepository - 容器仓储
// ==========================================
pub struct VesselRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VesselRepository {
    /// 创建新的VesselRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增容器
    pub fn insert(&self, vessel: &Vessel) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO vessel (vessel_id, code, capacity_l, status, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                vessel.vessel_id,
                vessel.code,
                vessel.capacity_l,
                vessel.status.to_db_str(),
                fmt_ts(&vessel.created_at),
                fmt_ts(&vessel.updated_at),
            ],
        )?;
        Ok(vessel.vessel_id.clone())
    }

    /// 软删除容器
    pub fn soft_delete(&self, vessel_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE vessel SET deleted_at = ?2, updated_at = ?2 WHERE vessel_id = ?1 AND deleted_at IS NULL",
            params![vessel_id, fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Vessel".to_string(),
                id: vessel_id.to_string(),
            });
        }
        Ok(())
    }

    /// 按ID查询（软删除视为不存在）
    pub fn find_by_id(&self, vessel_id: &str) -> RepositoryResult<Option<Vessel>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, vessel_id)
    }

    /// 事务内按ID查询
    pub fn find_by_id_tx(conn: &Connection, vessel_id: &str) -> RepositoryResult<Option<Vessel>> {
        let vessel = conn
            .query_row(
                r#"SELECT vessel_id, code, capacity_l, status, created_at, updated_at
                   FROM vessel
                   WHERE vessel_id = ?1 AND deleted_at IS NULL"#,
                params![vessel_id],
                map_vessel_row,
            )
            .optional()?;
        Ok(vessel)
    }

    /// 更新容器状态
    pub fn set_status(&self, vessel_id: &str, status: VesselStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::set_status_tx(&conn, vessel_id, status)
    }

    /// 事务内更新容器状态
    pub fn set_status_tx(
        conn: &Connection,
        vessel_id: &str,
        status: VesselStatus,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE vessel SET status = ?2, updated_at = ?3 WHERE vessel_id = ?1 AND deleted_at IS NULL",
            params![vessel_id, status.to_db_str(), fmt_ts(&now_ts())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Vessel".to_string(),
                id: vessel_id.to_string(),
            });
        }
        Ok(())
    }
}

fn map_vessel_row(row: &Row<'_>) -> rusqlite::Result<Vessel> {
    Ok(Vessel {
        vessel_id: row.get(0)?,
        code: row.get(1)?,
        capacity_l: row.get(2)?,
        status: parse_enum(3, &row.get::<_, String>(3)?, VesselStatus::from_db_str)?,
        created_at: parse_ts(4, &row.get::<_, String>(4)?)?,
        updated_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_find_set_status() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = VesselRepository::new(Arc::new(Mutex::new(conn)));

        let now = now_ts();
        repo.insert(&Vessel {
            vessel_id: "V1".to_string(),
            code: "T01".to_string(),
            capacity_l: 1000.0,
            status: VesselStatus::Reserved,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        repo.set_status("V1", VesselStatus::InUse).unwrap();
        let v = repo.find_by_id("V1").unwrap().unwrap();
        assert_eq!(v.status, VesselStatus::InUse);
        assert_eq!(v.code, "T01");

        repo.soft_delete("V1").unwrap();
        assert!(repo.find_by_id("V1").unwrap().is_none());
        assert!(repo.set_status("V1", VesselStatus::Available).is_err());
    }
}
