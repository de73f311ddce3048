// ==========================================
// 果酒压榨台账 - 写事务工具
// ==========================================
// 所有写操作统一走 BEGIN IMMEDIATE:
// - 在第一次读之前就拿到 SQLite 写锁，决定结果的读（最大序号、活动酒批、
//   候选名称、批次耗尽）与随后的写串行化，跨连接/跨进程同样成立
// - 闭包返回 Err 时事务随 drop 回滚，不会留下部分写入
// ==========================================

use crate::repository::error::RepositoryError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// 在 IMMEDIATE 事务中执行闭包，成功则提交
///
/// # 参数
/// - `conn`: 共享连接
/// - `f`: 事务体（只能使用 `*_tx` 系列仓储函数，禁止再次锁 `conn`）
///
/// # 返回
/// - Ok(T): 事务已提交
/// - Err(E): 事务已回滚
pub fn with_immediate_transaction<T, E, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction) -> Result<T, E>,
    E: From<RepositoryError>,
{
    let mut guard = conn
        .lock()
        .map_err(|e| E::from(RepositoryError::LockError(e.to_string())))?;

    let tx = guard
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| E::from(RepositoryError::DatabaseTransactionError(e.to_string())))?;

    let value = f(&tx)?;

    tx.commit()
        .map_err(|e| E::from(RepositoryError::DatabaseTransactionError(e.to_string())))?;
    Ok(value)
}
