// ==========================================
// 果酒压榨台账 - 审计事件落库适配器
// ==========================================
// 职责: 实现 AuditEventPublisher，把审计事件写入 action_log
// 说明: 事件在业务事务提交之后发布，写入失败由 OptionalAuditPublisher 告警吞掉
// ==========================================

use std::error::Error;
use std::sync::Arc;

use crate::domain::action_log::ActionLog;
use crate::engine::events::{AuditEvent, AuditEventPublisher};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::row_utils::now_ts;

/// action_log 审计发布者
pub struct ActionLogAuditPublisher {
    action_log_repo: Arc<ActionLogRepository>,
}

impl ActionLogAuditPublisher {
    pub fn new(action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self { action_log_repo }
    }
}

impl AuditEventPublisher for ActionLogAuditPublisher {
    fn publish(&self, event: AuditEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let log = ActionLog {
            action_id: uuid::Uuid::new_v4().to_string(),
            entity_type: event.entity_type.as_str().to_string(),
            entity_id: event.entity_id,
            action_type: event.action.as_str().to_string(),
            action_ts: now_ts(),
            actor: event.actor,
            payload_json: Some(event.payload),
            detail: event.note,
        };
        self.action_log_repo.insert(&log)?;
        tracing::debug!(action_id = %log.action_id, entity = %log.entity_type, "审计事件已落库");
        Ok(())
    }
}
