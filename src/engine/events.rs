// ==========================================
// 果酒压榨台账 - 审计事件发布
// ==========================================
// 职责: 定义审计事件发布 trait，实现依赖倒置
// 说明: Engine/API 层只依赖 trait，App 层提供落库适配器
// 约定: 发布为 fire-and-forget，失败只记录日志，不影响业务结果
// ==========================================

use crate::domain::action_log::ActionType;
use crate::domain::types::EntityType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 审计事件
// ==========================================

/// 审计事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub action: ActionType,
    pub payload: JsonValue,
    pub actor: String,
    pub note: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: ActionType,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        payload: JsonValue,
        actor: impl Into<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            action,
            payload,
            actor: actor.into(),
            note,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 审计事件发布者 Trait
///
/// # 实现说明
/// - App 层的 `ActionLogAuditPublisher` 将事件写入 action_log
/// - 测试可使用 `NoOpAuditPublisher` 或自定义收集器
pub trait AuditEventPublisher: Send + Sync {
    /// 发布审计事件
    fn publish(&self, event: AuditEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpAuditPublisher;

impl AuditEventPublisher for NoOpAuditPublisher {
    fn publish(&self, event: AuditEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpAuditPublisher: 跳过审计事件 - {} {} {}",
            event.action.as_str(),
            event.entity_type,
            event.entity_id
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn AuditEventPublisher>> 的使用；发布失败只告警
#[derive(Clone)]
pub struct OptionalAuditPublisher {
    inner: Option<Arc<dyn AuditEventPublisher>>,
}

impl OptionalAuditPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn AuditEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    /// 发布事件（如果有发布者），失败记录 warn 后吞掉
    pub fn publish(&self, event: AuditEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalAuditPublisher: 未配置发布者，跳过事件 - {} {}",
                event.entity_type,
                event.entity_id
            );
            return;
        };
        let entity_type = event.entity_type;
        let entity_id = event.entity_id.clone();
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(
                entity_type = %entity_type,
                entity_id = %entity_id,
                error = %e,
                "审计事件发布失败"
            );
        }
    }

    pub fn publish_create(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        payload: JsonValue,
        actor: &str,
        note: Option<String>,
    ) {
        self.publish(AuditEvent::new(
            ActionType::Create,
            entity_type,
            entity_id,
            payload,
            actor,
            note,
        ));
    }

    pub fn publish_update(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        payload: JsonValue,
        actor: &str,
        note: Option<String>,
    ) {
        self.publish(AuditEvent::new(
            ActionType::Update,
            entity_type,
            entity_id,
            payload,
            actor,
            note,
        ));
    }

    pub fn publish_delete(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        payload: JsonValue,
        actor: &str,
        note: Option<String>,
    ) {
        self.publish(AuditEvent::new(
            ActionType::Delete,
            entity_type,
            entity_id,
            payload,
            actor,
            note,
        ));
    }
}

impl Default for OptionalAuditPublisher {
    fn default() -> Self {
        Self::none()
    }
}
