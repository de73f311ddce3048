// ==========================================
// 果酒压榨台账 - API层错误类型
// ==========================================
// 职责: 定义调用方可见的错误分类，转换Repository/Engine错误
// 分类: NotFound / Conflict / InvalidState / InvalidInput / Internal
// ==========================================

use crate::engine::allocation::AllocationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("冲突: {0}")]
    Conflict(String),

    #[error("状态不允许: {0}")]
    InvalidState(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 归入调用方分类（Internal 包含全部数据访问错误）
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::InvalidInput(_) => ApiErrorKind::InvalidInput,
            ApiError::NotFound(_) => ApiErrorKind::NotFound,
            ApiError::Conflict(_) => ApiErrorKind::Conflict,
            ApiError::InvalidState(_) => ApiErrorKind::InvalidState,
            _ => ApiErrorKind::Internal,
        }
    }
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotFound,
    Conflict,
    InvalidState,
    InvalidInput,
    Internal,
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
// 名称后缀耗尽与落库阶段的存储失败都属于内部错误
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            AllocationError::InvalidState(msg) => ApiError::InvalidState(msg),
            AllocationError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            AllocationError::Conflict(msg) => ApiError::Conflict(msg),
            AllocationError::NameSuffixExhausted(base) => {
                ApiError::InternalError(format!("酒批名称后缀已耗尽: {}", base))
            }
            AllocationError::Storage(e) => match ApiError::from(e) {
                ApiError::NotFound(msg) | ApiError::Conflict(msg) => ApiError::InternalError(msg),
                other => other,
            },
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
