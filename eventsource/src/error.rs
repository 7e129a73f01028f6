//! 统一错误定义
//!
//! 按调用方需要区分的类别组织：校验、未找到、序列化、配置、存储与生命周期。
//! 仓储只会在内部吞掉“快照未找到”，其余错误原样向上传播。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 校验 ---
    #[error("validation error: {reason}")]
    Validation { reason: String },

    // --- 未找到 ---
    #[error("aggregate not found: {aggregate_id}")]
    AggregateNotFound { aggregate_id: String },
    #[error("snapshot not found: {aggregate_id}")]
    SnapshotNotFound { aggregate_id: String },

    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("unregistered type: {type_name}")]
    UnregisteredType { type_name: String },

    // --- 配置 ---
    #[error("duplicate binding: {type_name} is already bound to a different type")]
    DuplicateBinding { type_name: String },

    // --- 存储 ---
    #[error("event store error: {reason}")]
    EventStore { reason: String },
    #[error("snapshot store error: {reason}")]
    SnapshotStore { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("version conflict: aggregate={aggregate_id}, expected={expected:?}, actual={actual:?}")]
    VersionConflict {
        aggregate_id: String,
        expected: Option<usize>,
        actual: Option<usize>,
    },

    // --- 生命周期 ---
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("out of order event: aggregate={aggregate_id}, expected={expected}, found={found}")]
    OutOfOrder {
        aggregate_id: String,
        expected: usize,
        found: usize,
    },
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Serialization,
    Configuration,
    Store,
    Lifecycle,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::AggregateNotFound { .. } | Self::SnapshotNotFound { .. } => ErrorKind::NotFound,
            Self::Serde { .. } | Self::UnregisteredType { .. } => ErrorKind::Serialization,
            Self::DuplicateBinding { .. } => ErrorKind::Configuration,
            Self::EventStore { .. }
            | Self::SnapshotStore { .. }
            | Self::Database { .. }
            | Self::VersionConflict { .. } => ErrorKind::Store,
            Self::InvalidState { .. } | Self::OutOfOrder { .. } => ErrorKind::Lifecycle,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 DomainError
#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::EventStore {
                reason: "row not found".to_string(),
            },
            other => DomainError::Database {
                reason: other.to_string(),
            },
        }
    }
}
