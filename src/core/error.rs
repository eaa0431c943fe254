//! 统一错误处理 for plan_advisor
//!
//! ## 设计理念
//!
//! 1. **跳过条件不是错误**：缺少字面量位置信息、非 ANALYZE 执行、非计划语句
//!    都通过 `Option` / 早返回表达，不会进入这里的错误类型
//! 2. **存储错误**：仓库读写失败，由编排器记录日志后继续后续步骤
//! 3. **不变量违反**：仓库表缺失、计划引用了不存在的范围表项，
//!    中止本次反馈处理，但不影响外层执行流程
//!
//! `AdvisorResult<T>` 提供统一的返回类型

use thiserror::Error;

/// 统一的顾问错误类型
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("计划错误: {0}")]
    Plan(#[from] PlanError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(String),
}

/// 统一的结果类型
pub type AdvisorResult<T> = Result<T, AdvisorError>;

/// 仓库存储层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    DbError(String),
    #[error("序列化错误: {0}")]
    SerializationError(String),
    #[error("仓库表不存在: {0}")]
    SchemaMissing(String),
}

impl StorageError {
    /// 是否属于不变量违反（需要中止本次反馈处理）
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, StorageError::SchemaMissing(_))
    }
}

/// 计划树相关错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("无效的范围表索引: {index}（范围表长度 {len}）")]
    InvalidRangeIndex { index: usize, len: usize },
}

impl From<serde_json::Error> for AdvisorError {
    fn from(e: serde_json::Error) -> Self {
        AdvisorError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for AdvisorError {
    fn from(e: toml::de::Error) -> Self {
        AdvisorError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for AdvisorError {
    fn from(e: toml::ser::Error) -> Self {
        AdvisorError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}
