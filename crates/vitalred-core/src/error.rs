//! 错误定义模块

use thiserror::Error;

/// VITAL RED 统一错误类型
#[derive(Error, Debug)]
pub enum VitalRedError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("后端返回错误: {0}")]
    Backend(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl VitalRedError {
    /// 构造验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 构造存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// VITAL RED 统一结果类型
pub type Result<T> = std::result::Result<T, VitalRedError>;
