//! 错误类型
//!
//! 按照抓取流程划分：导航、抽取、持久化、断点、配置。
//! 字段归一化不会产生错误（解析失败一律返回 None 或默认值）。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(String),
    /// 分页导航错误
    #[error("导航错误: {0}")]
    Navigation(#[from] NavigationError),
    /// 列表抽取错误
    #[error("抽取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 持久化错误
    #[error("持久化错误: {0}")]
    Persist(#[from] PersistError),
    /// 断点存储错误
    #[error("断点错误: {0}")]
    Checkpoint(#[from] CheckpointError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 分页导航错误（瞬时错误，由分页控制器降级处理）
#[derive(Debug, Error)]
pub enum NavigationError {
    /// 页面脚本执行失败
    #[error("执行脚本失败: {0}")]
    Script(String),
    /// 等待元素/内容超时
    #[error("等待 {what} 超时 ({timeout_ms} ms)")]
    Timeout { what: String, timeout_ms: u64 },
    /// 页面处于无法继续的状态
    #[error("页面卡死: {0}")]
    Stuck(String),
}

/// 列表抽取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 页面脚本执行失败
    #[error("执行抽取脚本失败: {0}")]
    Script(String),
    /// 抽取结果无法反序列化
    #[error("抽取结果格式错误: {0}")]
    Malformed(#[from] serde_json::Error),
    /// 抽取超时
    #[error("抽取超时 ({0} ms)")]
    Timeout(u64),
}

/// 持久化错误
///
/// 约束错误（缺少必填字段等）与瞬时错误（连接、锁）必须可区分。
#[derive(Debug, Error)]
pub enum PersistError {
    /// 约束冲突，重试无意义
    #[error("约束冲突: {0}")]
    Constraint(String),
    /// 瞬时错误，下次运行时可能成功
    #[error("瞬时错误: {0}")]
    Transient(String),
}

impl PersistError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, PersistError::Constraint(_))
    }
}

impl From<rusqlite::Error> for PersistError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PersistError::Constraint(err.to_string())
            }
            _ => PersistError::Transient(err.to_string()),
        }
    }
}

/// 断点存储错误
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("读写断点文件失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("断点内容格式错误 ({path}): {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无效: {reason}")]
    File { path: String, reason: String },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid { field: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Persist(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(format!("IO错误: {}", err))
    }
}

impl From<chromiumoxide::error::CdpError> for NavigationError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        NavigationError::Script(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for ExtractionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ExtractionError::Script(err.to_string())
    }
}
