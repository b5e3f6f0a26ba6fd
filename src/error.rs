//! 错误类型
//!
//! 配置错误在仿真开始前返回；丢包属于正常行为，不走错误通道。

use thiserror::Error;

/// 仿真库统一错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 构造阶段检测到的非法参数（阈值、带宽、时延、路由等）
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// 以负时延调度事件（即调度到 `now` 之前）
    #[error("invalid delay: {delay_s}s, events cannot be scheduled in the past")]
    InvalidDelay { delay_s: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfiguration(msg.into())
}
