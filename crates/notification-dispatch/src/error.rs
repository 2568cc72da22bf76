//! 通知分发错误类型
//!
//! 只覆盖调用方误用（参数缺失、请求类型不支持、渠道与请求不匹配）和
//! 生命周期类错误（取消、服务已关闭）。渠道投递失败属于业务数据，
//! 通过 `NotificationResult::Failure` 返回，不会出现在这里。

use thiserror::Error;

use crate::model::ChannelKind;

#[derive(Debug, Error)]
pub enum DispatchError {
    // ==================== 参数错误 ====================
    #[error("参数缺失: {field}")]
    NullArgument { field: String },

    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 路由错误 ====================
    #[error("不支持的通知请求类型: {type_name}")]
    UnsupportedRequestType { type_name: String },

    #[error("渠道与请求类型不匹配: 渠道={expected}, 请求={actual}")]
    RequestKindMismatch {
        expected: ChannelKind,
        actual: ChannelKind,
    },

    // ==================== 生命周期错误 ====================
    #[error("通知发送已取消")]
    Cancelled,

    #[error("等待通知发送结果超时: {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("异步通知服务已关闭")]
    ServiceShutDown,

    #[error("当前线程没有可用的 Tokio 运行时")]
    RuntimeUnavailable,

    #[error("发送任务异常退出: {0}")]
    TaskFailed(String),

    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    pub(crate) fn null_argument(field: impl Into<String>) -> Self {
        Self::NullArgument {
            field: field.into(),
        }
    }

    pub(crate) fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::NullArgument { .. } => "NULL_ARGUMENT",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::UnsupportedRequestType { .. } => "UNSUPPORTED_REQUEST_TYPE",
            Self::RequestKindMismatch { .. } => "REQUEST_KIND_MISMATCH",
            Self::Cancelled => "CANCELLED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::ServiceShutDown => "SERVICE_SHUT_DOWN",
            Self::RuntimeUnavailable => "RUNTIME_UNAVAILABLE",
            Self::TaskFailed(_) => "TASK_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 是否为调用方误用导致的错误
    ///
    /// 误用类错误说明调用代码本身有缺陷，重试没有意义。
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::NullArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::UnsupportedRequestType { .. }
                | Self::RequestKindMismatch { .. }
        )
    }
}
