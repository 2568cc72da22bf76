//! 多渠道通知分发
//!
//! 按请求类型把通知路由到邮件、短信或 APP 推送渠道，
//! 可选地为渠道包装指数退避重试，并提供基于 Tokio 任务的非阻塞发送接口。
//! 投递失败作为 `NotificationResult::Failure` 返回，`Err` 只表示误用或取消。

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod model;
pub mod observability;
pub mod retry;
pub mod service;

pub use channel::{Channel, EmailChannel, PushChannel, SmsChannel};
pub use config::{NotificationConfig, NotificationConfigBuilder};
pub use dispatch::{AsyncNotificationService, DispatchHandle};
pub use error::{DispatchError, Result};
pub use factory::ChannelFactory;
pub use model::{
    ChannelKind, EmailRequest, NotificationRequest, NotificationResult, PushRequest, SmsRequest,
};
pub use retry::RetryChannel;
pub use service::NotificationService;
