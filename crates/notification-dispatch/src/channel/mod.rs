//! 通知渠道
//!
//! 定义渠道 trait 并提供三种模拟实现。
//!
//! ## 支持的渠道
//!
//! - **Email**: 邮件（模拟 SendGrid）
//! - **SMS**: 短信（模拟 Twilio）
//! - **Push**: APP 推送（模拟 FCM）

mod email;
mod push;
mod sms;

pub use email::EmailChannel;
pub use push::PushChannel;
pub use sms::SmsChannel;

use async_trait::async_trait;

use crate::error::{DispatchError, Result};
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};

/// 通知渠道 trait
///
/// 发送失败应返回 `NotificationResult::Failure` 而非 `Err`；
/// `Err` 只用于调用方误用（如请求类型与渠道不符）和取消。
/// 渠道实现应当是无状态的，便于并发调用。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Channel: Send + Sync {
    /// 发送通知
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult>;

    /// 渠道类型标识
    fn channel_kind(&self) -> ChannelKind;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Box<C> {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        (**self).send(request).await
    }

    fn channel_kind(&self) -> ChannelKind {
        (**self).channel_kind()
    }
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for std::sync::Arc<C> {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        (**self).send(request).await
    }

    fn channel_kind(&self) -> ChannelKind {
        (**self).channel_kind()
    }
}

/// 请求类型与渠道不符时的统一错误
pub(crate) fn kind_mismatch(expected: ChannelKind, request: &NotificationRequest) -> DispatchError {
    DispatchError::RequestKindMismatch {
        expected,
        actual: request.kind(),
    }
}
