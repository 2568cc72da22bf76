//! 渠道工厂
//!
//! 根据 `ChannelKind` 创建对应的渠道实例。映射对封闭枚举穷尽匹配，
//! 不允许兜底分支：新增渠道类型会在这里编译失败，直到补上构造逻辑。

use std::sync::Arc;

use crate::channel::{Channel, EmailChannel, PushChannel, SmsChannel};
use crate::config::NotificationConfig;
use crate::error::Result;
use crate::model::ChannelKind;
use crate::retry::RetryChannel;

/// 渠道工厂
///
/// 每次调用都新建实例，不做池化或缓存。模拟渠道创建成本可以忽略，
/// 接入真实网络客户端时应在此处复用客户端。
pub struct ChannelFactory;

impl ChannelFactory {
    /// 创建指定类型的渠道
    pub fn create(kind: ChannelKind, config: &Arc<NotificationConfig>) -> Box<dyn Channel> {
        match kind {
            ChannelKind::Email => Box::new(EmailChannel::new(Arc::clone(config))),
            ChannelKind::Sms => Box::new(SmsChannel::new(Arc::clone(config))),
            ChannelKind::Push => Box::new(PushChannel::new(Arc::clone(config))),
        }
    }

    /// 创建带重试的渠道
    ///
    /// 重试次数和退避基准时间取自配置。
    pub fn create_resilient(
        kind: ChannelKind,
        config: &Arc<NotificationConfig>,
    ) -> Result<Box<dyn Channel>> {
        let channel = RetryChannel::new(
            Self::create(kind, config),
            config.retry_attempts(),
            config.base_delay(),
        )?;
        Ok(Box::new(channel))
    }
}
