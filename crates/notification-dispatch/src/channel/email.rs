//! 邮件通知渠道
//!
//! 当前为模拟实现，仅记录日志并生成 SendGrid 风格的消息 ID，
//! 生产环境替换为 SMTP 或邮件服务商 API 调用。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Channel, kind_mismatch};
use crate::config::NotificationConfig;
use crate::error::Result;
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};

pub struct EmailChannel {
    config: Arc<NotificationConfig>,
}

impl EmailChannel {
    pub fn new(config: Arc<NotificationConfig>) -> Self {
        debug!(
            from = config.property_or("email.from", "未配置"),
            "邮件渠道已初始化"
        );
        Self { config }
    }
}

#[async_trait]
impl Channel for EmailChannel {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        let NotificationRequest::Email(email) = request else {
            return Err(kind_mismatch(ChannelKind::Email, request));
        };

        let provider = self.config.property_or("email.provider", "sendgrid");
        let from = self.config.property_or("email.from", "未配置");

        // SendGrid v3 返回 202 Accepted，消息 ID 放在 X-Message-Id 头里
        let message_id = format!("SG.{}", Uuid::new_v4().simple());

        info!(
            channel = "EMAIL",
            provider,
            from,
            to = email.to(),
            subject = email.subject(),
            message_id = %message_id,
            "模拟发送邮件通知"
        );

        Ok(NotificationResult::success(message_id))
    }

    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Email
    }
}
