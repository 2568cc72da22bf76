//! 短信通知渠道
//!
//! 模拟 Twilio 短信网关，生成 `SM` 开头的消息 SID。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Channel, kind_mismatch};
use crate::config::NotificationConfig;
use crate::error::Result;
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};

pub struct SmsChannel {
    config: Arc<NotificationConfig>,
}

impl SmsChannel {
    pub fn new(config: Arc<NotificationConfig>) -> Self {
        debug!(
            provider = config.property_or("sms.provider", "未配置"),
            "短信渠道已初始化"
        );
        Self { config }
    }
}

#[async_trait]
impl Channel for SmsChannel {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        let NotificationRequest::Sms(sms) = request else {
            return Err(kind_mismatch(ChannelKind::Sms, request));
        };

        let provider = self.config.property_or("sms.provider", "twilio");
        let account_sid = self.config.property_or("sms.account.sid", "AC_demo");
        let sender = self.config.property_or("sms.from", "+15551234567");

        let sid = format!("SM{}", Uuid::new_v4().simple());

        info!(
            channel = "SMS",
            provider,
            account_sid,
            from = sender,
            to = sms.phone_number(),
            message_id = %sid,
            status = "queued",
            "模拟发送短信通知"
        );

        Ok(NotificationResult::success(sid))
    }

    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }
}
