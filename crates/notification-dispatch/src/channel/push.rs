//! APP 推送通知渠道
//!
//! 模拟 Firebase Cloud Messaging v1 API，消息名格式为
//! `projects/{project}/messages/{id}`。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Channel, kind_mismatch};
use crate::config::NotificationConfig;
use crate::error::Result;
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};

/// FCM 消息 ID 截取长度
const FCM_ID_LEN: usize = 19;

pub struct PushChannel {
    config: Arc<NotificationConfig>,
}

impl PushChannel {
    pub fn new(config: Arc<NotificationConfig>) -> Self {
        debug!("推送渠道已初始化");
        Self { config }
    }
}

#[async_trait]
impl Channel for PushChannel {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        let NotificationRequest::Push(push) = request else {
            return Err(kind_mismatch(ChannelKind::Push, request));
        };

        let provider = self.config.property_or("push.provider", "fcm");
        let project_id = self.config.property_or("push.project.id", "notify-demo");

        let fcm_id: String = Uuid::new_v4().to_string().chars().take(FCM_ID_LEN).collect();
        let message_name = format!("projects/{}/messages/{}", project_id, fcm_id);

        info!(
            channel = "PUSH",
            provider,
            device_token = push.device_token(),
            title = push.title(),
            message_id = %message_name,
            "模拟发送 APP 推送通知"
        );

        Ok(NotificationResult::success(message_name))
    }

    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Push
    }
}
