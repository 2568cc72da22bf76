//! 通知分发服务
//!
//! 根据请求类型（或调用方显式指定的渠道）获取渠道并转发发送。
//! 服务本身只做路由：不缓存工厂创建的渠道、不批量、不重试；
//! 重试由 `with_retry` 构造时为每个渠道套上 `RetryChannel` 完成。
//!
//! 调用方可以通过 `register_channel` 用自己的实现替换某个渠道
//! （例如接入真实服务商），未注册的渠道由 `ChannelFactory` 按次创建。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::channel::Channel;
use crate::config::NotificationConfig;
use crate::error::Result;
use crate::factory::ChannelFactory;
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};
use crate::observability::DISPATCHED_TOTAL;
use crate::retry::RetryChannel;

/// 通知分发服务
pub struct NotificationService {
    config: Arc<NotificationConfig>,
    /// 是否为每个渠道包装重试装饰器
    resilient: bool,
    /// 调用方注册的渠道实现，优先于工厂
    registered: HashMap<ChannelKind, Arc<dyn Channel>>,
}

impl NotificationService {
    /// 创建不带重试的分发服务
    pub fn new(config: Arc<NotificationConfig>) -> Self {
        info!("通知分发服务已初始化");
        Self {
            config,
            resilient: false,
            registered: HashMap::new(),
        }
    }

    /// 创建带重试的分发服务
    ///
    /// 每次分发都按配置中的 `retry_attempts` / `base_delay` 包装渠道。
    pub fn with_retry(config: Arc<NotificationConfig>) -> Self {
        info!(
            retry_attempts = config.retry_attempts(),
            base_delay_ms = config.base_delay().as_millis() as u64,
            "通知分发服务已初始化（启用重试）"
        );
        Self {
            config,
            resilient: true,
            registered: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Arc<NotificationConfig> {
        &self.config
    }

    pub fn is_resilient(&self) -> bool {
        self.resilient
    }

    /// 注册渠道实现，覆盖工厂对同类型渠道的默认创建
    ///
    /// 启用重试时，注册的渠道同样会被包装重试装饰器。
    pub fn register_channel(&mut self, channel: Arc<dyn Channel>) {
        let kind = channel.channel_kind();
        info!(channel = %kind, "注册通知渠道");
        self.registered.insert(kind, channel);
    }

    /// 已注册自定义实现的渠道类型
    pub fn registered_channel_kinds(&self) -> Vec<ChannelKind> {
        self.registered.keys().copied().collect()
    }

    /// 发送通知，渠道由请求类型自动决定
    #[instrument(skip(self, request), fields(channel = %request.kind()))]
    pub async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        let kind = request.kind();
        info!("自动解析渠道: {}", kind);
        self.dispatch(kind, request).await
    }

    /// 通过指定渠道发送通知
    ///
    /// 服务不检查请求与渠道是否匹配，由调用方负责；
    /// 不匹配时渠道返回 `RequestKindMismatch`。
    #[instrument(skip(self, request), fields(channel = %kind))]
    pub async fn send_with_kind(
        &self,
        kind: ChannelKind,
        request: &NotificationRequest,
    ) -> Result<NotificationResult> {
        info!("按显式渠道分发: {}", kind);
        self.dispatch(kind, request).await
    }

    /// 发送动态 JSON 载荷
    ///
    /// 载荷解析失败（字段缺失、类型未知）直接返回错误，不会进入任何渠道。
    pub async fn send_payload(&self, payload: &Value) -> Result<NotificationResult> {
        let request = NotificationRequest::from_value(payload)?;
        self.send(&request).await
    }

    fn channel_for(&self, kind: ChannelKind) -> Result<Box<dyn Channel>> {
        let Some(registered) = self.registered.get(&kind) else {
            return if self.resilient {
                ChannelFactory::create_resilient(kind, &self.config)
            } else {
                Ok(ChannelFactory::create(kind, &self.config))
            };
        };

        let channel = Arc::clone(registered);
        if self.resilient {
            Ok(Box::new(RetryChannel::new(
                channel,
                self.config.retry_attempts(),
                self.config.base_delay(),
            )?))
        } else {
            Ok(Box::new(channel))
        }
    }

    async fn dispatch(
        &self,
        kind: ChannelKind,
        request: &NotificationRequest,
    ) -> Result<NotificationResult> {
        let channel = self.channel_for(kind)?;
        let result = channel.send(request).await?;
        log_result(kind, &result);
        Ok(result)
    }
}

fn log_result(kind: ChannelKind, result: &NotificationResult) {
    metrics::counter!(
        DISPATCHED_TOTAL,
        "channel" => kind.as_str(),
        "outcome" => result.outcome()
    )
    .increment(1);

    match result {
        NotificationResult::Success {
            message_id,
            timestamp,
        } => {
            info!(
                channel = %kind,
                message_id = %message_id,
                sent_at = %timestamp,
                "通知投递成功"
            );
        }
        NotificationResult::Failure { code, reason } => {
            warn!(
                channel = %kind,
                code = %code,
                reason = %reason,
                "通知投递失败"
            );
        }
    }
}
