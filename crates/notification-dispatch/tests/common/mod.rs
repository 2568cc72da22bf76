//! 集成测试共享的脚本化渠道

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use notification_dispatch::{
    Channel, ChannelKind, NotificationRequest, NotificationResult, Result,
};

/// 按脚本依次返回结果的渠道
///
/// 脚本耗尽后重复返回 `fallback`。每次调用前先等待 `latency`。
pub struct ScriptedChannel {
    kind: ChannelKind,
    script: Mutex<VecDeque<NotificationResult>>,
    fallback: NotificationResult,
    latency: Duration,
    calls: AtomicU32,
}

impl ScriptedChannel {
    pub fn new(kind: ChannelKind, fallback: NotificationResult) -> Self {
        Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_failing(kind: ChannelKind) -> Self {
        Self::new(kind, NotificationResult::failure("SEND_ERROR", "服务商不可用"))
    }

    pub fn then(self, result: NotificationResult) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send(&self, _request: &NotificationRequest) -> Result<NotificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn channel_kind(&self) -> ChannelKind {
        self.kind
    }
}
