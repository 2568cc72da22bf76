//! 重试装饰器
//!
//! 为任意渠道增加指数退避重试，对被包装渠道本身不做任何修改。
//! 只有 `NotificationResult::Failure` 会触发重试；`Err`（误用、取消）
//! 直接向上传播。
//!
//! 第 i 次重试（i 从 0 开始）前等待 `base_delay * 2^i`，首次重试恰好等待
//! `base_delay`。全部尝试失败时返回最后一次的 `Failure`，此前的失败只出现在日志中。

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::channel::Channel;
use crate::error::{DispatchError, Result};
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};
use crate::observability::RETRIES_TOTAL;

/// 带指数退避重试的渠道装饰器
///
/// 自身也实现 `Channel`，`channel_kind` 与被包装渠道一致，可以任意嵌套。
pub struct RetryChannel<C> {
    delegate: C,
    /// 首次发送之外的最大重试次数
    max_retries: u32,
    base_delay: Duration,
}

impl<C: Channel> RetryChannel<C> {
    /// 包装渠道
    ///
    /// `max_retries` 为 0 时只发送一次且从不等待；`base_delay` 不得小于 1 ms。
    pub fn new(delegate: C, max_retries: u32, base_delay: Duration) -> Result<Self> {
        if base_delay < Duration::from_millis(1) {
            return Err(DispatchError::invalid_argument(
                "base_delay",
                "退避基准时间必须 >= 1 ms",
            ));
        }
        Ok(Self {
            delegate,
            max_retries,
            base_delay,
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    /// 计算第 N 次重试前的等待时间（retry_index 从 0 开始）
    ///
    /// 公式: base_delay * 2^retry_index，溢出时取 `Duration::MAX`。
    pub fn delay_for_retry(&self, retry_index: u32) -> Duration {
        1u32.checked_shl(retry_index)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

#[async_trait]
impl<C: Channel> Channel for RetryChannel<C> {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        let kind = self.delegate.channel_kind();
        let mut result = self.delegate.send(request).await?;
        let mut retries: u32 = 0;

        while retries < self.max_retries {
            let NotificationResult::Failure { code, reason } = &result else {
                break;
            };

            let delay = self.delay_for_retry(retries);
            warn!(
                channel = %kind,
                attempt = retries + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                code = %code,
                reason = %reason,
                "发送失败，将在退避后重试"
            );
            metrics::counter!(RETRIES_TOTAL, "channel" => kind.as_str()).increment(1);

            backoff(kind, delay).await;
            retries += 1;
            result = self.delegate.send(request).await?;
        }

        match &result {
            NotificationResult::Success { message_id, .. } if retries > 0 => {
                info!(
                    channel = %kind,
                    retries,
                    message_id = %message_id,
                    "发送在重试后成功"
                );
            }
            NotificationResult::Failure { code, reason } if self.max_retries > 0 => {
                error!(
                    channel = %kind,
                    max_retries = self.max_retries,
                    code = %code,
                    reason = %reason,
                    "已达最大重试次数，放弃重试"
                );
            }
            _ => {}
        }

        Ok(result)
    }

    fn channel_kind(&self) -> ChannelKind {
        self.delegate.channel_kind()
    }
}

/// 退避等待
///
/// 所在的 future 在等待期间被丢弃（任务取消、外层超时）时，
/// 由 guard 记录一条告警，取消本身照常传递给调用方。
async fn backoff(kind: ChannelKind, delay: Duration) {
    let mut guard = BackoffGuard {
        kind,
        delay,
        completed: false,
    };
    tokio::time::sleep(delay).await;
    guard.completed = true;
}

struct BackoffGuard {
    kind: ChannelKind,
    delay: Duration,
    completed: bool,
}

impl Drop for BackoffGuard {
    fn drop(&mut self) {
        if !self.completed {
            warn!(
                channel = %self.kind,
                delay_ms = self.delay.as_millis() as u64,
                "重试退避等待被取消，放弃当前发送"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
