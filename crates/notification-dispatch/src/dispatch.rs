//! 异步通知分发
//!
//! 在 `NotificationService` 之上提供非阻塞接口：每次调用都在运行时上
//! 派生一个独立的 Tokio 任务执行发送，立即返回 `DispatchHandle`。
//! 发送是 I/O 密集型操作，任务创建成本低，因此不设工作池和排队。
//!
//! ## 生命周期
//!
//! 服务持有根取消令牌和任务追踪器，必须由持有者显式调用 `shutdown`：
//! 1. 关闭入口，此后的发送返回 `ServiceShutDown`
//! 2. 在宽限期内等待进行中的发送完成
//! 3. 宽限期结束仍未完成的发送被取消，其句柄返回 `Cancelled`
//! 4. 根令牌被取消，与关闭并发进入的发送即使已派生也会立即以 `Cancelled` 结束
//!
//! 关闭未完成就释放服务（包括 `shutdown` 的 future 被中途丢弃）时，
//! 进行中的发送全部取消。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::NotificationConfig;
use crate::error::{DispatchError, Result};
use crate::model::{ChannelKind, NotificationRequest, NotificationResult};
use crate::service::NotificationService;

/// 异步通知服务
pub struct AsyncNotificationService {
    service: Arc<NotificationService>,
    runtime: Handle,
    tracker: TaskTracker,
    shutdown_token: CancellationToken,
}

impl AsyncNotificationService {
    /// 基于配置创建（不带重试）
    ///
    /// 必须在 Tokio 运行时上下文中调用，发送任务派生在该运行时上。
    pub fn new(config: Arc<NotificationConfig>) -> Result<Self> {
        Self::from_service(NotificationService::new(config))
    }

    /// 包装已构造好的分发服务
    pub fn from_service(service: NotificationService) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::RuntimeUnavailable)?;
        info!("异步通知服务已初始化");
        Ok(Self {
            service: Arc::new(service),
            runtime,
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        })
    }

    pub fn service(&self) -> &Arc<NotificationService> {
        &self.service
    }

    /// 异步发送，渠道由请求类型决定
    pub fn send_async(&self, request: NotificationRequest) -> Result<DispatchHandle> {
        let kind = request.kind();
        let service = Arc::clone(&self.service);
        self.spawn(kind, async move { service.send(&request).await })
    }

    /// 异步发送到指定渠道
    pub fn send_async_with_kind(
        &self,
        kind: ChannelKind,
        request: NotificationRequest,
    ) -> Result<DispatchHandle> {
        let service = Arc::clone(&self.service);
        self.spawn(kind, async move { service.send_with_kind(kind, &request).await })
    }

    /// 进行中的发送任务数
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.tracker.is_closed()
    }

    fn spawn<F>(&self, kind: ChannelKind, send: F) -> Result<DispatchHandle>
    where
        F: Future<Output = Result<NotificationResult>> + Send + 'static,
    {
        if self.tracker.is_closed() || self.shutdown_token.is_cancelled() {
            return Err(DispatchError::ServiceShutDown);
        }
        Ok(self.spawn_tracked(kind, send))
    }

    /// 派生发送任务，不做准入检查
    ///
    /// 取消分支优先：令牌在任务首次被调度前已取消时，发送不会开始。
    fn spawn_tracked<F>(&self, kind: ChannelKind, send: F) -> DispatchHandle
    where
        F: Future<Output = Result<NotificationResult>> + Send + 'static,
    {
        let token = self.shutdown_token.child_token();
        let task_token = token.clone();

        let join = self.tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        warn!(channel = %kind, "异步发送已取消");
                        Err(DispatchError::Cancelled)
                    }
                    result = send => result,
                }
            },
            &self.runtime,
        );

        debug!(channel = %kind, "异步发送任务已派生");
        DispatchHandle { join, token }
    }

    /// 关闭服务
    ///
    /// 先停止接收新请求，再在 `grace` 内等待进行中的发送完成，
    /// 超时后取消剩余任务并等待它们退出。重复调用是安全的。
    ///
    /// 返回时根令牌一定已取消。
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        info!(
            in_flight = self.tracker.len(),
            grace_ms = grace.as_millis() as u64,
            "开始关闭异步通知服务"
        );

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                remaining = self.tracker.len(),
                "宽限期内未完成的发送将被取消"
            );
            self.shutdown_token.cancel();
            self.tracker.wait().await;
        }

        // 与关闭并发、在 wait 返回后才派生的任务由此取消
        self.shutdown_token.cancel();
        info!("异步通知服务已关闭");
    }
}

impl Drop for AsyncNotificationService {
    fn drop(&mut self) {
        if self.shutdown_token.is_cancelled() {
            return;
        }

        let active = self.tracker.len();
        if active > 0 {
            if self.tracker.is_closed() {
                error!(
                    active_tasks = active,
                    "异步通知服务在关闭完成前被释放，强制取消进行中的发送"
                );
            } else {
                error!(
                    active_tasks = active,
                    "异步通知服务未调用 shutdown 即被释放，强制取消进行中的发送"
                );
            }
        }
        self.tracker.close();
        self.shutdown_token.cancel();
    }
}

// ---------------------------------------------------------------------------
// DispatchHandle: 异步发送句柄
// ---------------------------------------------------------------------------

/// 异步发送句柄
///
/// 本身是一个 future，完成时给出发送结果。丢弃句柄不会取消发送。
#[derive(Debug)]
#[must_use = "丢弃句柄不会取消发送，但会丢失发送结果"]
pub struct DispatchHandle {
    join: JoinHandle<Result<NotificationResult>>,
    token: CancellationToken,
}

impl DispatchHandle {
    /// 请求取消发送
    ///
    /// 正在退避等待中的发送会立即停止，句柄随后返回 `Cancelled`。
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// 在限定时间内等待结果，超时则取消发送并返回 `Timeout`
    pub async fn wait_timeout(mut self, timeout: Duration) -> Result<NotificationResult> {
        match tokio::time::timeout(timeout, &mut self).await {
            Ok(result) => result,
            Err(_) => {
                self.cancel();
                Err(DispatchError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl Future for DispatchHandle {
    type Output = Result<NotificationResult>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.join).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) if join_error.is_cancelled() => {
                Poll::Ready(Err(DispatchError::Cancelled))
            }
            Poll::Ready(Err(join_error)) => {
                error!(error = %join_error, "异步发送任务 panic");
                Poll::Ready(Err(DispatchError::TaskFailed(join_error.to_string())))
            }
        }
    }
}
