//! Notification Dispatch Demo
//!
//! 演示同步分发、重试装饰器和异步批量发送。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::future::join_all;
use notification_dispatch::observability::{self, LogConfig};
use notification_dispatch::{
    AsyncNotificationService, Channel, ChannelFactory, ChannelKind, EmailRequest,
    NotificationConfig, NotificationRequest, NotificationService, PushRequest, RetryChannel,
    SmsRequest,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "notify-demo", version, about = "多渠道通知分发演示")]
struct Args {
    /// 配置目录（包含 default.toml 等），未指定时使用默认配置
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// 覆盖重试次数
    #[arg(long)]
    retry_attempts: Option<u32>,

    /// 覆盖退避基准时间（毫秒）
    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// 输出 JSON 格式日志
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// 异步批量发送的数量
    #[arg(long, default_value_t = 5)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut log_config = LogConfig::from_env();
    log_config.json_logs |= args.json_logs;
    observability::init_tracing(&log_config)?;
    observability::describe_metrics();

    let config = Arc::new(build_config(&args)?);
    info!(
        retry_attempts = config.retry_attempts(),
        base_delay_ms = config.base_delay().as_millis() as u64,
        "配置加载完成"
    );

    // 同步分发
    let service = NotificationService::new(Arc::clone(&config));
    for request in sample_requests()? {
        let result = service.send(&request).await?;
        info!(channel = %request.kind(), ?result, "同步发送完成");
    }

    // 显式指定渠道
    let sms: NotificationRequest = SmsRequest::new("+8613800000000", "您的验证码是 482913")?.into();
    let result = service.send_with_kind(ChannelKind::Sms, &sms).await?;
    info!(?result, "显式渠道发送完成");

    // 重试装饰器
    let email = ChannelFactory::create(ChannelKind::Email, &config);
    let resilient = RetryChannel::new(email, config.retry_attempts(), config.base_delay())?;
    let request: NotificationRequest =
        EmailRequest::new("ops@example.com", "日报", "今日投递统计见附件")?.into();
    let result = resilient.send(&request).await?;
    info!(?result, "带重试的发送完成");

    // 异步批量发送
    let async_service = AsyncNotificationService::from_service(NotificationService::with_retry(
        Arc::clone(&config),
    ))?;
    let mut handles = Vec::with_capacity(args.batch_size);
    for i in 0..args.batch_size {
        let request = PushRequest::new(
            format!("device-token-{i:04}"),
            "限时优惠",
            format!("第 {} 位用户专享", i + 1),
        )?;
        handles.push(async_service.send_async(request.into())?);
    }
    info!(in_flight = async_service.in_flight(), "异步批量发送已派生");

    let results = join_all(
        handles
            .into_iter()
            .map(|handle| handle.wait_timeout(Duration::from_secs(10))),
    )
    .await;

    let succeeded = results
        .iter()
        .filter(|r| matches!(r, Ok(result) if result.is_success()))
        .count();
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        warn!(error = %err, code = err.code(), "异步发送未完成");
    }
    info!(total = results.len(), succeeded, "异步批量发送结束");

    async_service.shutdown(Duration::from_secs(5)).await;
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<NotificationConfig> {
    let base = match &args.config_dir {
        Some(dir) => NotificationConfig::load(dir)
            .with_context(|| format!("无法从 {} 加载配置", dir.display()))?,
        None => NotificationConfig::builder()
            .property("email.from", "noreply@example.com")
            .build()?,
    };

    if args.retry_attempts.is_none() && args.base_delay_ms.is_none() {
        return Ok(base);
    }

    let config = NotificationConfig::builder()
        .properties(base.properties().clone())
        .retry_attempts(args.retry_attempts.unwrap_or(base.retry_attempts()))
        .base_delay_ms(
            args.base_delay_ms
                .unwrap_or(base.base_delay().as_millis() as u64),
        )
        .build()?;
    Ok(config)
}

fn sample_requests() -> anyhow::Result<Vec<NotificationRequest>> {
    Ok(vec![
        EmailRequest::new("user@example.com", "欢迎加入", "感谢您的注册")?.into(),
        SmsRequest::new("+8613800000000", "您的订单已发货")?.into(),
        PushRequest::new("device-token-abc123", "新消息", "您有一条新的站内信")?.into(),
    ])
}
