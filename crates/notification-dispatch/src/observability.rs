//! 日志与指标
//!
//! 日志基于 tracing + tracing-subscriber，指标通过 `metrics` facade 记录。
//! 本 crate 不安装任何指标 recorder，未安装时计数器调用为空操作；
//! 宿主进程自行选择导出方式（Prometheus 等）。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 通知分发总数，标签: channel, outcome（success / failure）
pub const DISPATCHED_TOTAL: &str = "notifications_dispatched_total";

/// 重试次数，标签: channel
pub const RETRIES_TOTAL: &str = "notification_retries_total";

/// 注册指标描述
///
/// 在安装 recorder 之后调用，描述会出现在导出端点的 HELP 注释中。
pub fn describe_metrics() {
    metrics::describe_counter!(
        DISPATCHED_TOTAL,
        "Total number of notifications dispatched, by channel and outcome"
    );
    metrics::describe_counter!(
        RETRIES_TOTAL,
        "Total number of notification send retries, by channel"
    );
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别（如 "info", "notification_dispatch=debug"）
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl LogConfig {
    /// 从环境变量加载配置（RUST_LOG、JSON_LOGS）
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: std::env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// 初始化全局 tracing subscriber
///
/// 过滤器优先取 `RUST_LOG`，其次取配置中的级别，都无效时回退到 info。
/// 全局 subscriber 已存在时返回错误。
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
