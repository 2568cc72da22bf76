//! 通知库配置
//!
//! 不可变的键值属性表加上两个重试参数。通过 builder 在代码中构造，
//! 或从配置文件与环境变量加载；两种方式最终都经过同一套校验。
//! 构造完成后通过 `Arc` 在所有渠道和服务之间只读共享。

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{DispatchError, Result};

/// 默认重试次数（不含首次发送）
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// 默认退避基准时间（毫秒）
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// 通知库配置
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    properties: HashMap<String, String>,
    retry_attempts: u32,
    base_delay: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl NotificationConfig {
    pub fn builder() -> NotificationConfigBuilder {
        NotificationConfigBuilder::default()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 读取属性，不存在时返回默认值
    pub fn property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.property(key).unwrap_or(default)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// 发送失败后的额外重试次数
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// 指数退避的基准等待时间，第 i 次重试等待 `base_delay * 2^i`
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. {config_dir}/default.toml
    /// 2. {config_dir}/{NOTIFY_ENV}.toml（NOTIFY_ENV 默认为 development）
    /// 3. 环境变量（NOTIFY__ 前缀，如 NOTIFY__RETRY_ATTEMPTS -> retry_attempts）
    ///
    /// 两个文件都是可选的；全部缺失时得到默认配置。
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        let env = std::env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load_layered(config_dir.as_ref(), &env, None)
    }

    /// 分层加载的实现
    ///
    /// `env_vars` 为 `None` 时读取进程环境变量，否则只使用给定的变量表。
    fn load_layered(
        config_dir: &Path,
        env: &str,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let settings: FileSettings = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env_vars),
            )
            .build()?
            .try_deserialize()?;

        let mut builder = Self::builder().properties(settings.properties);
        if let Some(retry_attempts) = settings.retry_attempts {
            builder = builder.retry_attempts(retry_attempts);
        }
        if let Some(base_delay_ms) = settings.base_delay_ms {
            builder = builder.base_delay_ms(base_delay_ms);
        }
        builder.build()
    }
}

/// 配置文件结构，所有字段可选，缺省值由 builder 决定
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    retry_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    #[serde(default)]
    properties: HashMap<String, String>,
}

/// `NotificationConfig` 的 builder
#[derive(Debug, Clone)]
pub struct NotificationConfigBuilder {
    properties: HashMap<String, String>,
    retry_attempts: u32,
    base_delay_ms: u64,
}

impl Default for NotificationConfigBuilder {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl NotificationConfigBuilder {
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// 校验并生成不可变配置
    pub fn build(self) -> Result<NotificationConfig> {
        if self.base_delay_ms < 1 {
            return Err(DispatchError::invalid_argument(
                "base_delay_ms",
                "退避基准时间必须 >= 1 ms",
            ));
        }
        if let Some(key) = self.properties.keys().find(|k| k.trim().is_empty()) {
            return Err(DispatchError::invalid_argument(
                "properties",
                format!("属性键不能为空: {:?}", key),
            ));
        }

        Ok(NotificationConfig {
            properties: self.properties,
            retry_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NotificationConfig::builder().build().unwrap();
        assert_eq!(config.retry_attempts(), 3);
        assert_eq!(config.base_delay(), Duration::from_millis(1000));
        assert!(config.properties().is_empty());
    }

    #[test]
    fn test_builder_properties() {
        let mut extra = HashMap::new();
        extra.insert("sms.provider".to_string(), "twilio".to_string());

        let config = NotificationConfig::builder()
            .property("email.from", "noreply@example.com")
            .properties(extra)
            .retry_attempts(0)
            .base_delay_ms(500)
            .build()
            .unwrap();

        assert_eq!(config.property("email.from"), Some("noreply@example.com"));
        assert_eq!(config.property("sms.provider"), Some("twilio"));
        assert_eq!(config.property("push.provider"), None);
        assert_eq!(config.property_or("push.provider", "fcm"), "fcm");
        assert_eq!(config.retry_attempts(), 0);
        assert_eq!(config.base_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_zero_base_delay() {
        let err = NotificationConfig::builder()
            .base_delay_ms(0)
            .build()
            .unwrap_err();
        assert!(
            matches!(err, DispatchError::InvalidArgument { ref field, .. } if field == "base_delay_ms")
        );
    }

    #[test]
    fn test_rejects_blank_property_key() {
        let err = NotificationConfig::builder()
            .property(" ", "value")
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    /// 只使用给定的环境变量加载，测试不受进程中 NOTIFY_ENV / NOTIFY__* 影响
    fn load_isolated(dir: &Path, vars: &[(&str, &str)]) -> Result<NotificationConfig> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NotificationConfig::load_layered(dir, "test", Some(vars))
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("notify-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            r#"
retry_attempts = 5
base_delay_ms = 250

[properties]
region = "cn-hangzhou"
"#,
        )
        .unwrap();

        let config = load_isolated(&dir, &[]).unwrap();
        assert_eq!(config.retry_attempts(), 5);
        assert_eq!(config.base_delay(), Duration::from_millis(250));
        assert_eq!(config.property("region"), Some("cn-hangzhou"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("notify-empty-{}", uuid::Uuid::new_v4()));
        let config = load_isolated(&dir, &[]).unwrap();
        assert_eq!(config.base_delay(), Duration::from_millis(DEFAULT_BASE_DELAY_MS));
    }

    #[test]
    fn test_load_rejects_invalid_delay() {
        let dir = std::env::temp_dir().join(format!("notify-invalid-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), "base_delay_ms = 0\n").unwrap();

        let err = load_isolated(&dir, &[]).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_layers_env_file_and_variables() {
        let dir = std::env::temp_dir().join(format!("notify-layers-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "retry_attempts = 5\nbase_delay_ms = 250\n",
        )
        .unwrap();
        std::fs::write(dir.join("test.toml"), "base_delay_ms = 40\n").unwrap();

        let config = load_isolated(&dir, &[("NOTIFY__RETRY_ATTEMPTS", "7")]).unwrap();
        assert_eq!(config.retry_attempts(), 7);
        assert_eq!(config.base_delay(), Duration::from_millis(40));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
