//! 通知领域模型
//!
//! 包含渠道类型、三种通知请求值对象以及单次发送结果。
//! 请求对象在构造时完成校验，构造成功后不可变。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, Result};

// ---------------------------------------------------------------------------
// ChannelKind: 渠道类型
// ---------------------------------------------------------------------------

/// 通知投递渠道
///
/// 封闭枚举：新增成员后，工厂、服务路由和日志中的 `match` 都会编译失败，
/// 直到补齐对应分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelKind {
    Email,
    Sms,
    Push,
}

impl ChannelKind {
    /// 全部渠道，供需要遍历枚举的测试和初始化代码使用
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Email, ChannelKind::Sms, ChannelKind::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::Push => "PUSH",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = DispatchError;

    /// 大小写不敏感地解析渠道名
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "PUSH" => Ok(Self::Push),
            _ => Err(DispatchError::UnsupportedRequestType {
                type_name: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// 请求值对象
// ---------------------------------------------------------------------------

fn require_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DispatchError::invalid_argument(field, "不能为空"));
    }
    Ok(())
}

/// 邮件通知请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    to: String,
    subject: String,
    body: String,
}

impl EmailRequest {
    /// 创建邮件请求，收件人不能为空白，主题和正文允许为空字符串
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self> {
        let to = to.into();
        require_not_blank("to", &to)?;
        Ok(Self {
            to,
            subject: subject.into(),
            body: body.into(),
        })
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// 短信通知请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsRequest {
    phone_number: String,
    message: String,
}

impl SmsRequest {
    pub fn new(phone_number: impl Into<String>, message: impl Into<String>) -> Result<Self> {
        let phone_number = phone_number.into();
        require_not_blank("phone_number", &phone_number)?;
        Ok(Self {
            phone_number,
            message: message.into(),
        })
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// APP 推送通知请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    device_token: String,
    title: String,
    body: String,
}

impl PushRequest {
    pub fn new(
        device_token: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self> {
        let device_token = device_token.into();
        require_not_blank("device_token", &device_token)?;
        Ok(Self {
            device_token,
            title: title.into(),
            body: body.into(),
        })
    }

    pub fn device_token(&self) -> &str {
        &self.device_token
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// 通知请求
///
/// 每个变体对应唯一的 `ChannelKind`，服务层据此自动路由。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationRequest {
    Email(EmailRequest),
    Sms(SmsRequest),
    Push(PushRequest),
}

impl NotificationRequest {
    /// 请求隐含的渠道类型
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Email(_) => ChannelKind::Email,
            Self::Sms(_) => ChannelKind::Sms,
            Self::Push(_) => ChannelKind::Push,
        }
    }

    /// 从动态 JSON 载荷解析请求
    ///
    /// 载荷通过 `type` 字段声明渠道。字段缺失或为 null 返回 `NullArgument`，
    /// 未知类型返回 `UnsupportedRequestType`，其余校验与直接构造一致。
    pub fn from_value(value: &Value) -> Result<Self> {
        let type_name = match value.get("type") {
            None | Some(Value::Null) => return Err(DispatchError::null_argument("type")),
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(DispatchError::UnsupportedRequestType {
                    type_name: other.to_string(),
                });
            }
        };

        let request = match type_name.parse::<ChannelKind>()? {
            ChannelKind::Email => Self::Email(EmailRequest::new(
                required_str(value, "to")?,
                required_str(value, "subject")?,
                required_str(value, "body")?,
            )?),
            ChannelKind::Sms => Self::Sms(SmsRequest::new(
                required_str(value, "phoneNumber")?,
                required_str(value, "message")?,
            )?),
            ChannelKind::Push => Self::Push(PushRequest::new(
                required_str(value, "deviceToken")?,
                required_str(value, "title")?,
                required_str(value, "body")?,
            )?),
        };
        Ok(request)
    }
}

fn required_str<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    match value.get(field) {
        None | Some(Value::Null) => Err(DispatchError::null_argument(field)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(DispatchError::invalid_argument(field, "必须是字符串")),
    }
}

impl From<EmailRequest> for NotificationRequest {
    fn from(request: EmailRequest) -> Self {
        Self::Email(request)
    }
}

impl From<SmsRequest> for NotificationRequest {
    fn from(request: SmsRequest) -> Self {
        Self::Sms(request)
    }
}

impl From<PushRequest> for NotificationRequest {
    fn from(request: PushRequest) -> Self {
        Self::Push(request)
    }
}

// ---------------------------------------------------------------------------
// NotificationResult: 单次发送结果
// ---------------------------------------------------------------------------

/// 单次发送尝试的结果
///
/// 只有成功和失败两种状态，没有"处理中"。投递失败是预期内的业务结果，
/// 以 `Failure` 返回而不是 `Err`。
///
/// `message_id`、`code`、`reason` 必须非空。`success` / `failure` 构造函数
/// 只在 debug 构建中断言这一点，由渠道实现负责传入有效值；
/// 反序列化则总是校验，空值返回错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "SCREAMING_SNAKE_CASE",
    try_from = "RawNotificationResult"
)]
pub enum NotificationResult {
    #[serde(rename_all = "camelCase")]
    Success {
        /// 外部渠道返回的消息标识，用于追踪投递状态
        message_id: String,
        timestamp: DateTime<Utc>,
    },
    Failure {
        /// 机器可读的错误码，如 `GATEWAY_TIMEOUT`
        code: String,
        reason: String,
    },
}

impl NotificationResult {
    pub fn success(message_id: impl Into<String>) -> Self {
        let message_id = message_id.into();
        debug_assert!(!message_id.is_empty(), "message_id 不能为空");
        Self::Success {
            message_id,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(code: impl Into<String>, reason: impl Into<String>) -> Self {
        let code = code.into();
        let reason = reason.into();
        debug_assert!(!code.is_empty(), "code 不能为空");
        debug_assert!(!reason.is_empty(), "reason 不能为空");
        Self::Failure { code, reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Success { message_id, .. } => Some(message_id),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_code(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { code, .. } => Some(code),
        }
    }

    /// 指标标签使用的结果名
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
        }
    }
}

/// 反序列化的中间形态，校验通过后才转换为 `NotificationResult`
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
enum RawNotificationResult {
    #[serde(rename_all = "camelCase")]
    Success {
        message_id: String,
        timestamp: DateTime<Utc>,
    },
    Failure {
        code: String,
        reason: String,
    },
}

impl TryFrom<RawNotificationResult> for NotificationResult {
    type Error = String;

    fn try_from(raw: RawNotificationResult) -> std::result::Result<Self, Self::Error> {
        let blank = |field: &str| format!("{field} 不能为空");
        match raw {
            RawNotificationResult::Success {
                message_id,
                timestamp,
            } => {
                if message_id.trim().is_empty() {
                    return Err(blank("messageId"));
                }
                Ok(Self::Success {
                    message_id,
                    timestamp,
                })
            }
            RawNotificationResult::Failure { code, reason } => {
                if code.trim().is_empty() {
                    return Err(blank("code"));
                }
                if reason.trim().is_empty() {
                    return Err(blank("reason"));
                }
                Ok(Self::Failure { code, reason })
            }
        }
    }
}
