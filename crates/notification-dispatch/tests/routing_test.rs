//! 分发路由集成测试
//!
//! 覆盖自动路由与显式渠道的一致性、JSON 载荷解析错误和自定义渠道注册。

mod common;

use std::sync::Arc;

use common::ScriptedChannel;
use notification_dispatch::{
    Channel, ChannelFactory, ChannelKind, DispatchError, EmailRequest, NotificationConfig,
    NotificationRequest, NotificationResult, NotificationService, PushRequest, SmsRequest,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn config() -> Arc<NotificationConfig> {
    Arc::new(
        NotificationConfig::builder()
            .property("email.from", "noreply@example.com")
            .property("push.project.id", "routing-test")
            .retry_attempts(0)
            .build()
            .unwrap(),
    )
}

fn requests() -> Vec<NotificationRequest> {
    vec![
        EmailRequest::new("user@example.com", "欢迎", "感谢注册")
            .unwrap()
            .into(),
        SmsRequest::new("+8613800000000", "验证码 482913")
            .unwrap()
            .into(),
        PushRequest::new("device-token-abc123", "新优惠", "")
            .unwrap()
            .into(),
    ]
}

// ==================== 路由 ====================

#[tokio::test]
async fn test_every_request_kind_is_routed_to_its_channel() {
    let service = NotificationService::new(config());

    for request in requests() {
        let result = assert_ok!(service.send(&request).await);
        let message_id = result.message_id().expect("模拟渠道总是成功");
        match request.kind() {
            ChannelKind::Email => assert!(message_id.starts_with("SG.")),
            ChannelKind::Sms => assert!(message_id.starts_with("SM")),
            ChannelKind::Push => {
                assert!(message_id.starts_with("projects/routing-test/messages/"))
            }
        }
    }
}

#[tokio::test]
async fn test_explicit_kind_matches_auto_routing() {
    let service = NotificationService::new(config());

    for request in requests() {
        let auto = assert_ok!(service.send(&request).await);
        let explicit = assert_ok!(service.send_with_kind(request.kind(), &request).await);
        assert_eq!(auto.is_success(), explicit.is_success());
    }
}

#[tokio::test]
async fn test_explicit_kind_returns_same_failure_as_auto_routing() {
    let mut service = NotificationService::new(config());
    for kind in ChannelKind::ALL {
        service.register_channel(Arc::new(ScriptedChannel::new(
            kind,
            NotificationResult::failure("PROVIDER_REJECTED", format!("{kind} 服务商拒绝请求")),
        )));
    }

    for request in requests() {
        let auto = assert_ok!(service.send(&request).await);
        let explicit = assert_ok!(service.send_with_kind(request.kind(), &request).await);

        assert_eq!(auto, explicit);
        let NotificationResult::Failure { code, reason } = explicit else {
            panic!("{} 应返回失败", request.kind());
        };
        assert_eq!(code, "PROVIDER_REJECTED");
        assert_eq!(reason, format!("{} 服务商拒绝请求", request.kind()));
    }
}

#[tokio::test]
async fn test_every_mismatched_kind_is_rejected() {
    let service = NotificationService::new(config());

    for request in requests() {
        for kind in ChannelKind::ALL.into_iter().filter(|k| *k != request.kind()) {
            let err = assert_err!(service.send_with_kind(kind, &request).await);
            assert!(err.is_misuse());
            assert_eq!(err.code(), "REQUEST_KIND_MISMATCH");
        }
    }
}

#[tokio::test]
async fn test_factory_channels_reject_foreign_requests() {
    let config = config();
    let request: NotificationRequest = SmsRequest::new("+1", "hi").unwrap().into();

    let email = ChannelFactory::create(ChannelKind::Email, &config);
    let err = assert_err!(email.send(&request).await);
    assert!(matches!(
        err,
        DispatchError::RequestKindMismatch {
            expected: ChannelKind::Email,
            actual: ChannelKind::Sms,
        }
    ));
}

// ==================== JSON 载荷 ====================

#[tokio::test]
async fn test_payload_routing() {
    let service = NotificationService::new(config());

    let result = assert_ok!(
        service
            .send_payload(&json!({
                "type": "sms",
                "phoneNumber": "+8613800000000",
                "message": "您的订单已发货"
            }))
            .await
    );
    assert!(result.message_id().unwrap().starts_with("SM"));

    let result = assert_ok!(
        service
            .send_payload(&json!({
                "type": "PUSH",
                "deviceToken": "token-1",
                "title": "标题",
                "body": "正文"
            }))
            .await
    );
    assert!(result.is_success());
}

#[tokio::test]
async fn test_payload_errors_never_reach_a_channel() {
    let mut service = NotificationService::new(config());
    let sms = Arc::new(ScriptedChannel::always_failing(ChannelKind::Sms));
    service.register_channel(sms.clone());

    let cases = [
        (json!({ "type": "FAX", "number": "123" }), "UNSUPPORTED_REQUEST_TYPE"),
        (json!({ "type": 42 }), "UNSUPPORTED_REQUEST_TYPE"),
        (json!({ "phoneNumber": "+1", "message": "hi" }), "NULL_ARGUMENT"),
        (json!({ "type": "SMS", "message": "hi" }), "NULL_ARGUMENT"),
        (json!({ "type": "SMS", "phoneNumber": null, "message": "hi" }), "NULL_ARGUMENT"),
        (json!({ "type": "SMS", "phoneNumber": "  ", "message": "hi" }), "INVALID_ARGUMENT"),
        (json!({ "type": "SMS", "phoneNumber": 13800, "message": "hi" }), "INVALID_ARGUMENT"),
    ];

    for (payload, expected) in cases {
        let err = assert_err!(service.send_payload(&payload).await);
        assert_eq!(err.code(), expected, "payload: {payload}");
    }
    assert_eq!(sms.calls(), 0);
}

// ==================== 自定义渠道 ====================

#[tokio::test]
async fn test_registered_channel_failure_is_returned_as_data() {
    let mut service = NotificationService::new(config());
    let email = Arc::new(ScriptedChannel::new(
        ChannelKind::Email,
        NotificationResult::failure("BOUNCED", "收件人地址不存在"),
    ));
    service.register_channel(email.clone());

    let request: NotificationRequest = EmailRequest::new("nobody@example.com", "", "")
        .unwrap()
        .into();
    let result = assert_ok!(service.send(&request).await);

    assert_eq!(
        result,
        NotificationResult::failure("BOUNCED", "收件人地址不存在")
    );
    assert_eq!(email.calls(), 1);

    // 其他渠道仍由工厂创建
    let sms: NotificationRequest = SmsRequest::new("+1", "hi").unwrap().into();
    assert!(assert_ok!(service.send(&sms).await).is_success());
}
