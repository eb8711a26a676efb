use super::*;
use serde_json::json;

#[test]
fn test_enhance_message_wire_shape() {
    let msg = BridgeMessage {
        correlation_id: CorrelationId(7),
        request: BridgeRequest::Enhance {
            text: "fix my resume".to_string(),
        },
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        json!({
            "correlation_id": 7,
            "kind": "enhance-request",
            "payload": { "text": "fix my resume" }
        })
    );

    let parsed: BridgeMessage = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_track_event_wire_shape() {
    let msg = BridgeMessage {
        correlation_id: CorrelationId(2),
        request: BridgeRequest::TrackEvent {
            kind: TransformKind::Optimize,
            before_length: 40,
            after_length: 30,
        },
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["kind"], "track-event");
    assert_eq!(value["payload"]["kind"], "optimize");
    assert_eq!(value["payload"]["before_length"], 40);
}

#[test]
fn test_failure_reply_wire_shape() {
    let reply = BridgeReply::failure(CorrelationId(3), FailureReason::AuthRequired, "no token");
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["correlation_id"], 3);
    assert_eq!(value["outcome"]["status"], "failure");
    assert_eq!(value["outcome"]["reason"], "auth-required");
    assert!(!reply.is_success());
}

#[test]
fn test_success_reply_into_result() {
    let reply = BridgeReply::success(
        CorrelationId(1),
        ReplyPayload::Transformed {
            text: "better".to_string(),
        },
    );
    assert!(reply.is_success());
    match reply.into_result() {
        Ok(ReplyPayload::Transformed { text }) => assert_eq!(text, "better"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_transform_constructor() {
    let req = BridgeRequest::transform(TransformKind::Optimize, "abc");
    assert_eq!(req.kind(), "optimize-request");
    assert_eq!(req.transform_kind(), Some(TransformKind::Optimize));
    assert_eq!(BridgeRequest::Ping.transform_kind(), None);
}

#[test]
fn test_debug_hides_secrets() {
    let req = BridgeRequest::SignIn {
        username: "ada".to_string(),
        password: "hunter2".to_string(),
    };
    let debug = format!("{:?}", req);
    assert!(debug.contains("ada"));
    assert!(!debug.contains("hunter2"));

    let req = BridgeRequest::Enhance {
        text: "private prompt".to_string(),
    };
    assert!(!format!("{:?}", req).contains("private"));
}

#[test]
fn test_correlation_id_display() {
    assert_eq!(CorrelationId(42).to_string(), "#42");
}
