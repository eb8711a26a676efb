use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 7,
        method: "Runtime.addBinding".to_string(),
        params: Some(serde_json::json!({"name": "__promptoEmit"})),
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["sessionId"], "S1");
    assert_eq!(json["params"]["name"], "__promptoEmit");
}

#[test]
fn test_session_id_omitted_for_browser_calls() {
    let req = CdpRequest {
        id: 1,
        method: "Target.getTargets".to_string(),
        params: None,
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("sessionId"));
    assert!(!json.contains("params"));
}

#[test]
fn test_event_deserialize() {
    let json = r#"{
        "method": "Runtime.bindingCalled",
        "params": {"name": "__promptoEmit", "payload": "{\"type\":\"scroll\"}", "executionContextId": 3},
        "sessionId": "S1"
    }"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert!(resp.id.is_none());
    assert_eq!(resp.method.as_deref(), Some("Runtime.bindingCalled"));
    assert_eq!(resp.params()["name"], "__promptoEmit");
}

#[test]
fn test_error_response_deserialize() {
    let json = r#"{"id": 4, "error": {"code": -32000, "message": "No target with given id"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    match resp.into_result() {
        Err(CdpError::Protocol { code, message }) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "No target with given id");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_reply_without_result_is_null() {
    let resp: CdpResponse = serde_json::from_str(r#"{"id": 5}"#).unwrap();
    assert_eq!(resp.into_result().unwrap(), Value::Null);
}

#[test]
fn test_page_info_filters() {
    let json = r#"[
        {"id": "A", "type": "page", "title": "ChatGPT", "url": "https://chatgpt.com/c/1"},
        {"id": "B", "type": "service_worker", "title": "sw", "url": "https://chatgpt.com/sw.js"},
        {"id": "C", "type": "page", "title": "New Tab", "url": "chrome://newtab/"}
    ]"#;
    let pages: Vec<PageInfo> = serde_json::from_str(json).unwrap();
    let tabs: Vec<_> = pages.iter().filter(|p| p.is_page()).collect();
    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs[0].host().as_deref(), Some("chatgpt.com"));
    assert_eq!(tabs[1].host().as_deref(), Some("newtab"));
}

#[test]
fn test_browser_version_deserialize() {
    let json = r#"{
        "Browser": "Chrome/126.0.6478.126",
        "Protocol-Version": "1.3",
        "User-Agent": "Mozilla/5.0",
        "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
    }"#;
    let version: BrowserVersion = serde_json::from_str(json).unwrap();
    assert_eq!(version.browser, "Chrome/126.0.6478.126");
    assert!(version.web_socket_debugger_url.starts_with("ws://"));
}
