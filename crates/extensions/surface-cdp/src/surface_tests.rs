use super::*;
use prompto_engine::{ALWAYS_ON_TOP, ControlIntent, ControlLayout, Point, ToolbarState};

fn event(method: &str, params: Value) -> CdpResponse {
    serde_json::from_value(json!({
        "method": method,
        "params": params,
        "sessionId": "S1",
    }))
    .unwrap()
}

fn binding(payload: Value) -> CdpResponse {
    event(
        "Runtime.bindingCalled",
        json!({ "name": BINDING, "payload": payload.to_string(), "executionContextId": 2 }),
    )
}

#[test]
fn test_translate_binding_events() {
    assert_eq!(
        translate_event(&binding(json!({"type": "mutation"}))),
        Some(SurfaceEvent::Mutation)
    );
    assert_eq!(
        translate_event(&binding(json!({"type": "visibility", "visible": false}))),
        Some(SurfaceEvent::Visibility { visible: false })
    );
    assert_eq!(
        translate_event(&binding(json!({"type": "pointer", "point": {"x": 4.0, "y": 9.5}}))),
        Some(SurfaceEvent::Pointer {
            point: Point::new(4.0, 9.5)
        })
    );
}

#[test]
fn test_translate_control_intents() {
    assert_eq!(
        translate_event(&binding(
            json!({"type": "control", "control": 3, "intent": {"intent": "activate"}})
        )),
        Some(SurfaceEvent::Control {
            control: ControlId(3),
            intent: ControlIntent::Activate,
        })
    );
    assert_eq!(
        translate_event(&binding(json!({
            "type": "control",
            "control": 3,
            "intent": {"intent": "select", "action": "optimize"}
        }))),
        Some(SurfaceEvent::Control {
            control: ControlId(3),
            intent: ControlIntent::Select {
                action: ToolbarAction::Optimize
            },
        })
    );
}

#[test]
fn test_translate_ignores_foreign_and_malformed_bindings() {
    let foreign = event(
        "Runtime.bindingCalled",
        json!({ "name": "somethingElse", "payload": "{\"type\":\"mutation\"}" }),
    );
    assert_eq!(translate_event(&foreign), None);
    assert_eq!(translate_event(&binding(json!({"type": "teleport"}))), None);
    assert_eq!(
        translate_event(&event(
            "Runtime.bindingCalled",
            json!({ "name": BINDING, "payload": "not json" })
        )),
        None
    );
}

#[test]
fn test_translate_main_frame_navigation_only() {
    let main = event(
        "Page.frameNavigated",
        json!({"frame": {"id": "F1", "url": "https://claude.ai/new"}}),
    );
    assert_eq!(
        translate_event(&main),
        Some(SurfaceEvent::Navigated {
            location: "https://claude.ai/new".to_string()
        })
    );

    let child = event(
        "Page.frameNavigated",
        json!({"frame": {"id": "F2", "parentId": "F1", "url": "https://ads.example/"}}),
    );
    assert_eq!(translate_event(&child), None);
}

#[test]
fn test_translate_closed_and_unrelated() {
    assert_eq!(
        translate_event(&event("Inspector.detached", json!({"reason": "target_closed"}))),
        Some(SurfaceEvent::Closed)
    );
    assert_eq!(
        translate_event(&event("Page.targetCrashed", json!({}))),
        Some(SurfaceEvent::Closed)
    );
    assert_eq!(
        translate_event(&event("Runtime.consoleAPICalled", json!({"type": "log"}))),
        None
    );
}

#[test]
fn test_script_error_maps_handles() {
    let err = script_error(CdpError::JavaScript(
        "Error: detached:17\n    at need (<anonymous>:55:21)".to_string(),
    ));
    assert_eq!(err, SurfaceError::Detached(NodeId(17)));

    let err = script_error(CdpError::JavaScript("Error: unknown-control:4".to_string()));
    assert_eq!(err, SurfaceError::UnknownControl(ControlId(4)));

    let err = script_error(CdpError::JavaScript("TypeError: x is undefined".to_string()));
    assert!(matches!(err, SurfaceError::Backend(_)));

    let err = script_error(CdpError::SessionClosed);
    assert_eq!(err, SurfaceError::Closed);
}

#[test]
fn test_render_payload_carries_declarations_and_labels() {
    let view = ControlView {
        layout: ControlLayout::compute(prompto_engine::Rect::new(0.0, 0.0, 600.0, 120.0), true),
        state: ToolbarState::Expanded,
        style: ALWAYS_ON_TOP,
    };
    let (payload, labels) = CdpSurface::render_payload(&view).unwrap();

    assert_eq!(payload["declarations"][0], json!(["position", "fixed"]));
    assert_eq!(payload["declarations"][1], json!(["z-index", "999999999"]));
    assert_eq!(payload["style"]["z_index"], 999_999_999);
    assert_eq!(payload["state"]["state"], "expanded");
    assert_eq!(payload["layout"]["actions"].as_array().unwrap().len(), 3);
    assert_eq!(payload["layout"]["actions"][0]["action"], "enhance");

    for action in ToolbarAction::ALL {
        let key = serde_json::to_value(action).unwrap();
        assert_eq!(labels[key.as_str().unwrap()], action.label());
    }
}

mod page_tests {
    use super::*;
    use crate::client::CdpClient;
    use crate::fake_browser::{FakeBrowser, Reply, attach_reply, thrown, value};

    /// Stands in for the in-page runtime: one textarea with id 1.
    fn runtime(method: &str, params: &Value) -> Reply {
        if method != "Runtime.evaluate" {
            return attach_reply(method, params);
        }
        let expression = params["expression"].as_str().unwrap_or_default();
        let call = expression.strip_prefix("window.__prompto.");
        match call {
            None => value(Value::Null),
            Some(c) if c.starts_with("location(") => value(json!("https://chatgpt.com/")),
            Some(c) if c.starts_with("query(\"[[\")") => value(json!({
                "error": "invalid-selector",
                "message": "'[[' is not a valid selector",
            })),
            Some(c) if c.starts_with("query(") => value(json!([1])),
            Some(c) if c.starts_with("describe(1)") => value(json!({
                "tag": "textarea",
                "editable": false,
                "displayed": true,
                "rect": {"x": 10.0, "y": 500.0, "width": 600.0, "height": 80.0},
            })),
            Some(c) if c.starts_with("describe(") => value(Value::Null),
            Some(c) if c.starts_with("readValue(1)") => value(json!("draft prompt")),
            Some(c) if c.starts_with("readValue(") => thrown("Error: detached:9\n    at need"),
            Some(c) if c.starts_with("mount(") => value(json!(5)),
            Some(c) if c.starts_with("notice(") => value(json!(2)),
            Some(_) => value(Value::Null),
        }
    }

    async fn attached(browser: &FakeBrowser) -> (CdpClient, CdpSurface) {
        let client = CdpClient::connect(&browser.endpoint()).await.unwrap();
        let session = client.attach_page("T1").await.unwrap();
        let surface = CdpSurface::attach(session).await.unwrap();
        (client, surface)
    }

    #[tokio::test]
    async fn test_attach_installs_runtime() {
        let browser = FakeBrowser::start(Arc::new(runtime)).await;
        let (_client, _surface) = attached(&browser).await;

        let scripts = browser.requests("Page.addScriptToEvaluateOnNewDocument");
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0]["params"]["source"], BOOTSTRAP);
        let evaluated = browser.requests("Runtime.evaluate");
        assert_eq!(evaluated[0]["params"]["expression"], BOOTSTRAP);
    }

    #[tokio::test]
    async fn test_reads_through_runtime() {
        let browser = FakeBrowser::start(Arc::new(runtime)).await;
        let (_client, surface) = attached(&browser).await;

        assert_eq!(surface.location().await.unwrap(), "https://chatgpt.com/");
        assert_eq!(surface.query_all("textarea").await.unwrap(), vec![NodeId(1)]);

        let info = surface.describe(NodeId(1)).await.unwrap().unwrap();
        assert!(info.is_plain_field());
        assert!(info.is_visible());
        assert_eq!(surface.describe(NodeId(2)).await.unwrap(), None);

        assert_eq!(surface.read_value(NodeId(1)).await.unwrap(), "draft prompt");
        assert_eq!(surface.mount_control(NodeId(1)).await.unwrap(), ControlId(5));
        assert_eq!(
            surface.show_notice(&Notice::validation("Too short")).await.unwrap(),
            NoticeId(2)
        );
    }

    #[tokio::test]
    async fn test_runtime_errors_map_to_surface_errors() {
        let browser = FakeBrowser::start(Arc::new(runtime)).await;
        let (_client, surface) = attached(&browser).await;

        let err = surface.query_all("[[").await.unwrap_err();
        assert!(err.is_rule_error());
        assert_eq!(
            surface.read_value(NodeId(9)).await.unwrap_err(),
            SurfaceError::Detached(NodeId(9))
        );
    }

    #[tokio::test]
    async fn test_write_sends_escaped_text() {
        let browser = FakeBrowser::start(Arc::new(runtime)).await;
        let (_client, surface) = attached(&browser).await;

        surface
            .write_value(NodeId(1), "say \"hi\"\nthen stop")
            .await
            .unwrap();
        surface.dispatch_event(NodeId(1), "input").await.unwrap();

        let expressions: Vec<String> = browser
            .requests("Runtime.evaluate")
            .iter()
            .filter_map(|r| r["params"]["expression"].as_str().map(str::to_string))
            .collect();
        assert!(expressions.contains(
            &r#"window.__prompto.writeValue(1, "say \"hi\"\nthen stop")"#.to_string()
        ));
        assert!(expressions.contains(&r#"window.__prompto.dispatch(1, "input")"#.to_string()));
    }

    #[tokio::test]
    async fn test_observe_streams_page_events() {
        let browser = FakeBrowser::start(Arc::new(runtime)).await;
        let (_client, surface) = attached(&browser).await;

        let mut events = surface.observe(&ObserveOptions::default()).await.unwrap();
        assert!(surface.observe(&ObserveOptions::default()).await.is_err());
        assert_eq!(browser.requests("Runtime.addBinding")[0]["params"]["name"], BINDING);
        assert_eq!(browser.requests("Page.addScriptToEvaluateOnNewDocument").len(), 2);

        browser.push(json!({
            "method": "Runtime.bindingCalled",
            "params": {"name": BINDING, "payload": "{\"type\":\"mutation\"}"},
            "sessionId": "S1",
        }));
        browser.push(json!({
            "method": "Page.frameNavigated",
            "params": {"frame": {"id": "F", "url": "https://chatgpt.com/c/2"}},
            "sessionId": "S1",
        }));
        assert_eq!(events.recv().await, Some(SurfaceEvent::Mutation));
        assert_eq!(
            events.recv().await,
            Some(SurfaceEvent::Navigated {
                location: "https://chatgpt.com/c/2".to_string()
            })
        );

        browser.close();
        assert_eq!(events.recv().await, Some(SurfaceEvent::Closed));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_disconnect_removes_hooks() {
        let browser = FakeBrowser::start(Arc::new(runtime)).await;
        let (_client, surface) = attached(&browser).await;
        let _events = surface.observe(&ObserveOptions::default()).await.unwrap();

        surface.disconnect().await.unwrap();

        let methods = browser.methods();
        assert!(methods.contains(&"Page.removeScriptToEvaluateOnNewDocument".to_string()));
        assert!(methods.contains(&"Runtime.removeBinding".to_string()));
        assert_eq!(
            browser.requests("Runtime.evaluate").last().unwrap()["params"]["expression"],
            "window.__prompto.disconnect()"
        );
    }
}
