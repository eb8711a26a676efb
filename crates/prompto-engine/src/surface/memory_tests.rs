use super::*;

#[tokio::test]
async fn test_query_in_document_order() {
    let surface = MemorySurface::new("https://chatgpt.com/");
    let a = surface.add(ElementSpec::new("textarea").attr("placeholder", "Message ChatGPT"));
    let _div = surface.add(ElementSpec::new("div"));
    let b = surface.add(ElementSpec::new("textarea").attr("placeholder", "Message again"));

    let found = surface
        .query_all(r#"textarea[placeholder*="Message"]"#)
        .await
        .unwrap();
    assert_eq!(found, vec![a, b]);
    assert_eq!(surface.query_count(), 1);

    surface.remove(a);
    let found = surface
        .query_all(r#"textarea[placeholder*="Message"]"#)
        .await
        .unwrap();
    assert_eq!(found, vec![b]);
}

#[tokio::test]
async fn test_invalid_selector_is_reported() {
    let surface = MemorySurface::new("https://example.com/");
    let err = surface.query_all("textarea[").await.unwrap_err();
    assert!(err.is_rule_error());
}

#[tokio::test]
async fn test_describe_and_detach() {
    let surface = MemorySurface::new("https://claude.ai/");
    let node = surface.add(
        ElementSpec::new("div")
            .attr("contenteditable", "true")
            .rect(Rect::new(0.0, 0.0, 300.0, 80.0)),
    );

    let info = surface.describe(node).await.unwrap().unwrap();
    assert!(info.editable);
    assert!(info.is_visible());
    assert!(!info.is_plain_field());

    surface.remove(node);
    assert!(surface.describe(node).await.unwrap().is_none());
    assert!(!surface.is_connected(node).await.unwrap());
    assert!(surface.bounding_rect(node).await.unwrap().is_none());
    assert!(!surface.is_connected(NodeId(999)).await.unwrap());
}

#[tokio::test]
async fn test_hidden_element_is_not_visible() {
    let surface = MemorySurface::new("https://claude.ai/");
    let hidden = surface.add(ElementSpec::new("textarea").hidden());
    let zero = surface.add(ElementSpec::new("textarea").rect(Rect::new(0.0, 0.0, 0.0, 0.0)));

    assert!(!surface.describe(hidden).await.unwrap().unwrap().is_visible());
    assert!(!surface.describe(zero).await.unwrap().unwrap().is_visible());
}

#[tokio::test]
async fn test_controls_and_removal_count() {
    let surface = MemorySurface::new("https://chatgpt.com/");
    let anchor = surface.add(ElementSpec::new("textarea"));

    let control = surface.mount_control(anchor).await.unwrap();
    assert_eq!(surface.controls_for(anchor), vec![control]);

    surface.remove_control(control).await.unwrap();
    assert_eq!(surface.removal_count(control), 1);
    assert_eq!(surface.mounted_controls(), 0);
    assert_eq!(
        surface.remove_control(control).await.unwrap_err(),
        SurfaceError::UnknownControl(control)
    );
}

#[tokio::test]
async fn test_mount_on_detached_anchor_fails() {
    let surface = MemorySurface::new("https://chatgpt.com/");
    let anchor = surface.add(ElementSpec::new("textarea"));
    surface.remove(anchor);
    assert_eq!(
        surface.mount_control(anchor).await.unwrap_err(),
        SurfaceError::Detached(anchor)
    );
}

#[tokio::test]
async fn test_observer_reports_filtered_mutations() {
    let surface = MemorySurface::new("https://chatgpt.com/");
    let mut events = surface.observe(&ObserveOptions::default()).await.unwrap();

    let node = surface.add(ElementSpec::new("div"));
    assert_eq!(events.recv().await, Some(SurfaceEvent::Mutation));

    // Not in the attribute filter.
    surface.set_attr(node, "data-foo", "1");
    surface.set_attr(node, "class", "visible");
    assert_eq!(events.recv().await, Some(SurfaceEvent::Mutation));
    assert!(events.try_recv().is_err());

    surface.disconnect().await.unwrap();
    assert!(!surface.is_observed());
    assert!(!surface.emit(SurfaceEvent::Scroll));
}

#[tokio::test]
async fn test_notices() {
    let surface = MemorySurface::new("https://chatgpt.com/");
    let id = surface.show_notice(&Notice::success("done")).await.unwrap();
    assert_eq!(surface.visible_notices().len(), 1);

    surface.dismiss_notice(id).await.unwrap();
    assert!(surface.visible_notices().is_empty());
    assert_eq!(surface.notice_log().len(), 1);
    assert!(surface.dismiss_notice(id).await.is_err());
}
