use super::*;
use crate::notices::NoticeKind;
use prompto_protocols::FailureReason;

const ORIGINAL: &str = "fix my resume bullet points";
const CANDIDATE: &str =
    "Rewrite my resume bullet points using strong action verbs and quantified outcomes.";

fn limits() -> TextLimits {
    TextLimits::default()
}

fn busy() -> ToolbarState {
    ToolbarState::Busy {
        kind: TransformKind::Enhance,
        original: ORIGINAL.into(),
    }
}

fn reviewing() -> ToolbarState {
    ToolbarState::Reviewing {
        kind: TransformKind::Enhance,
        original: ORIGINAL.into(),
        candidate: CANDIDATE.into(),
    }
}

fn all_states() -> Vec<ToolbarState> {
    vec![
        ToolbarState::Collapsed,
        ToolbarState::Expanded,
        busy(),
        reviewing(),
    ]
}

fn all_inputs() -> Vec<ToolbarInput> {
    let mut inputs = vec![
        ToolbarInput::Activate,
        ToolbarInput::ClickOutside,
        ToolbarInput::Completed(Ok(CANDIDATE.into())),
        ToolbarInput::Completed(Err(Failure::new(FailureReason::Network, "down"))),
        ToolbarInput::Accept,
        ToolbarInput::Decline,
        ToolbarInput::Close,
    ];
    for action in ToolbarAction::ALL {
        for text in ["hi", ORIGINAL] {
            inputs.push(ToolbarInput::Select {
                action,
                text: text.into(),
            });
        }
    }
    inputs
}

#[test]
fn test_activate_toggles_menu() {
    let t = ToolbarState::Collapsed.apply(ToolbarInput::Activate, &limits());
    assert_eq!(t.next, ToolbarState::Expanded);
    assert!(t.effects.is_empty());

    let t = t.next.apply(ToolbarInput::Activate, &limits());
    assert_eq!(t.next, ToolbarState::Collapsed);
}

#[test]
fn test_click_outside_collapses_expanded() {
    let t = ToolbarState::Expanded.apply(ToolbarInput::ClickOutside, &limits());
    assert_eq!(t.next, ToolbarState::Collapsed);
}

#[test]
fn test_select_sends_trimmed_text() {
    let t = ToolbarState::Expanded.apply(
        ToolbarInput::Select {
            action: ToolbarAction::Enhance,
            text: format!("  {ORIGINAL}\n"),
        },
        &limits(),
    );
    assert_eq!(t.next, busy());
    assert_eq!(
        t.effects,
        vec![Effect::Send {
            kind: TransformKind::Enhance,
            text: ORIGINAL.into()
        }]
    );
}

#[test]
fn test_below_threshold_stays_expanded() {
    let t = ToolbarState::Expanded.apply(
        ToolbarInput::Select {
            action: ToolbarAction::Enhance,
            text: "hi".into(),
        },
        &limits(),
    );
    assert_eq!(t.next, ToolbarState::Expanded);
    assert_eq!(t.effects.len(), 1);
    match &t.effects[0] {
        Effect::Notify(n) => assert_eq!(n.kind, NoticeKind::Validation),
        other => panic!("unexpected effect {other:?}"),
    }
}

#[test]
fn test_short_text_message_names_the_action() {
    for (action, verb) in [
        (ToolbarAction::Enhance, "to enhance"),
        (ToolbarAction::Optimize, "to optimize"),
    ] {
        let t = ToolbarState::Expanded.apply(
            ToolbarInput::Select {
                action,
                text: "hi".into(),
            },
            &limits(),
        );
        assert!(
            matches!(&t.effects[..], [Effect::Notify(n)] if n.message.ends_with(verb)),
            "{action:?}: {:?}",
            t.effects
        );
    }
}

#[test]
fn test_over_limit_stays_expanded() {
    let text = "x".repeat(5001);
    let t = ToolbarState::Expanded.apply(
        ToolbarInput::Select {
            action: ToolbarAction::Optimize,
            text,
        },
        &limits(),
    );
    assert_eq!(t.next, ToolbarState::Expanded);
    assert!(matches!(&t.effects[..], [Effect::Notify(n)] if n.message.contains("5000")));
}

#[test]
fn test_settings_opens_settings() {
    let t = ToolbarState::Expanded.apply(
        ToolbarInput::Select {
            action: ToolbarAction::Settings,
            text: String::new(),
        },
        &limits(),
    );
    assert_eq!(t.next, ToolbarState::Collapsed);
    assert_eq!(t.effects, vec![Effect::OpenSettings]);
}

#[test]
fn test_success_enters_reviewing() {
    let t = busy().apply(ToolbarInput::Completed(Ok(CANDIDATE.into())), &limits());
    assert_eq!(t.next, reviewing());
    assert!(t.effects.is_empty());
}

#[test]
fn test_failure_collapses_with_notice() {
    let t = busy().apply(
        ToolbarInput::Completed(Err(Failure::new(FailureReason::AuthRequired, "no token"))),
        &limits(),
    );
    assert_eq!(t.next, ToolbarState::Collapsed);
    match &t.effects[..] {
        [Effect::Notify(n)] => assert_eq!(n.failure_reason(), Some(FailureReason::AuthRequired)),
        other => panic!("unexpected effects {other:?}"),
    }
}

#[test]
fn test_accept_writes_and_tracks() {
    let t = reviewing().apply(ToolbarInput::Accept, &limits());
    assert_eq!(t.next, ToolbarState::Collapsed);
    assert_eq!(
        t.effects[0],
        Effect::Write {
            text: CANDIDATE.into()
        }
    );
    assert_eq!(
        t.effects[1],
        Effect::Track {
            kind: TransformKind::Enhance,
            before_length: ORIGINAL.chars().count(),
            after_length: CANDIDATE.chars().count(),
        }
    );
    assert!(matches!(&t.effects[2], Effect::Notify(n) if n.kind == NoticeKind::Success));
}

#[test]
fn test_decline_discards_candidate() {
    for input in [ToolbarInput::Decline, ToolbarInput::Close] {
        let t = reviewing().apply(input, &limits());
        assert_eq!(t.next, ToolbarState::Collapsed);
        assert!(t.effects.is_empty());
    }
}

#[test]
fn test_busy_ignores_user_input() {
    for input in [
        ToolbarInput::Activate,
        ToolbarInput::ClickOutside,
        ToolbarInput::Accept,
        ToolbarInput::Decline,
    ] {
        let t = busy().apply(input, &limits());
        assert_eq!(t.next, busy());
        assert!(t.effects.is_empty());
    }
}

#[test]
fn test_reviewing_requires_completed_reply() {
    // The only way into Reviewing is a successful completion while Busy.
    for state in all_states() {
        for input in all_inputs() {
            let was_busy = state.is_busy();
            let is_success = matches!(input, ToolbarInput::Completed(Ok(_)));
            let was_reviewing = matches!(state, ToolbarState::Reviewing { .. });
            let t = state.clone().apply(input, &limits());
            if matches!(t.next, ToolbarState::Reviewing { .. }) {
                assert!(was_reviewing || (was_busy && is_success));
            }
        }
    }
}

#[test]
fn test_totality() {
    // Every state/input pair produces a defined state, and no state is a trap.
    for state in all_states() {
        for input in all_inputs() {
            let _ = state.clone().apply(input, &limits());
        }

        let mut current = state.clone();
        let path = [
            ToolbarInput::Completed(Err(Failure::new(FailureReason::Timeout, "slow"))),
            ToolbarInput::Decline,
            ToolbarInput::Close,
        ];
        for input in path {
            current = current.apply(input, &limits()).next;
        }
        assert!(
            matches!(current, ToolbarState::Collapsed),
            "{} cannot return to collapsed",
            state.name()
        );
    }
}

#[test]
fn test_text_limits() {
    let limits = TextLimits::new(5, 10);
    assert_eq!(limits.check("  hello  "), Ok("hello"));
    assert_eq!(limits.check("hey"), Err(TextRejection::TooShort { min: 5 }));
    assert_eq!(
        limits.check("01234567890"),
        Err(TextRejection::TooLong { max: 10 })
    );
    // Characters, not bytes.
    assert_eq!(limits.check("héllo"), Ok("héllo"));
}
