//! Per-attachment toolbar state machine.
//!
//! ```text
//!  Collapsed ──activate──▶ Expanded ──select──▶ Busy ──success──▶ Reviewing
//!      ▲  ◀──activate / click outside──┘          │                  │
//!      │                                          │ failure          │ accept / decline / close
//!      └──────────────────────────────────────────┴──────────────────┘
//! ```
//!
//! [`ToolbarState::apply`] is total: every input is defined in every state,
//! and inputs that make no sense in a state leave it unchanged.

use prompto_protocols::{Failure, TransformKind};
use serde::{Deserialize, Serialize};

use crate::notices::Notice;

/// An entry of the expanded menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolbarAction {
    Enhance,
    Optimize,
    Settings,
}

impl ToolbarAction {
    /// Menu order.
    pub const ALL: [ToolbarAction; 3] = [
        ToolbarAction::Enhance,
        ToolbarAction::Optimize,
        ToolbarAction::Settings,
    ];

    pub fn transform_kind(self) -> Option<TransformKind> {
        match self {
            ToolbarAction::Enhance => Some(TransformKind::Enhance),
            ToolbarAction::Optimize => Some(TransformKind::Optimize),
            ToolbarAction::Settings => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolbarAction::Enhance => TransformKind::Enhance.label(),
            ToolbarAction::Optimize => TransformKind::Optimize.label(),
            ToolbarAction::Settings => "Settings",
        }
    }
}

/// Toolbar state of one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ToolbarState {
    #[default]
    Collapsed,
    Expanded,
    /// A transformation request is in flight.
    Busy { kind: TransformKind, original: String },
    /// A completed transformation awaits the user's decision.
    Reviewing {
        kind: TransformKind,
        original: String,
        candidate: String,
    },
}

/// Inputs driving the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarInput {
    /// Trigger clicked or keyboard-activated.
    Activate,
    /// Pointer pressed outside the control and its expansion.
    ClickOutside,
    /// Menu entry chosen; `text` is the anchor's current text.
    Select { action: ToolbarAction, text: String },
    /// Bridge outcome of the pending request.
    Completed(Result<String, Failure>),
    Accept,
    Decline,
    Close,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a transformation request through the bridge.
    Send { kind: TransformKind, text: String },
    OpenSettings,
    Notify(Notice),
    /// Replace the anchor's content.
    Write { text: String },
    /// Report an accepted transformation.
    Track {
        kind: TransformKind,
        before_length: usize,
        after_length: usize,
    },
}

/// Result of applying one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ToolbarState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: ToolbarState) -> Self {
        Self {
            next,
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Why text was rejected before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRejection {
    TooShort { min: usize },
    TooLong { max: usize },
}

impl TextRejection {
    /// User-facing message for a rejected `kind` request.
    pub fn message(&self, kind: TransformKind) -> String {
        match self {
            TextRejection::TooShort { min } => format!("Enter at least {min} characters to {kind}"),
            TextRejection::TooLong { max } => format!("Text too long (max {max} characters)"),
        }
    }
}

/// Accepted text length, in characters after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            min_chars: 5,
            max_chars: 5000,
        }
    }
}

impl TextLimits {
    pub fn new(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars,
        }
    }

    /// Trim `text` and check its length.
    pub fn check<'a>(&self, text: &'a str) -> Result<&'a str, TextRejection> {
        let trimmed = text.trim();
        let len = trimmed.chars().count();
        if len < self.min_chars {
            Err(TextRejection::TooShort {
                min: self.min_chars,
            })
        } else if len > self.max_chars {
            Err(TextRejection::TooLong {
                max: self.max_chars,
            })
        } else {
            Ok(trimmed)
        }
    }
}

impl ToolbarState {
    pub fn name(&self) -> &'static str {
        match self {
            ToolbarState::Collapsed => "collapsed",
            ToolbarState::Expanded => "expanded",
            ToolbarState::Busy { .. } => "busy",
            ToolbarState::Reviewing { .. } => "reviewing",
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, ToolbarState::Expanded)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ToolbarState::Busy { .. })
    }

    /// Apply one input and return the next state with its effects.
    pub fn apply(self, input: ToolbarInput, limits: &TextLimits) -> Transition {
        use ToolbarInput as I;
        use ToolbarState as S;

        match (self, input) {
            (S::Collapsed, I::Activate) => Transition::to(S::Expanded),
            (S::Expanded, I::Activate | I::ClickOutside | I::Close) => {
                Transition::to(S::Collapsed)
            }
            (S::Expanded, I::Select { action, text }) => match action.transform_kind() {
                None => Transition::to(S::Collapsed).with(Effect::OpenSettings),
                Some(kind) => match limits.check(&text) {
                    Ok(trimmed) => Transition::to(S::Busy {
                        kind,
                        original: trimmed.to_string(),
                    })
                    .with(Effect::Send {
                        kind,
                        text: trimmed.to_string(),
                    }),
                    Err(rejection) => Transition::to(S::Expanded)
                        .with(Effect::Notify(Notice::validation(rejection.message(kind)))),
                },
            },
            (S::Busy { kind, original }, I::Completed(Ok(candidate))) => {
                Transition::to(S::Reviewing {
                    kind,
                    original,
                    candidate,
                })
            }
            (S::Busy { .. }, I::Completed(Err(failure))) => {
                Transition::to(S::Collapsed).with(Effect::Notify(Notice::failure(&failure)))
            }
            (
                S::Reviewing {
                    kind,
                    original,
                    candidate,
                },
                I::Accept,
            ) => {
                let before_length = original.chars().count();
                let after_length = candidate.chars().count();
                // The write goes first: nothing after it runs if it fails.
                Transition::to(S::Collapsed)
                    .with(Effect::Write { text: candidate })
                    .with(Effect::Track {
                        kind,
                        before_length,
                        after_length,
                    })
                    .with(Effect::Notify(Notice::success(accepted_message(kind))))
            }
            (S::Reviewing { .. }, I::Decline | I::Close) => Transition::to(S::Collapsed),
            // Everything else is ignored in the current state.
            (state, _) => Transition::to(state),
        }
    }
}

fn accepted_message(kind: TransformKind) -> &'static str {
    match kind {
        TransformKind::Enhance => "Prompt enhanced!",
        TransformKind::Optimize => "Prompt optimized!",
    }
}

#[cfg(test)]
#[path = "toolbar_tests.rs"]
mod tests;
