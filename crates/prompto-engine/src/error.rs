//! Surface error types.

use thiserror::Error;

use crate::surface::{ControlId, NodeId, NoticeId};

/// Errors reported by a [`Surface`](crate::Surface) implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// A discovery selector could not be evaluated.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The node handle no longer resolves to an attached element.
    #[error("Node {0} is detached")]
    Detached(NodeId),

    #[error("Unknown control {0}")]
    UnknownControl(ControlId),

    #[error("Unknown notice {0}")]
    UnknownNotice(NoticeId),

    /// The surface went away (tab closed, connection lost).
    #[error("Surface closed")]
    Closed,

    /// Any other backend failure.
    #[error("Surface backend error: {0}")]
    Backend(String),
}

impl SurfaceError {
    /// Whether the error blames the discovery rule rather than the surface.
    pub fn is_rule_error(&self) -> bool {
        matches!(self, SurfaceError::InvalidSelector { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SurfaceError::InvalidSelector {
            selector: "textarea[".into(),
            message: "unterminated attribute".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid selector 'textarea[': unterminated attribute"
        );
        assert!(err.is_rule_error());
        assert!(!SurfaceError::Detached(NodeId(3)).is_rule_error());
        assert_eq!(SurfaceError::Detached(NodeId(3)).to_string(), "Node n3 is detached");
    }
}
