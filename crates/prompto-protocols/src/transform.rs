//! Transformation kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote text transformation the user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Rewrite the prompt with prompt-engineering techniques.
    Enhance,
    /// Compress the prompt to save tokens.
    Optimize,
}

impl TransformKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Enhance => "enhance",
            TransformKind::Optimize => "optimize",
        }
    }

    /// Label shown on the toolbar button.
    pub fn label(&self) -> &'static str {
        match self {
            TransformKind::Enhance => "Enhance Prompt",
            TransformKind::Optimize => "Token Optimizer",
        }
    }

    /// Estimated seconds saved for the user by one successful run.
    pub fn seconds_saved(&self) -> u64 {
        match self {
            TransformKind::Enhance => 30,
            TransformKind::Optimize => 15,
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
