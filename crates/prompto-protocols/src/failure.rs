//! Stable failure codes carried by bridge replies.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a bridge call failed.
///
/// The codes are stable on the wire so the engine can tell an expired
/// sign-in apart from an unreachable backend without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// No stored credential, or the API rejected it.
    AuthRequired,
    /// The API could not be reached.
    Network,
    /// The API answered with a server-side error or an unreadable body.
    Server,
    /// The API asked us to slow down.
    RateLimited,
    /// The call did not complete within its bounded wait.
    Timeout,
    /// The request was rejected before or by the API as malformed.
    InvalidRequest,
    /// The other execution context went away before replying.
    Disconnected,
    /// The receiving context does not handle this message kind.
    Unsupported,
}

impl FailureReason {
    /// Wire code of the reason.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::AuthRequired => "auth-required",
            FailureReason::Network => "network",
            FailureReason::Server => "server",
            FailureReason::RateLimited => "rate-limited",
            FailureReason::Timeout => "timeout",
            FailureReason::InvalidRequest => "invalid-request",
            FailureReason::Disconnected => "disconnected",
            FailureReason::Unsupported => "unsupported",
        }
    }

    /// Human-readable text for a transient notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::AuthRequired => "Please sign in to Prompto to use this feature",
            FailureReason::Network => "Network error - check your connection and the Prompto backend",
            FailureReason::Server => "The Prompto server had a problem - try again shortly",
            FailureReason::RateLimited => "Too many requests - please wait a moment",
            FailureReason::Timeout => "Request timed out - try again",
            FailureReason::InvalidRequest => "The text could not be processed",
            FailureReason::Disconnected => "Extension communication failed - reload the page",
            FailureReason::Unsupported => "This action is not supported",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failed outcome: stable reason plus diagnostic detail.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason}: {message}")]
pub struct Failure {
    pub reason: FailureReason,
    pub message: String,
}

impl Failure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_wire() {
        let reasons = [
            FailureReason::AuthRequired,
            FailureReason::Network,
            FailureReason::Server,
            FailureReason::RateLimited,
            FailureReason::Timeout,
            FailureReason::InvalidRequest,
            FailureReason::Disconnected,
            FailureReason::Unsupported,
        ];
        for reason in reasons {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.code()));
        }
    }

    #[test]
    fn test_auth_and_network_messages_differ() {
        assert_ne!(
            FailureReason::AuthRequired.user_message(),
            FailureReason::Network.user_message()
        );
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::new(FailureReason::Server, "HTTP 502");
        assert_eq!(failure.to_string(), "server: HTTP 502");
    }
}
