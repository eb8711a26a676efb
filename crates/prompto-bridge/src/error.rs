//! Bridge error types.

use std::time::Duration;

use prompto_protocols::FailureReason;
use thiserror::Error;

/// Transport-level failures of a bridge call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No reply within the bounded wait.
    #[error("No reply to {kind} within {timeout:?}")]
    Timeout { kind: &'static str, timeout: Duration },

    /// The receiving context went away.
    #[error("Receiving context disconnected")]
    Disconnected,

    /// This side was torn down while the call was pending.
    #[error("Bridge closed")]
    Closed,
}

impl BridgeError {
    /// Stable reason reported to the caller.
    pub fn reason(&self) -> FailureReason {
        match self {
            BridgeError::Timeout { .. } => FailureReason::Timeout,
            BridgeError::Disconnected | BridgeError::Closed => FailureReason::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        let err = BridgeError::Timeout {
            kind: "enhance-request",
            timeout: Duration::from_secs(35),
        };
        assert_eq!(err.reason(), FailureReason::Timeout);
        assert!(err.to_string().contains("enhance-request"));
        assert_eq!(BridgeError::Disconnected.reason(), FailureReason::Disconnected);
        assert_eq!(BridgeError::Closed.reason(), FailureReason::Disconnected);
    }
}
