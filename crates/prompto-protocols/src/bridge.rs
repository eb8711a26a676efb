//! Correlated request/response envelope between execution contexts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::account::UserProfile;
use crate::failure::{Failure, FailureReason};
use crate::transform::TransformKind;
use crate::usage::UsageCounters;

/// Identifier pairing one request with its single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request kinds sent from the engine (or popup) to the coordinator.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum BridgeRequest {
    #[serde(rename = "enhance-request")]
    Enhance { text: String },
    #[serde(rename = "optimize-request")]
    Optimize { text: String },
    TrackEvent {
        kind: TransformKind,
        before_length: usize,
        after_length: usize,
    },
    GetUsage,
    SignIn { username: String, password: String },
    SignOut,
    GetUser,
    OpenSettings,
    Ping,
}

impl BridgeRequest {
    /// Build the transformation request for `kind`.
    pub fn transform(kind: TransformKind, text: impl Into<String>) -> Self {
        let text = text.into();
        match kind {
            TransformKind::Enhance => BridgeRequest::Enhance { text },
            TransformKind::Optimize => BridgeRequest::Optimize { text },
        }
    }

    /// Wire name of the request kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeRequest::Enhance { .. } => "enhance-request",
            BridgeRequest::Optimize { .. } => "optimize-request",
            BridgeRequest::TrackEvent { .. } => "track-event",
            BridgeRequest::GetUsage => "get-usage",
            BridgeRequest::SignIn { .. } => "sign-in",
            BridgeRequest::SignOut => "sign-out",
            BridgeRequest::GetUser => "get-user",
            BridgeRequest::OpenSettings => "open-settings",
            BridgeRequest::Ping => "ping",
        }
    }

    /// The transformation this request asks for, if any.
    pub fn transform_kind(&self) -> Option<TransformKind> {
        match self {
            BridgeRequest::Enhance { .. } => Some(TransformKind::Enhance),
            BridgeRequest::Optimize { .. } => Some(TransformKind::Optimize),
            _ => None,
        }
    }
}

// Requests may carry passwords and prompt text; log the kind only.
impl fmt::Debug for BridgeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeRequest::Enhance { text } | BridgeRequest::Optimize { text } => f
                .debug_struct(self.kind())
                .field("text_len", &text.chars().count())
                .finish(),
            BridgeRequest::TrackEvent {
                kind,
                before_length,
                after_length,
            } => f
                .debug_struct(self.kind())
                .field("kind", kind)
                .field("before_length", before_length)
                .field("after_length", after_length)
                .finish(),
            BridgeRequest::SignIn { username, .. } => f
                .debug_struct(self.kind())
                .field("username", username)
                .finish_non_exhaustive(),
            _ => f.write_str(self.kind()),
        }
    }
}

/// A request on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub correlation_id: CorrelationId,
    #[serde(flatten)]
    pub request: BridgeRequest,
}

/// Successful reply payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReplyPayload {
    Transformed { text: String },
    Usage { counters: UsageCounters },
    SignedIn { user: UserProfile },
    User { profile: UserProfile },
    Ack,
}

/// Outcome of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BridgeOutcome {
    Success { payload: ReplyPayload },
    Failure(Failure),
}

/// A reply on the wire. Echoes the request's correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub correlation_id: CorrelationId,
    pub outcome: BridgeOutcome,
}

impl BridgeReply {
    pub fn success(correlation_id: CorrelationId, payload: ReplyPayload) -> Self {
        Self {
            correlation_id,
            outcome: BridgeOutcome::Success { payload },
        }
    }

    pub fn failure(
        correlation_id: CorrelationId,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            outcome: BridgeOutcome::Failure(Failure::new(reason, message)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BridgeOutcome::Success { .. })
    }

    /// Split the reply into its payload or failure.
    pub fn into_result(self) -> Result<ReplyPayload, Failure> {
        match self.outcome {
            BridgeOutcome::Success { payload } => Ok(payload),
            BridgeOutcome::Failure(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
