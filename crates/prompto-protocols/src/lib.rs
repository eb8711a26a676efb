//! # Prompto Protocols
//!
//! Types exchanged between the in-page engine and the background coordinator.
//! Contains only data definitions - no transport and no I/O.
//!
//! ## Contents
//!
//! - [`BridgeMessage`] / [`BridgeReply`] - correlated request/response envelope
//! - [`TransformKind`] - the two remote transformations (`enhance`, `optimize`)
//! - [`FailureReason`] - stable failure codes surfaced to the user
//! - [`UsageCounters`] - locally persisted usage statistics
//! - [`Credential`] / [`UserProfile`] - the stored sign-in state

pub mod account;
pub mod bridge;
pub mod failure;
pub mod transform;
pub mod usage;

pub use account::{Credential, UserProfile};
pub use bridge::{BridgeMessage, BridgeOutcome, BridgeReply, BridgeRequest, CorrelationId, ReplyPayload};
pub use failure::{Failure, FailureReason};
pub use transform::TransformKind;
pub use usage::UsageCounters;
