//! Message bridge between the in-page engine and the background coordinator.
//!
//! Every call gets a fresh [`CorrelationId`](prompto_protocols::CorrelationId).
//! The sending side keeps a pending table of one-shot senders keyed by that id;
//! the receive loop resolves an entry at most once and drops every later reply
//! carrying the same id. Calls that outlive the bounded wait, or whose peer
//! disappears, resolve to a failure reply instead of hanging.
//!
//! ```text
//! ┌──────────────┐  BridgeMessage   ┌────────────────┐
//! │ MessageBridge│ ───────────────► │ BridgeEndpoint │
//! │  (engine)    │ ◄─────────────── │ (coordinator)  │
//! └──────────────┘   BridgeReply    └────────────────┘
//! ```

mod bridge;
mod endpoint;
mod error;

pub use bridge::{BridgeStats, MessageBridge};
pub use endpoint::{BridgeEndpoint, ReplySender, RequestHandler};
pub use error::BridgeError;
