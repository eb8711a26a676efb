//! Background coordinator for Prompto.
//!
//! Owns the stored credential and usage counters, talks to the remote
//! transformation API, and answers engine requests arriving over the
//! message bridge.

mod api;
mod coordinator;
mod error;
mod store;

pub use api::{AcceptedEvent, HttpTransformApi, TransformApi};
pub use coordinator::Coordinator;
pub use error::{ApiError, StoreError};
pub use store::{FileStateStore, MemoryStateStore, StateStore, StoredState};
