//! Surface attachment and lifecycle engine.
//!
//! Finds a host page's prompt input, attaches exactly one toolbar control to
//! it, keeps the control positioned and on top while the host re-renders,
//! and routes toolbar actions through the [`MessageBridge`] to the
//! background coordinator.
//!
//! ```text
//!  SurfaceEvent ──▶ MutationWatcher ──▶ ElementLocator ──▶ AttachmentRegistry
//!                                                            │
//!            PositionMaintainer ◀── maintenance tick ────────┤
//!                                                            ▼
//!                         MessageBridge ◀── Effect ── ToolbarState
//! ```
//!
//! [`MessageBridge`]: prompto_bridge::MessageBridge

mod adapter;
mod engine;
mod error;
mod geometry;
mod locator;
mod maintainer;
mod notices;
mod profile;
mod registry;
mod surface;
mod toolbar;
mod watcher;

pub use adapter::{InputAdapter, WRITE_EVENTS};
pub use engine::{Completion, EngineHandle, EngineStats, SurfaceEngine};
pub use error::SurfaceError;
pub use geometry::{Point, Rect};
pub use locator::{Candidate, ElementLocator};
pub use maintainer::{
    ALWAYS_ON_TOP, ActionButton, ControlLayout, ControlView, PositionMaintainer, StackingStyle,
};
pub use notices::{Notice, NoticeBoard, NoticeKind};
pub use profile::{
    DiscoveryRule, MIN_EDITABLE_AREA, PlatformProfile, ProfileRegistry, Strategy,
};
pub use registry::{Attached, AttachmentId, AttachmentRecord, AttachmentRegistry, Liveness, Teardown};
pub use surface::{
    ControlId, ControlIntent, ElementSpec, MemorySurface, NodeId, NodeInfo, NoticeId,
    ObserveOptions, SelectorList, Surface, SurfaceEvent, parse_selector,
};
pub use toolbar::{
    Effect, TextLimits, TextRejection, ToolbarAction, ToolbarInput, ToolbarState, Transition,
};
pub use watcher::{Debouncer, LocationTracker, MutationWatcher, RescanReason};
