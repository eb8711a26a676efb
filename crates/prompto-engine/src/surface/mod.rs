//! The host surface abstraction.
//!
//! The engine never touches a concrete document. Everything it needs from the
//! host page goes through [`Surface`]. Node handles are opaque and
//! non-owning: a handle whose element has been removed simply stops
//! resolving, and the surface is free to forget it.

mod memory;
mod selector;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SurfaceError;
use crate::geometry::{Point, Rect};
use crate::maintainer::ControlView;
use crate::notices::Notice;
use crate::toolbar::ToolbarAction;

pub use memory::{ElementSpec, MemorySurface};
pub use selector::{SelectorList, parse_selector};

/// Opaque handle to a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Handle to a control mounted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(pub u64);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Handle to a notice shown on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeId(pub u64);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Snapshot of an element, read during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Lowercase tag name.
    pub tag: String,
    /// `contenteditable="true"`.
    pub editable: bool,
    /// False when the element or an ancestor is `display: none`.
    pub displayed: bool,
    pub rect: Rect,
}

impl NodeInfo {
    /// Rendered with a non-zero size.
    pub fn is_visible(&self) -> bool {
        self.displayed && !self.rect.is_empty()
    }

    /// Value-backed form field rather than a rich text region.
    pub fn is_plain_field(&self) -> bool {
        matches!(self.tag.as_str(), "textarea" | "input") && !self.editable
    }
}

/// What the mutation observer should report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    /// Only these attributes count when `attributes` is set.
    pub attribute_filter: Vec<String>,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: true,
            attribute_filter: ["class", "style", "hidden", "contenteditable", "aria-hidden"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// User interaction with a mounted control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "kebab-case")]
pub enum ControlIntent {
    /// Click or keyboard activation of the trigger.
    Activate,
    Select { action: ToolbarAction },
    Accept,
    Decline,
    Close,
}

/// Something that happened on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceEvent {
    /// Descendant insertion/removal or a watched attribute change.
    Mutation,
    Visibility { visible: bool },
    Scroll,
    Resize,
    /// Location changed without a full reload.
    Navigated { location: String },
    /// Pointer pressed anywhere on the page.
    Pointer { point: Point },
    Control { control: ControlId, intent: ControlIntent },
    /// The surface is gone; no further events follow.
    Closed,
}

/// Access to a live host surface.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Current document location.
    async fn location(&self) -> Result<String, SurfaceError>;

    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, SurfaceError>;

    /// Describe an element, or `None` once it is detached.
    async fn describe(&self, node: NodeId) -> Result<Option<NodeInfo>, SurfaceError>;

    /// Containment check against the document root.
    async fn is_connected(&self, node: NodeId) -> Result<bool, SurfaceError>;

    /// Current bounding rectangle, or `None` once detached.
    async fn bounding_rect(&self, node: NodeId) -> Result<Option<Rect>, SurfaceError>;

    /// Value of a form field.
    async fn read_value(&self, node: NodeId) -> Result<String, SurfaceError>;

    async fn write_value(&self, node: NodeId, text: &str) -> Result<(), SurfaceError>;

    /// Text content of a rich region.
    async fn read_text(&self, node: NodeId) -> Result<String, SurfaceError>;

    async fn write_text(&self, node: NodeId, text: &str) -> Result<(), SurfaceError>;

    /// Dispatch a synthetic bubbling event such as `input`.
    async fn dispatch_event(&self, node: NodeId, event: &str) -> Result<(), SurfaceError>;

    async fn focus(&self, node: NodeId) -> Result<(), SurfaceError>;

    /// Mount a new control for `anchor`.
    async fn mount_control(&self, anchor: NodeId) -> Result<ControlId, SurfaceError>;

    /// Position, style and content of a mounted control.
    async fn render_control(&self, control: ControlId, view: &ControlView)
    -> Result<(), SurfaceError>;

    async fn remove_control(&self, control: ControlId) -> Result<(), SurfaceError>;

    async fn show_notice(&self, notice: &Notice) -> Result<NoticeId, SurfaceError>;

    async fn dismiss_notice(&self, notice: NoticeId) -> Result<(), SurfaceError>;

    /// Start reporting events.
    async fn observe(
        &self,
        options: &ObserveOptions,
    ) -> Result<mpsc::UnboundedReceiver<SurfaceEvent>, SurfaceError>;

    /// Stop reporting events and drop listeners.
    async fn disconnect(&self) -> Result<(), SurfaceError>;
}
