//! Reading and writing the text of an anchor element.

use crate::error::SurfaceError;
use crate::surface::{NodeId, NodeInfo, Surface};

/// Events dispatched after every write so the host framework notices.
pub const WRITE_EVENTS: [&str; 2] = ["input", "change"];

/// Shape of the host's input widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAdapter {
    /// Value-backed field (`textarea`, `input`).
    PlainField,
    /// Rich editable region, read and written as text content.
    RichRegion,
    /// Choose per element.
    Detect,
}

impl InputAdapter {
    /// Settle `Detect` into a concrete adapter for this element.
    pub fn resolve(self, info: &NodeInfo) -> InputAdapter {
        match self {
            InputAdapter::Detect if info.is_plain_field() => InputAdapter::PlainField,
            InputAdapter::Detect => InputAdapter::RichRegion,
            other => other,
        }
    }

    async fn concrete(self, surface: &dyn Surface, node: NodeId) -> Result<Self, SurfaceError> {
        match self {
            InputAdapter::Detect => match surface.describe(node).await? {
                Some(info) => Ok(self.resolve(&info)),
                None => Err(SurfaceError::Detached(node)),
            },
            other => Ok(other),
        }
    }

    pub async fn read(self, surface: &dyn Surface, node: NodeId) -> Result<String, SurfaceError> {
        match self.concrete(surface, node).await? {
            InputAdapter::PlainField => surface.read_value(node).await,
            _ => surface.read_text(node).await,
        }
    }

    /// Replace the element's content, notify the host, then focus it.
    pub async fn write(
        self,
        surface: &dyn Surface,
        node: NodeId,
        text: &str,
    ) -> Result<(), SurfaceError> {
        match self.concrete(surface, node).await? {
            InputAdapter::PlainField => surface.write_value(node, text).await?,
            _ => surface.write_text(node, text).await?,
        }
        for event in WRITE_EVENTS {
            surface.dispatch_event(node, event).await?;
        }
        self.focus(surface, node).await
    }

    pub async fn focus(self, surface: &dyn Surface, node: NodeId) -> Result<(), SurfaceError> {
        surface.focus(node).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::surface::{ElementSpec, MemorySurface};

    fn info(tag: &str, editable: bool) -> NodeInfo {
        NodeInfo {
            tag: tag.into(),
            editable,
            displayed: true,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn test_resolve_detect() {
        let detect = InputAdapter::Detect;
        assert_eq!(detect.resolve(&info("textarea", false)), InputAdapter::PlainField);
        assert_eq!(detect.resolve(&info("input", false)), InputAdapter::PlainField);
        assert_eq!(detect.resolve(&info("div", true)), InputAdapter::RichRegion);
        assert_eq!(
            InputAdapter::RichRegion.resolve(&info("textarea", false)),
            InputAdapter::RichRegion
        );
    }

    #[tokio::test]
    async fn test_write_notifies_then_focuses() {
        let surface = MemorySurface::new("https://chatgpt.com/");
        let node = surface.add(ElementSpec::new("textarea").value("old text"));

        let adapter = InputAdapter::Detect;
        assert_eq!(adapter.read(&surface, node).await.unwrap(), "old text");
        adapter.write(&surface, node, "new text").await.unwrap();

        assert_eq!(surface.value(node).as_deref(), Some("new text"));
        assert_eq!(surface.dispatched(node), ["input", "change"]);
        assert_eq!(surface.focused(), Some(node));
    }

    #[tokio::test]
    async fn test_rich_region_uses_text_content() {
        let surface = MemorySurface::new("https://claude.ai/");
        let node = surface.add(
            ElementSpec::new("div")
                .attr("contenteditable", "true")
                .text("draft"),
        );

        let adapter = InputAdapter::RichRegion;
        assert_eq!(adapter.read(&surface, node).await.unwrap(), "draft");
        adapter.write(&surface, node, "final").await.unwrap();
        assert_eq!(surface.text(node).as_deref(), Some("final"));
    }

    #[tokio::test]
    async fn test_detached_element() {
        let surface = MemorySurface::new("https://chatgpt.com/");
        let node = surface.add(ElementSpec::new("textarea"));
        surface.remove(node);

        let err = InputAdapter::Detect.read(&surface, node).await.unwrap_err();
        assert_eq!(err, SurfaceError::Detached(node));
    }
}
