//! In-memory surface.
//!
//! A flat document of elements in insertion order, matched with the compound
//! selector engine. It records everything the engine does to it so tests can
//! inspect mounted controls, writes, dispatched events and notices.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::selector::{SelectorTarget, parse_selector};
use super::{
    ControlId, ControlIntent, NodeId, NodeInfo, NoticeId, ObserveOptions, Surface, SurfaceEvent,
};
use crate::error::SurfaceError;
use crate::geometry::{Point, Rect};
use crate::maintainer::ControlView;
use crate::notices::Notice;

/// Description of an element to insert.
#[derive(Debug, Clone)]
pub struct ElementSpec {
    tag: String,
    attrs: BTreeMap<String, String>,
    value: String,
    text: String,
    rect: Rect,
    displayed: bool,
}

impl ElementSpec {
    /// A visible element with a prompt-box sized rectangle.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            value: String::new(),
            text: String::new(),
            rect: Rect::new(200.0, 600.0, 640.0, 56.0),
            displayed: true,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    /// `display: none`.
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }
}

#[derive(Debug)]
struct Element {
    spec: ElementSpec,
    connected: bool,
    dispatched: Vec<String>,
}

impl SelectorTarget for Element {
    fn tag(&self) -> &str {
        &self.spec.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.spec.attrs.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
struct MountedControl {
    anchor: NodeId,
    view: Option<ControlView>,
    renders: u64,
}

#[derive(Default)]
struct Document {
    location: String,
    elements: BTreeMap<NodeId, Element>,
    next_node: u64,
    controls: HashMap<ControlId, MountedControl>,
    next_control: u64,
    removals: HashMap<ControlId, u32>,
    notices: BTreeMap<NoticeId, Notice>,
    notice_log: Vec<Notice>,
    next_notice: u64,
    focused: Option<NodeId>,
    queries: u64,
    observer: Option<(mpsc::UnboundedSender<SurfaceEvent>, ObserveOptions)>,
}

impl Document {
    fn live(&self, node: NodeId) -> Result<&Element, SurfaceError> {
        self.elements
            .get(&node)
            .filter(|e| e.connected)
            .ok_or(SurfaceError::Detached(node))
    }

    fn live_mut(&mut self, node: NodeId) -> Result<&mut Element, SurfaceError> {
        self.elements
            .get_mut(&node)
            .filter(|e| e.connected)
            .ok_or(SurfaceError::Detached(node))
    }

    fn notify_child_list(&self) {
        if let Some((tx, options)) = &self.observer {
            if options.child_list {
                let _ = tx.send(SurfaceEvent::Mutation);
            }
        }
    }

    fn notify_attribute(&self, name: &str) {
        if let Some((tx, options)) = &self.observer {
            if options.attributes && options.attribute_filter.iter().any(|a| a == name) {
                let _ = tx.send(SurfaceEvent::Mutation);
            }
        }
    }
}

/// In-memory [`Surface`] implementation.
pub struct MemorySurface {
    doc: Mutex<Document>,
}

impl MemorySurface {
    pub fn new(location: &str) -> Self {
        Self {
            doc: Mutex::new(Document {
                location: location.to_string(),
                ..Default::default()
            }),
        }
    }

    /// Insert an element at the end of the document.
    pub fn add(&self, spec: ElementSpec) -> NodeId {
        let mut doc = self.doc.lock();
        doc.next_node += 1;
        let id = NodeId(doc.next_node);
        doc.elements.insert(
            id,
            Element {
                spec,
                connected: true,
                dispatched: Vec::new(),
            },
        );
        doc.notify_child_list();
        id
    }

    /// Detach an element from the document.
    pub fn remove(&self, node: NodeId) {
        let mut doc = self.doc.lock();
        if let Some(element) = doc.elements.get_mut(&node) {
            element.connected = false;
            doc.notify_child_list();
        }
    }

    /// Detach every element, as a full page replacement does.
    pub fn clear(&self) {
        let mut doc = self.doc.lock();
        for element in doc.elements.values_mut() {
            element.connected = false;
        }
        doc.notify_child_list();
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        let mut doc = self.doc.lock();
        if let Some(element) = doc.elements.get_mut(&node) {
            element.spec.attrs.insert(name.to_string(), value.to_string());
            doc.notify_attribute(name);
        }
    }

    pub fn set_displayed(&self, node: NodeId, displayed: bool) {
        let mut doc = self.doc.lock();
        if let Some(element) = doc.elements.get_mut(&node) {
            element.spec.displayed = displayed;
            doc.notify_attribute("style");
        }
    }

    /// Move or resize an element. Layout changes are not mutations.
    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(element) = self.doc.lock().elements.get_mut(&node) {
            element.spec.rect = rect;
        }
    }

    /// Type into a field as a user would.
    pub fn set_value(&self, node: NodeId, value: &str) {
        if let Some(element) = self.doc.lock().elements.get_mut(&node) {
            element.spec.value = value.to_string();
        }
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        if let Some(element) = self.doc.lock().elements.get_mut(&node) {
            element.spec.text = text.to_string();
        }
    }

    /// Change the location without announcing it.
    pub fn set_location(&self, location: &str) {
        self.doc.lock().location = location.to_string();
    }

    /// Deliver an event to the observer, if any.
    pub fn emit(&self, event: SurfaceEvent) -> bool {
        match &self.doc.lock().observer {
            Some((tx, _)) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn click(&self, control: ControlId, intent: ControlIntent) -> bool {
        self.emit(SurfaceEvent::Control { control, intent })
    }

    pub fn pointer(&self, point: Point) -> bool {
        self.emit(SurfaceEvent::Pointer { point })
    }

    pub fn value(&self, node: NodeId) -> Option<String> {
        self.doc.lock().elements.get(&node).map(|e| e.spec.value.clone())
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.doc.lock().elements.get(&node).map(|e| e.spec.text.clone())
    }

    /// Synthetic events dispatched on an element, oldest first.
    pub fn dispatched(&self, node: NodeId) -> Vec<String> {
        self.doc
            .lock()
            .elements
            .get(&node)
            .map(|e| e.dispatched.clone())
            .unwrap_or_default()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.doc.lock().focused
    }

    /// Controls currently mounted.
    pub fn mounted_controls(&self) -> usize {
        self.doc.lock().controls.len()
    }

    /// Controls currently mounted for `anchor`.
    pub fn controls_for(&self, anchor: NodeId) -> Vec<ControlId> {
        let doc = self.doc.lock();
        let mut ids: Vec<ControlId> = doc
            .controls
            .iter()
            .filter(|(_, c)| c.anchor == anchor)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Last view rendered for a control.
    pub fn control_view(&self, control: ControlId) -> Option<ControlView> {
        self.doc
            .lock()
            .controls
            .get(&control)
            .and_then(|c| c.view.clone())
    }

    pub fn render_count(&self, control: ControlId) -> u64 {
        self.doc
            .lock()
            .controls
            .get(&control)
            .map_or(0, |c| c.renders)
    }

    /// How many times a control was removed.
    pub fn removal_count(&self, control: ControlId) -> u32 {
        self.doc
            .lock()
            .removals
            .get(&control)
            .copied()
            .unwrap_or_default()
    }

    /// Notices currently displayed.
    pub fn visible_notices(&self) -> Vec<Notice> {
        self.doc.lock().notices.values().cloned().collect()
    }

    /// Every notice ever shown.
    pub fn notice_log(&self) -> Vec<Notice> {
        self.doc.lock().notice_log.clone()
    }

    /// Number of selector queries served.
    pub fn query_count(&self) -> u64 {
        self.doc.lock().queries
    }

    pub fn is_observed(&self) -> bool {
        self.doc.lock().observer.is_some()
    }
}

#[async_trait]
impl Surface for MemorySurface {
    async fn location(&self) -> Result<String, SurfaceError> {
        Ok(self.doc.lock().location.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, SurfaceError> {
        let parsed = parse_selector(selector).map_err(|message| SurfaceError::InvalidSelector {
            selector: selector.to_string(),
            message,
        })?;
        let mut doc = self.doc.lock();
        doc.queries += 1;
        Ok(doc
            .elements
            .iter()
            .filter(|(_, e)| e.connected && parsed.matches(*e))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn describe(&self, node: NodeId) -> Result<Option<NodeInfo>, SurfaceError> {
        let doc = self.doc.lock();
        Ok(doc.live(node).ok().map(|e| NodeInfo {
            tag: e.spec.tag.clone(),
            editable: e.attr("contenteditable") == Some("true"),
            displayed: e.spec.displayed,
            rect: e.spec.rect,
        }))
    }

    async fn is_connected(&self, node: NodeId) -> Result<bool, SurfaceError> {
        Ok(self.doc.lock().live(node).is_ok())
    }

    async fn bounding_rect(&self, node: NodeId) -> Result<Option<Rect>, SurfaceError> {
        Ok(self.doc.lock().live(node).ok().map(|e| e.spec.rect))
    }

    async fn read_value(&self, node: NodeId) -> Result<String, SurfaceError> {
        Ok(self.doc.lock().live(node)?.spec.value.clone())
    }

    async fn write_value(&self, node: NodeId, text: &str) -> Result<(), SurfaceError> {
        self.doc.lock().live_mut(node)?.spec.value = text.to_string();
        Ok(())
    }

    async fn read_text(&self, node: NodeId) -> Result<String, SurfaceError> {
        Ok(self.doc.lock().live(node)?.spec.text.clone())
    }

    async fn write_text(&self, node: NodeId, text: &str) -> Result<(), SurfaceError> {
        self.doc.lock().live_mut(node)?.spec.text = text.to_string();
        Ok(())
    }

    async fn dispatch_event(&self, node: NodeId, event: &str) -> Result<(), SurfaceError> {
        self.doc
            .lock()
            .live_mut(node)?
            .dispatched
            .push(event.to_string());
        Ok(())
    }

    async fn focus(&self, node: NodeId) -> Result<(), SurfaceError> {
        let mut doc = self.doc.lock();
        doc.live(node)?;
        doc.focused = Some(node);
        Ok(())
    }

    async fn mount_control(&self, anchor: NodeId) -> Result<ControlId, SurfaceError> {
        let mut doc = self.doc.lock();
        doc.live(anchor)?;
        doc.next_control += 1;
        let id = ControlId(doc.next_control);
        doc.controls.insert(
            id,
            MountedControl {
                anchor,
                view: None,
                renders: 0,
            },
        );
        Ok(id)
    }

    async fn render_control(
        &self,
        control: ControlId,
        view: &ControlView,
    ) -> Result<(), SurfaceError> {
        let mut doc = self.doc.lock();
        let mounted = doc
            .controls
            .get_mut(&control)
            .ok_or(SurfaceError::UnknownControl(control))?;
        mounted.view = Some(view.clone());
        mounted.renders += 1;
        Ok(())
    }

    async fn remove_control(&self, control: ControlId) -> Result<(), SurfaceError> {
        let mut doc = self.doc.lock();
        doc.controls
            .remove(&control)
            .ok_or(SurfaceError::UnknownControl(control))?;
        *doc.removals.entry(control).or_default() += 1;
        Ok(())
    }

    async fn show_notice(&self, notice: &Notice) -> Result<NoticeId, SurfaceError> {
        let mut doc = self.doc.lock();
        doc.next_notice += 1;
        let id = NoticeId(doc.next_notice);
        doc.notices.insert(id, notice.clone());
        doc.notice_log.push(notice.clone());
        Ok(id)
    }

    async fn dismiss_notice(&self, notice: NoticeId) -> Result<(), SurfaceError> {
        self.doc
            .lock()
            .notices
            .remove(&notice)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownNotice(notice))
    }

    async fn observe(
        &self,
        options: &ObserveOptions,
    ) -> Result<mpsc::UnboundedReceiver<SurfaceEvent>, SurfaceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.doc.lock().observer = Some((tx, options.clone()));
        Ok(rx)
    }

    async fn disconnect(&self) -> Result<(), SurfaceError> {
        self.doc.lock().observer = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
