//! Attachment registry.
//!
//! Maps each located anchor to the control mounted for it. Holds at most
//! one record per anchor and tears records down once their anchor leaves
//! the document.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::adapter::InputAdapter;
use crate::error::SurfaceError;
use crate::geometry::Rect;
use crate::locator::Candidate;
use crate::maintainer::ControlLayout;
use crate::surface::{ControlId, NodeId, Surface};
use crate::toolbar::ToolbarState;

/// Identifier of an attachment, never reused within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Shared flag telling in-flight work whether its attachment still exists.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn kill(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Releases an attachment's resources. Consumed by [`Teardown::run`], so it
/// can only ever run once.
#[derive(Debug)]
pub struct Teardown {
    control: ControlId,
    liveness: Liveness,
}

impl Teardown {
    /// Mark the attachment dead and unmount its control.
    pub async fn run(self, surface: &dyn Surface) {
        self.liveness.kill();
        if let Err(e) = surface.remove_control(self.control).await {
            debug!(control = %self.control, error = %e, "Control already gone");
        }
    }
}

/// An anchor paired with its mounted control.
#[derive(Debug)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    /// Weak reference to the host element.
    pub anchor: NodeId,
    pub control: ControlId,
    /// Adapter resolved for this anchor.
    pub adapter: InputAdapter,
    /// Rank of the rule that found the anchor.
    pub rule: u8,
    pub state: ToolbarState,
    pub last_rect: Option<Rect>,
    pub layout: Option<ControlLayout>,
    liveness: Liveness,
    teardown: Option<Teardown>,
}

impl AttachmentRecord {
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }
}

/// Outcome of [`AttachmentRegistry::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attached {
    New(AttachmentId),
    /// The anchor was already registered.
    Existing(AttachmentId),
}

impl Attached {
    pub fn id(self) -> AttachmentId {
        match self {
            Attached::New(id) | Attached::Existing(id) => id,
        }
    }
}

/// All live attachments of one engine.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    records: BTreeMap<AttachmentId, AttachmentRecord>,
    by_anchor: HashMap<NodeId, AttachmentId>,
    by_control: HashMap<ControlId, AttachmentId>,
    next_id: u64,
    torn_down: u64,
}

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a control to a candidate. Idempotent per anchor.
    pub async fn attach(
        &mut self,
        surface: &dyn Surface,
        candidate: &Candidate,
    ) -> Result<Attached, SurfaceError> {
        if let Some(&id) = self.by_anchor.get(&candidate.anchor) {
            return Ok(Attached::Existing(id));
        }

        let control = surface.mount_control(candidate.anchor).await?;
        self.next_id += 1;
        let id = AttachmentId(self.next_id);
        let liveness = Liveness::new();

        self.records.insert(
            id,
            AttachmentRecord {
                id,
                anchor: candidate.anchor,
                control,
                adapter: candidate.adapter,
                rule: candidate.rule,
                state: ToolbarState::Collapsed,
                last_rect: Some(candidate.rect),
                layout: None,
                liveness: liveness.clone(),
                teardown: Some(Teardown { control, liveness }),
            },
        );
        self.by_anchor.insert(candidate.anchor, id);
        self.by_control.insert(control, id);

        info!(attachment = %id, anchor = %candidate.anchor, control = %control, rule = candidate.rule, "Attached control");
        Ok(Attached::New(id))
    }

    /// Tear down one attachment, then forget it.
    pub async fn detach(&mut self, surface: &dyn Surface, id: AttachmentId) -> bool {
        let Some(teardown) = self.records.get_mut(&id).and_then(|r| r.teardown.take()) else {
            return false;
        };
        teardown.run(surface).await;
        self.torn_down += 1;

        if let Some(record) = self.records.remove(&id) {
            self.by_anchor.remove(&record.anchor);
            self.by_control.remove(&record.control);
            debug!(attachment = %id, anchor = %record.anchor, "Detached control");
        }
        true
    }

    /// Tear down every attachment whose anchor left the document.
    pub async fn detach_stale(&mut self, surface: &dyn Surface) -> Vec<AttachmentId> {
        let anchors: Vec<(AttachmentId, NodeId)> =
            self.records.values().map(|r| (r.id, r.anchor)).collect();

        let mut stale = Vec::new();
        for (id, anchor) in anchors {
            match surface.is_connected(anchor).await {
                Ok(true) => {}
                Ok(false) | Err(SurfaceError::Detached(_)) => stale.push(id),
                Err(e) => debug!(attachment = %id, error = %e, "Containment check failed"),
            }
        }

        for id in &stale {
            self.detach(surface, *id).await;
        }
        stale
    }

    /// Tear down everything.
    pub async fn detach_all(&mut self, surface: &dyn Surface) -> usize {
        let ids: Vec<AttachmentId> = self.records.keys().copied().collect();
        let count = ids.len();
        for id in ids {
            self.detach(surface, id).await;
        }
        count
    }

    pub fn contains_anchor(&self, anchor: NodeId) -> bool {
        self.by_anchor.contains_key(&anchor)
    }

    pub fn get(&self, id: AttachmentId) -> Option<&AttachmentRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: AttachmentId) -> Option<&mut AttachmentRecord> {
        self.records.get_mut(&id)
    }

    pub fn by_anchor(&self, anchor: NodeId) -> Option<&AttachmentRecord> {
        self.by_anchor.get(&anchor).and_then(|id| self.records.get(id))
    }

    pub fn by_control(&self, control: ControlId) -> Option<AttachmentId> {
        self.by_control.get(&control).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttachmentRecord> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AttachmentRecord> {
        self.records.values_mut()
    }

    pub fn ids(&self) -> Vec<AttachmentId> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Teardowns run so far.
    pub fn torn_down(&self) -> u64 {
        self.torn_down
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
