//! The surface engine.
//!
//! One engine drives one surface. It runs as a single task that handles
//! surface events, timer ticks and bridge completions one at a time. Bridge
//! calls run on their own tasks and post their outcome back to the engine's
//! inbox, so the loop never waits on the network.

use std::sync::Arc;

use prompto_bridge::MessageBridge;
use prompto_config::EngineConfig;
use prompto_protocols::{BridgeRequest, Failure, FailureReason, ReplyPayload, TransformKind};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::SurfaceError;
use crate::maintainer::PositionMaintainer;
use crate::notices::{Notice, NoticeBoard};
use crate::profile::{PlatformProfile, ProfileRegistry};
use crate::registry::{Attached, AttachmentId, AttachmentRegistry, Liveness};
use crate::locator::ElementLocator;
use crate::surface::{ControlIntent, Surface, SurfaceEvent};
use crate::toolbar::{Effect, TextLimits, ToolbarInput};
use crate::watcher::{MutationWatcher, RescanReason};

const WRITE_FAILED: &str = "The input field is no longer available - nothing was changed";

/// Outcome of a transformation request, posted back to the engine.
#[derive(Debug)]
pub struct Completion {
    pub attachment: AttachmentId,
    liveness: Liveness,
    pub result: Result<String, Failure>,
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub scans: u64,
    pub attached: u64,
    pub torn_down: u64,
    pub requests_sent: u64,
    /// Replies that arrived for attachments that no longer exist.
    pub discarded_replies: u64,
}

/// Attachment and lifecycle engine for one surface.
pub struct SurfaceEngine {
    surface: Arc<dyn Surface>,
    bridge: Arc<MessageBridge>,
    profiles: Arc<ProfileRegistry>,
    config: EngineConfig,
    limits: TextLimits,
    locator: ElementLocator,
    registry: AttachmentRegistry,
    watcher: MutationWatcher,
    maintainer: PositionMaintainer,
    notices: NoticeBoard,
    inbox_tx: mpsc::UnboundedSender<Completion>,
    inbox_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    events: Option<mpsc::UnboundedReceiver<SurfaceEvent>>,
    stats: EngineStats,
}

impl SurfaceEngine {
    pub fn new(
        surface: Arc<dyn Surface>,
        bridge: Arc<MessageBridge>,
        profiles: Arc<ProfileRegistry>,
        config: EngineConfig,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            locator: ElementLocator::new(profiles.generic(), config.scan_policy),
            limits: TextLimits::new(config.min_text_chars, config.max_text_chars),
            watcher: MutationWatcher::new(&config),
            notices: NoticeBoard::new(config.notice_dismiss()),
            maintainer: PositionMaintainer::default(),
            registry: AttachmentRegistry::new(),
            surface,
            bridge,
            profiles,
            config,
            inbox_tx,
            inbox_rx: Some(inbox_rx),
            events: None,
            stats: EngineStats::default(),
        }
    }

    pub fn profile(&self) -> &PlatformProfile {
        self.locator.profile()
    }

    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            torn_down: self.registry.torn_down(),
            ..self.stats
        }
    }

    /// Pick the profile, start observing and run the first scan.
    pub async fn start(&mut self) -> Result<(), SurfaceError> {
        let location = self.surface.location().await?;
        self.watcher.location_changed(&location);
        self.select_profile(&location);

        self.events = Some(self.surface.observe(self.watcher.options()).await?);
        self.rescan(RescanReason::Initial).await;
        Ok(())
    }

    fn select_profile(&mut self, location: &str) {
        let profile = self.profiles.resolve_location(location);
        info!(profile = %profile.id, location, "Using platform profile");
        self.locator = ElementLocator::new(profile, self.config.scan_policy);
    }

    /// Look for new anchors and attach to them. Returns how many were attached.
    pub async fn rescan(&mut self, reason: RescanReason) -> usize {
        self.stats.scans += 1;
        let candidates = self.locator.scan(&*self.surface, &self.registry).await;
        trace!(reason = reason.as_str(), candidates = candidates.len(), "Rescan");

        let mut attached = 0;
        for candidate in &candidates {
            match self.registry.attach(&*self.surface, candidate).await {
                Ok(Attached::New(id)) => {
                    attached += 1;
                    self.stats.attached += 1;
                    if let Some(record) = self.registry.get_mut(id) {
                        if let Ok(false) = self.maintainer.place(&*self.surface, record).await {
                            debug!(attachment = %id, "Anchor vanished while attaching");
                        }
                    }
                }
                Ok(Attached::Existing(_)) => {}
                Err(e) => debug!(anchor = %candidate.anchor, error = %e, "Attach failed"),
            }
        }
        attached
    }

    /// Stale-anchor sweep, position refresh and notice expiry.
    pub async fn maintenance_tick(&mut self) {
        self.registry.detach_stale(&*self.surface).await;
        self.refresh_positions().await;
        self.notices.expire(&*self.surface, Instant::now()).await;
    }

    async fn refresh_positions(&mut self) {
        let stale = self.maintainer.refresh(&*self.surface, &mut self.registry).await;
        for id in stale {
            self.registry.detach(&*self.surface, id).await;
        }
    }

    /// Safety-net scan, also catching navigations the observer missed.
    pub async fn fallback_check(&mut self) {
        match self.surface.location().await {
            Ok(location) if self.watcher.location_changed(&location) => {
                self.navigate(&location).await;
            }
            Ok(_) => {
                self.rescan(RescanReason::Fallback).await;
            }
            Err(e) => debug!(error = %e, "Location check failed"),
        }
    }

    /// Drop every attachment and start over on a new location.
    pub async fn navigate(&mut self, location: &str) {
        let dropped = self.registry.detach_all(&*self.surface).await;
        info!(location, dropped, "Surface navigated");
        self.watcher.cancel();
        self.select_profile(location);
        self.rescan(RescanReason::Navigation).await;
    }

    /// Run a due watcher rescan, if any.
    pub async fn poll_watcher(&mut self) {
        if let Some(reason) = self.watcher.poll(Instant::now()) {
            self.rescan(reason).await;
        }
    }

    /// Handle one surface event. Returns false once the surface closed.
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> bool {
        let now = Instant::now();
        match event {
            SurfaceEvent::Mutation => self.watcher.on_mutation(now),
            SurfaceEvent::Visibility { visible } => self.watcher.on_visibility(visible, now),
            SurfaceEvent::Scroll | SurfaceEvent::Resize => self.refresh_positions().await,
            SurfaceEvent::Navigated { location } => {
                if self.watcher.location_changed(&location) {
                    self.navigate(&location).await;
                }
            }
            SurfaceEvent::Pointer { point } => {
                let outside: Vec<AttachmentId> = self
                    .registry
                    .iter()
                    .filter(|r| r.state.is_expanded())
                    .filter(|r| r.layout.as_ref().is_none_or(|l| !l.contains(point)))
                    .map(|r| r.id)
                    .collect();
                for id in outside {
                    self.apply(id, ToolbarInput::ClickOutside).await;
                }
            }
            SurfaceEvent::Control { control, intent } => {
                let Some(id) = self.registry.by_control(control) else {
                    debug!(control = %control, "Ignoring event for detached control");
                    return true;
                };
                self.handle_intent(id, intent).await;
            }
            SurfaceEvent::Closed => return false,
        }
        true
    }

    async fn handle_intent(&mut self, id: AttachmentId, intent: ControlIntent) {
        let input = match intent {
            ControlIntent::Activate => ToolbarInput::Activate,
            ControlIntent::Accept => ToolbarInput::Accept,
            ControlIntent::Decline => ToolbarInput::Decline,
            ControlIntent::Close => ToolbarInput::Close,
            ControlIntent::Select { action } => {
                let text = match action.transform_kind() {
                    Some(_) => match self.read_anchor(id).await {
                        Some(text) => text,
                        None => return,
                    },
                    None => String::new(),
                };
                ToolbarInput::Select { action, text }
            }
        };
        self.apply(id, input).await;
    }

    /// Read the anchor's text; a detached anchor is torn down instead.
    async fn read_anchor(&mut self, id: AttachmentId) -> Option<String> {
        let (anchor, adapter) = {
            let record = self.registry.get(id)?;
            (record.anchor, record.adapter)
        };
        match adapter.read(&*self.surface, anchor).await {
            Ok(text) => Some(text),
            Err(SurfaceError::Detached(_)) => {
                self.registry.detach(&*self.surface, id).await;
                None
            }
            Err(e) => {
                warn!(attachment = %id, error = %e, "Could not read anchor text");
                None
            }
        }
    }

    /// Feed one input to an attachment's toolbar and carry out the effects.
    pub async fn apply(&mut self, id: AttachmentId, input: ToolbarInput) {
        let Some(record) = self.registry.get_mut(id) else {
            return;
        };
        let before = record.state.name();
        let transition = std::mem::take(&mut record.state).apply(input, &self.limits);
        record.state = transition.next;
        debug!(attachment = %id, from = before, to = record.state.name(), "Toolbar transition");

        if let Ok(false) = self.maintainer.place(&*self.surface, record).await {
            debug!(attachment = %id, "Anchor gone during transition");
        }

        for effect in transition.effects {
            if !self.run_effect(id, effect).await {
                break;
            }
        }
    }

    /// Carry out one effect. Returns false when the effects after it must not run.
    async fn run_effect(&mut self, id: AttachmentId, effect: Effect) -> bool {
        match effect {
            Effect::Send { kind, text } => self.send_transform(id, kind, text),
            Effect::OpenSettings => self.fire_and_forget(BridgeRequest::OpenSettings),
            Effect::Track {
                kind,
                before_length,
                after_length,
            } => self.fire_and_forget(BridgeRequest::TrackEvent {
                kind,
                before_length,
                after_length,
            }),
            Effect::Notify(notice) => {
                self.notices
                    .show(&*self.surface, &notice, Instant::now())
                    .await
            }
            Effect::Write { text } => return self.write_anchor(id, &text).await,
        }
        true
    }

    /// Write accepted text into the anchor. A detached anchor is torn down.
    async fn write_anchor(&mut self, id: AttachmentId, text: &str) -> bool {
        let Some((anchor, adapter)) = self.registry.get(id).map(|r| (r.anchor, r.adapter)) else {
            return false;
        };
        let Err(e) = adapter.write(&*self.surface, anchor, text).await else {
            return true;
        };

        warn!(attachment = %id, error = %e, "Could not write to anchor");
        if matches!(e, SurfaceError::Detached(_)) {
            self.registry.detach(&*self.surface, id).await;
        }
        self.notices
            .show(&*self.surface, &Notice::validation(WRITE_FAILED), Instant::now())
            .await;
        false
    }

    fn send_transform(&mut self, id: AttachmentId, kind: TransformKind, text: String) {
        let Some(record) = self.registry.get(id) else {
            return;
        };
        self.stats.requests_sent += 1;
        let liveness = record.liveness();
        let bridge = self.bridge.clone();
        let inbox = self.inbox_tx.clone();

        tokio::spawn(async move {
            let result = match bridge.call(BridgeRequest::transform(kind, text)).await {
                Ok(ReplyPayload::Transformed { text }) => Ok(text),
                Ok(other) => Err(Failure::new(
                    FailureReason::Server,
                    format!("unexpected reply to {}: {other:?}", kind.as_str()),
                )),
                Err(failure) => Err(failure),
            };
            let _ = inbox.send(Completion {
                attachment: id,
                liveness,
                result,
            });
        });
    }

    fn fire_and_forget(&self, request: BridgeRequest) {
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            let kind = request.kind();
            if let Err(failure) = bridge.call(request).await {
                debug!(kind, reason = %failure.reason, "Bridge notification failed");
            }
        });
    }

    /// Apply a bridge outcome, unless its attachment is gone.
    pub async fn handle_completion(&mut self, completion: Completion) {
        let id = completion.attachment;
        if !completion.liveness.is_alive() || self.registry.get(id).is_none() {
            self.stats.discarded_replies += 1;
            debug!(attachment = %id, "Discarding reply for torn-down attachment");
            return;
        }
        self.apply(id, ToolbarInput::Completed(completion.result)).await;
    }

    /// Wait for and apply the next completion. Returns false if none can arrive.
    pub async fn process_next_completion(&mut self) -> bool {
        let Some(inbox) = self.inbox_rx.as_mut() else {
            return false;
        };
        match inbox.recv().await {
            Some(completion) => {
                self.handle_completion(completion).await;
                true
            }
            None => false,
        }
    }

    /// Tear everything down: timers, listeners, attachments, notices, bridge.
    pub async fn shutdown(&mut self) {
        self.watcher.cancel();
        self.events = None;
        if let Err(e) = self.surface.disconnect().await {
            debug!(error = %e, "Surface disconnect failed");
        }
        let dropped = self.registry.detach_all(&*self.surface).await;
        self.notices.clear(&*self.surface).await;
        self.bridge.close();
        info!(dropped, "Engine stopped");
    }

    /// Run until the surface closes or `shutdown` fires.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> EngineStats {
        if let Err(e) = self.start().await {
            warn!(error = %e, "Engine failed to start");
            self.shutdown().await;
            return self.stats();
        }

        let (Some(mut events), Some(mut inbox)) = (self.events.take(), self.inbox_rx.take()) else {
            self.shutdown().await;
            return self.stats();
        };

        let mut tick = tokio::time::interval(self.config.maintenance_tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let fallback_period = self.config.fallback_scan();
        let mut fallback = tokio::time::interval_at(Instant::now() + fallback_period, fallback_period);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = self.watcher.next_deadline();
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => {
                        if !self.handle_event(event).await {
                            break;
                        }
                    }
                    None => break,
                },
                Some(completion) = inbox.recv() => self.handle_completion(completion).await,
                _ = tick.tick() => self.maintenance_tick().await,
                _ = fallback.tick() => self.fallback_check().await,
                _ = sleep_until(wake) => self.poll_watcher().await,
            }
        }

        self.shutdown().await;
        self.stats()
    }

    /// Run on a new task.
    pub fn spawn(self) -> EngineHandle {
        let (tx, rx) = oneshot::channel();
        EngineHandle {
            shutdown: Some(tx),
            task: tokio::spawn(self.run(rx)),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle to a spawned engine.
pub struct EngineHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<EngineStats>,
}

impl EngineHandle {
    /// Stop the engine and wait for its teardown.
    pub async fn stop(mut self) -> EngineStats {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }

    /// Wait for the engine to finish on its own.
    pub async fn wait(&mut self) -> EngineStats {
        match (&mut self.task).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Engine task failed");
                EngineStats::default()
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
