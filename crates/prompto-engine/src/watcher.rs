//! Mutation watcher: turns surface activity into rescan requests.
//!
//! Mutations are coalesced with a trailing-edge debounce. Regaining
//! visibility schedules a delayed rescan, and the engine's fallback timer
//! checks the location for navigations the observer cannot see.

use std::time::Duration;

use prompto_config::EngineConfig;
use tokio::time::Instant;

use crate::surface::ObserveOptions;

/// Why a rescan happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescanReason {
    Initial,
    Mutation,
    Visibility,
    Fallback,
    Navigation,
}

impl RescanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RescanReason::Initial => "initial",
            RescanReason::Mutation => "mutation",
            RescanReason::Visibility => "visibility",
            RescanReason::Fallback => "fallback",
            RescanReason::Navigation => "navigation",
        }
    }
}

/// Trailing-edge debounce.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Register an event, restarting the quiet period.
    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Consume the pending firing once the quiet period has elapsed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Remembers the last seen document location.
#[derive(Debug, Clone, Default)]
pub struct LocationTracker {
    current: Option<String>,
}

impl LocationTracker {
    /// Record `location`; true if it differs from a previously seen one.
    pub fn observe(&mut self, location: &str) -> bool {
        match &self.current {
            Some(current) if current == location => false,
            Some(_) => {
                self.current = Some(location.to_string());
                true
            }
            None => {
                self.current = Some(location.to_string());
                false
            }
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// Rescan scheduling for one engine.
#[derive(Debug)]
pub struct MutationWatcher {
    options: ObserveOptions,
    debounce: Debouncer,
    visibility_delay: Duration,
    visibility_at: Option<Instant>,
    location: LocationTracker,
}

impl MutationWatcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            options: ObserveOptions::default(),
            debounce: Debouncer::new(config.rescan_debounce()),
            visibility_delay: config.visibility_rescan_delay(),
            visibility_at: None,
            location: LocationTracker::default(),
        }
    }

    pub fn options(&self) -> &ObserveOptions {
        &self.options
    }

    pub fn on_mutation(&mut self, now: Instant) {
        self.debounce.poke(now);
    }

    pub fn on_visibility(&mut self, visible: bool, now: Instant) {
        if visible {
            self.visibility_at = Some(now + self.visibility_delay);
        }
    }

    /// True when the location differs from the last one seen.
    pub fn location_changed(&mut self, location: &str) -> bool {
        self.location.observe(location)
    }

    /// Earliest pending wake-up.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce.deadline(), self.visibility_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Take the rescan that is due at `now`, if any. A due visibility rescan
    /// also absorbs a due mutation rescan.
    pub fn poll(&mut self, now: Instant) -> Option<RescanReason> {
        let mutation = self.debounce.fire(now);
        let visibility = match self.visibility_at {
            Some(at) if at <= now => {
                self.visibility_at = None;
                true
            }
            _ => false,
        };
        match (visibility, mutation) {
            (true, _) => Some(RescanReason::Visibility),
            (false, true) => Some(RescanReason::Mutation),
            (false, false) => None,
        }
    }

    /// Clear all pending timers.
    pub fn cancel(&mut self) {
        self.debounce.cancel();
        self.visibility_at = None;
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
