//! Transient, auto-dismissing notices.

use std::time::Duration;

use prompto_protocols::{Failure, FailureReason};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::surface::{NoticeId, Surface};

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NoticeKind {
    /// Text rejected before anything was sent.
    Validation,
    /// A transformation failed.
    Failure { reason: FailureReason },
    Success,
}

/// A message shown to the user on the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(flatten)]
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Validation,
            message: message.into(),
        }
    }

    /// User-facing notice for a failed call; the text depends only on the reason.
    pub fn failure(failure: &Failure) -> Self {
        Self {
            kind: NoticeKind::Failure {
                reason: failure.reason,
            },
            message: failure.reason.user_message().to_string(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.kind {
            NoticeKind::Failure { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Tracks shown notices and dismisses them once they expire.
pub struct NoticeBoard {
    ttl: Duration,
    shown: Vec<(NoticeId, Instant)>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            shown: Vec::new(),
        }
    }

    /// Show a notice. Surface failures are logged and otherwise ignored.
    pub async fn show(&mut self, surface: &dyn Surface, notice: &Notice, now: Instant) {
        match surface.show_notice(notice).await {
            Ok(id) => self.shown.push((id, now + self.ttl)),
            Err(e) => debug!(error = %e, "Could not show notice"),
        }
    }

    /// Dismiss every notice whose deadline has passed.
    pub async fn expire(&mut self, surface: &dyn Surface, now: Instant) -> usize {
        let (due, keep): (Vec<_>, Vec<_>) = self
            .shown
            .drain(..)
            .partition(|(_, deadline)| *deadline <= now);
        self.shown = keep;
        for (id, _) in &due {
            if let Err(e) = surface.dismiss_notice(*id).await {
                debug!(notice = %id, error = %e, "Could not dismiss notice");
            }
        }
        due.len()
    }

    /// Dismiss everything.
    pub async fn clear(&mut self, surface: &dyn Surface) {
        for (id, _) in self.shown.drain(..) {
            let _ = surface.dismiss_notice(id).await;
        }
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_notices_are_distinguishable() {
        let auth = Notice::failure(&Failure::new(FailureReason::AuthRequired, "401"));
        let net = Notice::failure(&Failure::new(FailureReason::Network, "refused"));
        assert_ne!(auth.message, net.message);
        assert_eq!(auth.failure_reason(), Some(FailureReason::AuthRequired));
        assert_eq!(Notice::success("done").failure_reason(), None);
    }
}
