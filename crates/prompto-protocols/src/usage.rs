//! Usage counters maintained by the background coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transform::TransformKind;

/// Monotonic usage statistics.
///
/// Only the coordinator mutates these; popup and dashboard surfaces read them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    #[serde(default)]
    pub enhancements: u64,
    #[serde(default)]
    pub optimizations: u64,
    #[serde(default)]
    pub accepted: u64,
    /// Running estimate of characters removed by transformations.
    #[serde(default)]
    pub chars_saved: u64,
    #[serde(default)]
    pub seconds_saved: u64,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

impl UsageCounters {
    /// Record one successful transformation.
    pub fn record_transform(&mut self, kind: TransformKind, before_len: usize, after_len: usize) {
        match kind {
            TransformKind::Enhance => self.enhancements += 1,
            TransformKind::Optimize => self.optimizations += 1,
        }
        self.chars_saved += before_len.saturating_sub(after_len) as u64;
        self.seconds_saved += kind.seconds_saved();
        self.last_used = Some(Utc::now());
    }

    /// Record that the user accepted a suggestion.
    pub fn record_acceptance(&mut self) {
        self.accepted += 1;
        self.last_used = Some(Utc::now());
    }

    /// Total transformations of either kind.
    pub fn total(&self) -> u64 {
        self.enhancements + self.optimizations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_enhance() {
        let mut counters = UsageCounters::default();
        counters.record_transform(TransformKind::Enhance, 28, 83);
        assert_eq!(counters.enhancements, 1);
        assert_eq!(counters.optimizations, 0);
        assert_eq!(counters.chars_saved, 0);
        assert_eq!(counters.seconds_saved, 30);
        assert!(counters.last_used.is_some());
    }

    #[test]
    fn test_record_optimize_saves_chars() {
        let mut counters = UsageCounters::default();
        counters.record_transform(TransformKind::Optimize, 120, 80);
        counters.record_transform(TransformKind::Optimize, 50, 45);
        assert_eq!(counters.optimizations, 2);
        assert_eq!(counters.chars_saved, 45);
        assert_eq!(counters.seconds_saved, 30);
        assert_eq!(counters.total(), 2);
    }

    #[test]
    fn test_missing_fields_default() {
        let counters: UsageCounters = serde_json::from_str(r#"{"enhancements":3}"#).unwrap();
        assert_eq!(counters.enhancements, 3);
        assert_eq!(counters.accepted, 0);
        assert!(counters.last_used.is_none());
    }
}
