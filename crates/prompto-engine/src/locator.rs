//! Element locator.
//!
//! Runs a profile's discovery rules against the surface and returns the
//! visible, unregistered elements they find. A rule that fails to evaluate
//! is disabled for the rest of the session; discovery carries on with the
//! remaining rules.
//!
//! Under [`ScanPolicy::FirstMatch`] a surface carries at most one
//! attachment: nothing is found while one is registered, so a replacement
//! anchor is picked up only after the old one has been detached.

use std::collections::HashSet;
use std::sync::Arc;

use prompto_config::ScanPolicy;
use tracing::{debug, trace, warn};

use crate::adapter::InputAdapter;
use crate::error::SurfaceError;
use crate::geometry::Rect;
use crate::profile::{DiscoveryRule, PlatformProfile, Strategy};
use crate::registry::AttachmentRegistry;
use crate::surface::{NodeId, NodeInfo, Surface};

/// Elements considered by [`Strategy::LargestEditable`].
const EDITABLE_SELECTOR: &str = r#"textarea, [contenteditable="true"]"#;

/// An element worth attaching to.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub anchor: NodeId,
    /// Rank of the rule that produced it.
    pub rule: u8,
    /// Adapter already resolved for this element.
    pub adapter: InputAdapter,
    pub rect: Rect,
}

pub struct ElementLocator {
    profile: Arc<PlatformProfile>,
    policy: ScanPolicy,
    disabled: HashSet<usize>,
}

impl ElementLocator {
    pub fn new(profile: Arc<PlatformProfile>, policy: ScanPolicy) -> Self {
        Self {
            profile,
            policy,
            disabled: HashSet::new(),
        }
    }

    pub fn profile(&self) -> &Arc<PlatformProfile> {
        &self.profile
    }

    /// Rules switched off after failing.
    pub fn disabled_rules(&self) -> usize {
        self.disabled.len()
    }

    /// Find new candidates. Never fails; an empty result means "try later".
    pub async fn scan(
        &mut self,
        surface: &dyn Surface,
        registry: &AttachmentRegistry,
    ) -> Vec<Candidate> {
        if self.policy == ScanPolicy::FirstMatch && !registry.is_empty() {
            return Vec::new();
        }

        let mut found = Vec::new();
        let mut seen = HashSet::new();

        for (index, rule) in self.profile.rules().iter().enumerate() {
            if self.disabled.contains(&index) {
                continue;
            }

            let matches = match self.evaluate(surface, rule).await {
                Ok(matches) => matches,
                Err(e) if e.is_rule_error() => {
                    warn!(profile = %self.profile.id, rule = %rule.strategy, error = %e, "Disabling discovery rule");
                    self.disabled.insert(index);
                    continue;
                }
                Err(e) => {
                    debug!(profile = %self.profile.id, rule = %rule.strategy, error = %e, "Discovery rule skipped");
                    continue;
                }
            };

            for (anchor, info) in matches {
                if !seen.insert(anchor) || registry.contains_anchor(anchor) {
                    continue;
                }
                trace!(profile = %self.profile.id, rule = %rule.strategy, anchor = %anchor, "Candidate found");
                found.push(Candidate {
                    anchor,
                    rule: rule.rank,
                    adapter: self.profile.adapter.resolve(&info),
                    rect: info.rect,
                });
                if self.policy == ScanPolicy::FirstMatch {
                    return found;
                }
            }
        }

        found
    }

    /// Visible elements selected by one rule, in preference order.
    async fn evaluate(
        &self,
        surface: &dyn Surface,
        rule: &DiscoveryRule,
    ) -> Result<Vec<(NodeId, NodeInfo)>, SurfaceError> {
        let (selector, min_area) = match &rule.strategy {
            Strategy::Css(selector) => (selector.as_str(), None),
            Strategy::LargestEditable { min_area } => (EDITABLE_SELECTOR, Some(*min_area)),
        };

        let mut visible = Vec::new();
        for node in surface.query_all(selector).await? {
            match surface.describe(node).await? {
                Some(info) if info.is_visible() => visible.push((node, info)),
                _ => {}
            }
        }

        if let Some(min_area) = min_area {
            visible.retain(|(_, info)| info.rect.area() >= min_area);
            visible.sort_by(|(_, a), (_, b)| b.rect.area().total_cmp(&a.rect.area()));
        }
        Ok(visible)
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
