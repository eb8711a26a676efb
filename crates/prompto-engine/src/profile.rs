//! Platform profile registry.
//!
//! A profile tells the engine where a host keeps its prompt input and how
//! to read and write it. Hosts without a profile get the generic one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::adapter::InputAdapter;

/// Minimum rendered area of an editable region picked by
/// [`Strategy::LargestEditable`].
pub const MIN_EDITABLE_AREA: f64 = 20_000.0;

/// How a rule selects candidate elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// A CSS selector list, matched in document order.
    Css(String),
    /// Any `textarea` or `contenteditable` region at least `min_area` px²,
    /// largest first.
    LargestEditable { min_area: f64 },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Css(selector) => f.write_str(selector),
            Strategy::LargestEditable { min_area } => {
                write!(f, "largest editable region >= {min_area}px²")
            }
        }
    }
}

/// A selection strategy and its priority rank (lower runs first).
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRule {
    pub rank: u8,
    pub strategy: Strategy,
}

impl DiscoveryRule {
    pub fn css(rank: u8, selector: impl Into<String>) -> Self {
        Self {
            rank,
            strategy: Strategy::Css(selector.into()),
        }
    }

    pub fn largest_editable(rank: u8) -> Self {
        Self {
            rank,
            strategy: Strategy::LargestEditable {
                min_area: MIN_EDITABLE_AREA,
            },
        }
    }
}

/// Per-host discovery rules and input adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformProfile {
    pub id: String,
    pub name: String,
    pub hosts: Vec<String>,
    rules: Vec<DiscoveryRule>,
    pub adapter: InputAdapter,
}

impl PlatformProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hosts: Vec::new(),
            rules: Vec::new(),
            adapter: InputAdapter::Detect,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into().to_ascii_lowercase());
        self
    }

    /// Add a rule; rules stay ordered by rank, ties keep insertion order.
    pub fn with_rule(mut self, rule: DiscoveryRule) -> Self {
        let at = self.rules.partition_point(|r| r.rank <= rule.rank);
        self.rules.insert(at, rule);
        self
    }

    pub fn with_adapter(mut self, adapter: InputAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[DiscoveryRule] {
        &self.rules
    }
}

fn chatgpt() -> PlatformProfile {
    PlatformProfile::new("chatgpt", "ChatGPT")
        .with_host("chat.openai.com")
        .with_host("chatgpt.com")
        .with_host("openai.com")
        .with_rule(DiscoveryRule::css(0, "#prompt-textarea"))
        .with_rule(DiscoveryRule::css(1, r#"textarea[placeholder*="Message"]"#))
        .with_rule(DiscoveryRule::css(2, r#"textarea[data-id="root"]"#))
        .with_rule(DiscoveryRule::css(3, r#"textarea[placeholder*="Send a message"]"#))
        .with_rule(DiscoveryRule::css(
            4,
            r#"div[contenteditable="true"][data-testid*="chat"]"#,
        ))
}

fn claude() -> PlatformProfile {
    PlatformProfile::new("claude", "Claude")
        .with_host("claude.ai")
        .with_rule(DiscoveryRule::css(
            0,
            r#"div[contenteditable="true"][data-testid*="chat"]"#,
        ))
        .with_rule(DiscoveryRule::css(1, r#"div[contenteditable="true"][role="textbox"]"#))
        .with_rule(DiscoveryRule::css(2, r#"textarea[placeholder*="Talk to Claude"]"#))
        .with_rule(DiscoveryRule::css(3, "div.ProseMirror"))
        .with_adapter(InputAdapter::RichRegion)
}

fn gemini() -> PlatformProfile {
    PlatformProfile::new("gemini", "Gemini")
        .with_host("gemini.google.com")
        .with_host("bard.google.com")
        .with_rule(DiscoveryRule::css(0, r#"textarea[aria-label*="Enter a prompt"]"#))
        .with_rule(DiscoveryRule::css(
            1,
            r#"div[contenteditable="true"][aria-label*="Message"]"#,
        ))
        .with_rule(DiscoveryRule::css(2, r#"textarea[placeholder*="Enter a prompt"]"#))
        .with_rule(DiscoveryRule::css(3, r#"div[data-test-id="input-area"]"#))
}

/// Broad, low-precision rules for unrecognized hosts.
fn generic() -> PlatformProfile {
    PlatformProfile::new("generic", "Generic")
        .with_rule(DiscoveryRule::css(0, r#"textarea[placeholder*="message" i]"#))
        .with_rule(DiscoveryRule::css(1, r#"textarea[placeholder*="prompt" i]"#))
        .with_rule(DiscoveryRule::css(2, r#"div[contenteditable="true"][role="textbox"]"#))
        .with_rule(DiscoveryRule::css(3, r#"textarea[aria-label*="chat" i]"#))
        .with_rule(DiscoveryRule::largest_editable(4))
}

/// Host to profile lookup.
pub struct ProfileRegistry {
    profiles: Vec<Arc<PlatformProfile>>,
    by_host: HashMap<String, usize>,
    generic: Arc<PlatformProfile>,
}

impl ProfileRegistry {
    /// Registry with no host profiles, only the fallback.
    pub fn new(generic: PlatformProfile) -> Self {
        Self {
            profiles: Vec::new(),
            by_host: HashMap::new(),
            generic: Arc::new(generic),
        }
    }

    /// The built-in chat host profiles.
    pub fn builtin() -> Self {
        let mut registry = Self::new(generic());
        registry.register(chatgpt());
        registry.register(claude());
        registry.register(gemini());
        registry
    }

    /// Add a profile. Later registrations win for shared hosts.
    pub fn register(&mut self, profile: PlatformProfile) {
        let index = self.profiles.len();
        for host in &profile.hosts {
            self.by_host.insert(host.clone(), index);
        }
        self.profiles.push(Arc::new(profile));
    }

    /// Profile for a host, matching the host itself or any parent domain.
    pub fn resolve(&self, host: &str) -> Option<Arc<PlatformProfile>> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if let Some(&index) = self.by_host.get(candidate) {
                return Some(self.profiles[index].clone());
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return None,
            }
        }
    }

    pub fn resolve_or_generic(&self, host: &str) -> Arc<PlatformProfile> {
        self.resolve(host).unwrap_or_else(|| self.generic.clone())
    }

    /// Profile for a document location; unparseable locations get the generic profile.
    pub fn resolve_location(&self, location: &str) -> Arc<PlatformProfile> {
        match Url::parse(location).ok().as_ref().and_then(Url::host_str) {
            Some(host) => self.resolve_or_generic(host),
            None => self.generic.clone(),
        }
    }

    pub fn generic(&self) -> Arc<PlatformProfile> {
        self.generic.clone()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<PlatformProfile>> {
        self.profiles.iter()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
