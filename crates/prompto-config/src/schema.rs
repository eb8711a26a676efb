//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Home of Prompto's local files (`~/.prompto`).
pub fn prompto_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prompto")
}

/// Remote transformation API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_enhance_path")]
    pub enhance_path: String,

    #[serde(default = "default_optimize_path")]
    pub optimize_path: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_user_path")]
    pub user_path: String,

    #[serde(default = "default_analytics_path")]
    pub analytics_path: String,

    #[serde(default = "default_sync_path")]
    pub sync_path: String,

    /// Minutes between usage uploads; 0 disables the sync.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_api_timeout(),
            enhance_path: default_enhance_path(),
            optimize_path: default_optimize_path(),
            login_path: default_login_path(),
            user_path: default_user_path(),
            analytics_path: default_analytics_path(),
            sync_path: default_sync_path(),
            sync_interval_minutes: default_sync_interval(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_base_url() -> String {
    "http://localhost:8002".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_enhance_path() -> String {
    "/api/enhance-prompt".to_string()
}

fn default_optimize_path() -> String {
    "/api/optimize-prompt".to_string()
}

fn default_login_path() -> String {
    "/api/login".to_string()
}

fn default_user_path() -> String {
    "/api/user".to_string()
}

fn default_analytics_path() -> String {
    "/api/analytics".to_string()
}

fn default_sync_path() -> String {
    "/api/analytics/sync".to_string()
}

fn default_sync_interval() -> u64 {
    30
}

/// How many anchors one scan may attach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// First qualifying element of the first rule that yields one.
    #[default]
    FirstMatch,
    /// Every qualifying element of every rule.
    AllMatches,
}

/// In-page engine timing and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_rescan_debounce")]
    pub rescan_debounce_ms: u64,

    #[serde(default = "default_visibility_delay")]
    pub visibility_rescan_delay_ms: u64,

    #[serde(default = "default_maintenance_tick")]
    pub maintenance_tick_ms: u64,

    #[serde(default = "default_fallback_scan")]
    pub fallback_scan_secs: u64,

    #[serde(default = "default_min_text")]
    pub min_text_chars: usize,

    #[serde(default = "default_max_text")]
    pub max_text_chars: usize,

    #[serde(default = "default_notice_dismiss")]
    pub notice_dismiss_ms: u64,

    #[serde(default = "default_bridge_timeout")]
    pub bridge_timeout_secs: u64,

    #[serde(default)]
    pub scan_policy: ScanPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rescan_debounce_ms: default_rescan_debounce(),
            visibility_rescan_delay_ms: default_visibility_delay(),
            maintenance_tick_ms: default_maintenance_tick(),
            fallback_scan_secs: default_fallback_scan(),
            min_text_chars: default_min_text(),
            max_text_chars: default_max_text(),
            notice_dismiss_ms: default_notice_dismiss(),
            bridge_timeout_secs: default_bridge_timeout(),
            scan_policy: ScanPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn rescan_debounce(&self) -> Duration {
        Duration::from_millis(self.rescan_debounce_ms)
    }

    pub fn visibility_rescan_delay(&self) -> Duration {
        Duration::from_millis(self.visibility_rescan_delay_ms)
    }

    pub fn maintenance_tick(&self) -> Duration {
        Duration::from_millis(self.maintenance_tick_ms)
    }

    pub fn fallback_scan(&self) -> Duration {
        Duration::from_secs(self.fallback_scan_secs)
    }

    pub fn notice_dismiss(&self) -> Duration {
        Duration::from_millis(self.notice_dismiss_ms)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }
}

fn default_rescan_debounce() -> u64 {
    500
}

fn default_visibility_delay() -> u64 {
    1000
}

fn default_maintenance_tick() -> u64 {
    300
}

fn default_fallback_scan() -> u64 {
    2
}

fn default_min_text() -> usize {
    5
}

fn default_max_text() -> usize {
    5000
}

fn default_notice_dismiss() -> u64 {
    3000
}

fn default_bridge_timeout() -> u64 {
    35
}

/// Local persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "~/.prompto/state.json".to_string()
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub directory: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "~/.prompto/logs".to_string()
}
