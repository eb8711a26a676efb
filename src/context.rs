//! Shared wiring: configuration, coordinator and bridge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, bail};
use tracing::{info, warn};

use prompto_bridge::MessageBridge;
use prompto_config::{Config, ConfigLoader, ConfigValidator, prompto_dir};
use prompto_coordinator::{Coordinator, FileStateStore, HttpTransformApi};
use prompto_protocols::{BridgeRequest, ReplyPayload};

pub(crate) fn default_config_path() -> PathBuf {
    prompto_dir().join("config.toml")
}

/// Load the configuration. A missing default file is fine; a missing
/// explicit file is not.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load_or_default(&default_config_path())?,
    };
    Ok(config)
}

/// Log validation warnings and reject invalid configurations.
pub(crate) fn check_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    if !result.is_valid() {
        let errors: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect();
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

/// The background side: one coordinator, one bridge per connected surface.
pub(crate) struct Context {
    pub config: Config,
    pub coordinator: Arc<Coordinator>,
}

impl Context {
    pub(crate) fn new(config: Config) -> Self {
        let state_path = ConfigLoader::expand_path(&config.storage.state_path);
        let store = Arc::new(FileStateStore::new(state_path));
        let api = Arc::new(HttpTransformApi::new(config.api.clone()));
        let coordinator = Arc::new(
            Coordinator::new(api, store)
                .with_text_limits(config.engine.min_text_chars, config.engine.max_text_chars),
        );

        Self {
            config,
            coordinator,
        }
    }

    /// A new bridge served by the shared coordinator. Engines close their
    /// bridge on shutdown, so each surface gets its own.
    pub(crate) fn connect(&self) -> Arc<MessageBridge> {
        let (bridge, endpoint) = MessageBridge::channel(self.config.engine.bridge_timeout());
        endpoint.serve(self.coordinator.clone());
        Arc::new(bridge)
    }

    /// Start the periodic usage sync if it is enabled.
    pub(crate) fn start_sync(&self) -> Option<tokio::task::JoinHandle<()>> {
        let minutes = self.config.api.sync_interval_minutes;
        if minutes == 0 {
            return None;
        }
        info!(minutes, "Usage sync enabled");
        Some(
            self.coordinator
                .spawn_sync(std::time::Duration::from_secs(minutes * 60)),
        )
    }

    /// One call through the bridge, with failures as command errors.
    pub(crate) async fn call(&self, request: BridgeRequest) -> anyhow::Result<ReplyPayload> {
        let kind = request.kind();
        let bridge = self.connect();
        let reply = bridge.call(request).await;
        bridge.close();
        reply.with_context(|| format!("{} failed", kind))
    }
}
