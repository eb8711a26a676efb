//! Credential and usage persistence.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use prompto_protocols::{Credential, UsageCounters};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

/// Everything the coordinator keeps between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    #[serde(default)]
    pub usage: UsageCounters,
}

/// Storage contract for the coordinator's private state.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn credential(&self) -> Result<Option<Credential>, StoreError>;

    async fn set_credential(&self, credential: Credential) -> Result<(), StoreError>;

    async fn clear_credential(&self) -> Result<(), StoreError>;

    async fn usage(&self) -> Result<UsageCounters, StoreError>;

    async fn save_usage(&self, usage: &UsageCounters) -> Result<(), StoreError>;
}

/// Single JSON document on disk, replaced atomically on every write.
pub struct FileStateStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document. A missing file is an empty state.
    pub async fn load(&self) -> Result<StoredState, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoredState::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(StoredState::default());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    async fn write(&self, state: &StoredState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Saved state");
        Ok(())
    }

    async fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoredState) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;
        change(&mut state);
        self.write(&state).await
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn credential(&self) -> Result<Option<Credential>, StoreError> {
        Ok(self.load().await?.credential)
    }

    async fn set_credential(&self, credential: Credential) -> Result<(), StoreError> {
        self.update(|state| state.credential = Some(credential)).await
    }

    async fn clear_credential(&self) -> Result<(), StoreError> {
        self.update(|state| state.credential = None).await
    }

    async fn usage(&self) -> Result<UsageCounters, StoreError> {
        Ok(self.load().await?.usage)
    }

    async fn save_usage(&self, usage: &UsageCounters) -> Result<(), StoreError> {
        let usage = usage.clone();
        self.update(|state| state.usage = usage).await
    }
}

/// Volatile store for tests and one-shot commands.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<StoredState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            state: Mutex::new(StoredState {
                credential: Some(credential),
                usage: UsageCounters::default(),
            }),
        }
    }

    pub fn snapshot(&self) -> StoredState {
        self.state.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn credential(&self) -> Result<Option<Credential>, StoreError> {
        Ok(self.state.lock().credential.clone())
    }

    async fn set_credential(&self, credential: Credential) -> Result<(), StoreError> {
        self.state.lock().credential = Some(credential);
        Ok(())
    }

    async fn clear_credential(&self) -> Result<(), StoreError> {
        self.state.lock().credential = None;
        Ok(())
    }

    async fn usage(&self) -> Result<UsageCounters, StoreError> {
        Ok(self.state.lock().usage.clone())
    }

    async fn save_usage(&self, usage: &UsageCounters) -> Result<(), StoreError> {
        self.state.lock().usage = usage.clone();
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
