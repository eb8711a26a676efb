//! Privileged request handler behind the message bridge.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prompto_bridge::RequestHandler;
use prompto_protocols::{
    BridgeRequest, Credential, Failure, FailureReason, ReplyPayload, TransformKind, UsageCounters,
    UserProfile,
};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{AcceptedEvent, TransformApi};
use crate::error::ApiError;
use crate::store::StateStore;

const DEFAULT_MIN_CHARS: usize = 5;
const DEFAULT_MAX_CHARS: usize = 5000;

/// Sole owner of the credential and usage counters.
///
/// Every request reads the credential from the store; nothing is cached
/// on the engine side.
pub struct Coordinator {
    api: Arc<dyn TransformApi>,
    store: Arc<dyn StateStore>,
    min_chars: usize,
    max_chars: usize,
    usage_lock: tokio::sync::Mutex<()>,
}

impl Coordinator {
    pub fn new(api: Arc<dyn TransformApi>, store: Arc<dyn StateStore>) -> Self {
        Self {
            api,
            store,
            min_chars: DEFAULT_MIN_CHARS,
            max_chars: DEFAULT_MAX_CHARS,
            usage_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Accepted trimmed length range for transformation text.
    pub fn with_text_limits(mut self, min_chars: usize, max_chars: usize) -> Self {
        self.min_chars = min_chars;
        self.max_chars = max_chars;
        self
    }

    async fn credential(&self) -> Result<Credential, Failure> {
        self.store
            .credential()
            .await?
            .ok_or_else(|| ApiError::NotSignedIn.into())
    }

    /// Drop a credential the backend no longer accepts.
    async fn on_api_error(&self, err: ApiError) -> Failure {
        if err.is_auth_rejection() {
            info!("Backend rejected the stored credential, signing out");
            if let Err(e) = self.store.clear_credential().await {
                warn!(error = %e, "Failed to clear credential");
            }
        }
        err.into()
    }

    async fn update_usage<F>(&self, change: F) -> Result<UsageCounters, Failure>
    where
        F: FnOnce(&mut UsageCounters),
    {
        let _guard = self.usage_lock.lock().await;
        let mut usage = self.store.usage().await?;
        change(&mut usage);
        self.store.save_usage(&usage).await?;
        Ok(usage)
    }

    /// Validate, forward to the API, and count a successful transformation.
    pub async fn transform(&self, kind: TransformKind, text: &str) -> Result<String, Failure> {
        let text = text.trim();
        let chars = text.chars().count();
        if chars < self.min_chars || chars > self.max_chars {
            return Err(ApiError::InvalidRequest(format!(
                "text must be {}..={} characters, got {}",
                self.min_chars, self.max_chars, chars
            ))
            .into());
        }

        let credential = self.credential().await?;
        let transformed = match self.api.transform(&credential.token, kind, text).await {
            Ok(transformed) => transformed,
            Err(e) => return Err(self.on_api_error(e).await),
        };

        let after = transformed.chars().count();
        if let Err(e) = self
            .update_usage(|usage| usage.record_transform(kind, chars, after))
            .await
        {
            warn!(error = %e, "Failed to record usage");
        }
        info!(kind = %kind, before = chars, after, "Transformation complete");
        Ok(transformed)
    }

    /// Count an accepted suggestion and report it upstream in the background.
    pub async fn track_acceptance(&self, event: AcceptedEvent) -> Result<(), Failure> {
        self.update_usage(UsageCounters::record_acceptance).await?;

        if let Ok(Some(credential)) = self.store.credential().await {
            let api = self.api.clone();
            tokio::spawn(async move {
                if let Err(e) = api.track(&credential.token, &event).await {
                    debug!(error = %e, "Analytics upload failed");
                }
            });
        }
        Ok(())
    }

    pub async fn usage(&self) -> Result<UsageCounters, Failure> {
        Ok(self.store.usage().await?)
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<UserProfile, Failure> {
        let credential = self.api.login(username, password).await?;
        let user = credential.user.clone();
        self.store.set_credential(credential).await?;
        info!(username = %user.username, "Signed in");
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), Failure> {
        self.store.clear_credential().await?;
        info!("Signed out");
        Ok(())
    }

    /// Refresh the stored profile from the backend.
    pub async fn user(&self) -> Result<UserProfile, Failure> {
        let credential = self.credential().await?;
        let profile = match self.api.user(&credential.token).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.on_api_error(e).await),
        };
        self.store
            .set_credential(Credential::new(credential.token, profile.clone()))
            .await?;
        Ok(profile)
    }

    /// Upload the counters if signed in. Returns whether anything was sent.
    pub async fn sync_usage(&self) -> Result<bool, Failure> {
        let Some(credential) = self.store.credential().await? else {
            return Ok(false);
        };
        let usage = self.store.usage().await?;
        match self.api.sync_usage(&credential.token, &usage).await {
            Ok(()) => Ok(true),
            Err(e) => Err(self.on_api_error(e).await),
        }
    }

    /// Sync usage every `period` until the task is aborted.
    pub fn spawn_sync(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match coordinator.sync_usage().await {
                    Ok(true) => debug!("Usage synced"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "Usage sync failed"),
                }
            }
        })
    }
}

#[async_trait]
impl RequestHandler for Coordinator {
    async fn handle(&self, request: BridgeRequest) -> Result<ReplyPayload, Failure> {
        match request {
            BridgeRequest::Enhance { text } => self
                .transform(TransformKind::Enhance, &text)
                .await
                .map(|text| ReplyPayload::Transformed { text }),
            BridgeRequest::Optimize { text } => self
                .transform(TransformKind::Optimize, &text)
                .await
                .map(|text| ReplyPayload::Transformed { text }),
            BridgeRequest::TrackEvent {
                kind,
                before_length,
                after_length,
            } => {
                self.track_acceptance(AcceptedEvent {
                    transformation_kind: kind,
                    before_length,
                    after_length,
                })
                .await?;
                Ok(ReplyPayload::Ack)
            }
            BridgeRequest::GetUsage => Ok(ReplyPayload::Usage {
                counters: self.usage().await?,
            }),
            BridgeRequest::SignIn { username, password } => {
                if username.trim().is_empty() || password.is_empty() {
                    return Err(Failure::new(
                        FailureReason::InvalidRequest,
                        "username and password are required",
                    ));
                }
                Ok(ReplyPayload::SignedIn {
                    user: self.sign_in(&username, &password).await?,
                })
            }
            BridgeRequest::SignOut => {
                self.sign_out().await?;
                Ok(ReplyPayload::Ack)
            }
            BridgeRequest::GetUser => Ok(ReplyPayload::User {
                profile: self.user().await?,
            }),
            BridgeRequest::OpenSettings => {
                info!("Settings requested");
                Ok(ReplyPayload::Ack)
            }
            BridgeRequest::Ping => Ok(ReplyPayload::Ack),
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
