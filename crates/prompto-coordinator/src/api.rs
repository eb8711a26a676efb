//! Remote transformation API client.

use async_trait::async_trait;
use chrono::Utc;
use prompto_config::ApiConfig;
use prompto_protocols::{Credential, TransformKind, UsageCounters, UserProfile};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

/// An accepted suggestion, reported to the analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedEvent {
    pub transformation_kind: TransformKind,
    pub before_length: usize,
    pub after_length: usize,
}

/// Operations the coordinator needs from the backend.
#[async_trait]
pub trait TransformApi: Send + Sync {
    /// Transform `text` and return the replacement.
    async fn transform(&self, token: &str, kind: TransformKind, text: &str) -> Result<String, ApiError>;

    /// Exchange a username and password for a credential.
    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError>;

    /// Fetch the signed-in user's profile.
    async fn user(&self, token: &str) -> Result<UserProfile, ApiError>;

    async fn track(&self, token: &str, event: &AcceptedEvent) -> Result<(), ApiError>;

    async fn sync_usage(&self, token: &str, usage: &UsageCounters) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct TransformRequest<'a> {
    text: &'a str,
    transformation_kind: TransformKind,
}

#[derive(Deserialize)]
struct TransformResponse {
    #[serde(
        alias = "enhanced",
        alias = "optimized",
        alias = "enhanced_prompt",
        alias = "result"
    )]
    transformed_text: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "access_token")]
    token: String,
    user: UserProfile,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserResponse {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

#[derive(Serialize)]
struct TrackRequest<'a> {
    event: &'static str,
    #[serde(flatten)]
    accepted: &'a AcceptedEvent,
    timestamp: String,
}

/// `reqwest` implementation of [`TransformApi`].
pub struct HttpTransformApi {
    config: ApiConfig,
    client: reqwest::Client,
}

impl HttpTransformApi {
    pub fn new(config: ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, kind: TransformKind) -> String {
        match kind {
            TransformKind::Enhance => self.config.url(&self.config.enhance_path),
            TransformKind::Optimize => self.config.url(&self.config.optimize_path),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.config.timeout_seconds))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.config.timeout_seconds))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(body)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &T,
    ) -> Result<String, ApiError> {
        let mut request = self
            .client
            .post(self.config.url(path))
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        self.send(request).await
    }
}

fn parse<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Best human-readable message from an error body.
fn error_message(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        });
    detail.unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl TransformApi for HttpTransformApi {
    async fn transform(&self, token: &str, kind: TransformKind, text: &str) -> Result<String, ApiError> {
        let request = self
            .client
            .post(self.endpoint(kind))
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&TransformRequest {
                text,
                transformation_kind: kind,
            });
        let body = self.send(request).await?;
        let response: TransformResponse = parse(&body)?;
        debug!(kind = %kind, chars = response.transformed_text.chars().count(), "Transformation received");
        Ok(response.transformed_text)
    }

    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let body = self
            .post_json(&self.config.login_path, None, &LoginRequest { username, password })
            .await?;
        let response: LoginResponse = parse(&body)?;
        Ok(Credential::new(response.token, response.user))
    }

    async fn user(&self, token: &str) -> Result<UserProfile, ApiError> {
        let request = self
            .client
            .get(self.config.url(&self.config.user_path))
            .header("Authorization", format!("Bearer {}", token));
        let body = self.send(request).await?;
        match parse(&body)? {
            UserResponse::Wrapped { user } | UserResponse::Bare(user) => Ok(user),
        }
    }

    async fn track(&self, token: &str, event: &AcceptedEvent) -> Result<(), ApiError> {
        let body = TrackRequest {
            event: "prompt_accepted",
            accepted: event,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.post_json(&self.config.analytics_path, Some(token), &body)
            .await
            .map(|_| ())
    }

    async fn sync_usage(&self, token: &str, usage: &UsageCounters) -> Result<(), ApiError> {
        self.post_json(&self.config.sync_path, Some(token), usage)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
