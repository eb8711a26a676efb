//! Coordinator errors and their stable failure codes.

use std::path::PathBuf;

use prompto_protocols::{Failure, FailureReason};
use thiserror::Error;

/// Errors from the remote transformation API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout_secs)
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    /// Stable reason code for this error.
    pub fn reason(&self) -> FailureReason {
        match self {
            ApiError::Status { status, .. } => match status {
                401 | 403 => FailureReason::AuthRequired,
                429 => FailureReason::RateLimited,
                400 | 404 | 422 => FailureReason::InvalidRequest,
                _ => FailureReason::Server,
            },
            ApiError::Network(_) => FailureReason::Network,
            ApiError::Timeout(_) => FailureReason::Timeout,
            ApiError::InvalidResponse(_) => FailureReason::Server,
            ApiError::NotSignedIn => FailureReason::AuthRequired,
            ApiError::InvalidRequest(_) => FailureReason::InvalidRequest,
        }
    }

    /// Whether the stored credential should be dropped.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Failure::new(err.reason(), err.to_string())
    }
}

/// Errors from the local state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt state file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::new(FailureReason::Server, format!("local state unavailable: {err}"))
    }
}
