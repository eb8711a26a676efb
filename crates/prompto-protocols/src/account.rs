//! Stored sign-in state.

use serde::{Deserialize, Serialize};

/// Minimal user profile kept next to the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

/// Bearer credential owned by the background coordinator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub user: UserProfile,
}

impl Credential {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let cred = Credential::new(
            "secret-token",
            UserProfile {
                username: "ada".to_string(),
                ..Default::default()
            },
        );
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("ada"));
    }

    #[test]
    fn test_profile_optional_fields() {
        let profile: UserProfile = serde_json::from_str(r#"{"username":"ada"}"#).unwrap();
        assert_eq!(profile.username, "ada");
        assert!(profile.email.is_none());
        assert!(profile.id.is_none());
    }
}
