//! Token Types
//!
//! OAuth token response and access token wrapper.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;

/// Token response from the provider's token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds, as declared by the provider.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Rotated refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Access token wrapper for safe handling.
#[derive(Clone)]
pub struct AccessToken {
    value: SecretString,
}

impl AccessToken {
    /// Create new access token.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretString::new(value.into()),
        }
    }

    /// Get token value.
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.value.expose_secret())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parsing() {
        let json = r#"{
            "access_token": "new-access",
            "expires_in": 21600,
            "token_type": "Bearer",
            "scope": "98309 5990556",
            "refresh_token": "new-refresh"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "new-access");
        assert_eq!(response.expires_in, Some(21600));
        assert_eq!(response.refresh_token, Some("new-refresh".to_string()));
    }

    #[test]
    fn test_token_response_without_refresh_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "only-access"}"#).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert!(response.refresh_token.is_none());
    }

    #[test]
    fn test_access_token_is_redacted() {
        let token = AccessToken::new("super-secret");
        assert_eq!(token.authorization_header(), "Bearer super-secret");
        assert!(!format!("{:?}", token).contains("super-secret"));
    }
}
