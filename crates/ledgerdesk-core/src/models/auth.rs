use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Successful response from the credential-renewal and login/signup verify
/// endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub access_expires_at: DateTime<Utc>,
    /// Rotated durable session token, when the server issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body returned by the authentication endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorBody {
    /// True when the renewal endpoint reported that no durable session
    /// exists. `no_session` is the legacy spelling of the same code.
    pub fn is_missing_session(&self) -> bool {
        matches!(
            self.error.as_deref(),
            Some("no_session_cookie") | Some("no_session")
        )
    }
}
