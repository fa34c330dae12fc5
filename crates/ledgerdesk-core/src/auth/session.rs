use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of the client session.
///
/// Route guards treat `Unauthenticated` and `Expired` the same way (redirect
/// to login) but may show different messaging for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SessionStatus {
    /// Before the first renewal attempt has resolved.
    Idle,
    /// A startup renewal is in progress.
    Loading,
    /// An access credential is held.
    Authenticated,
    /// No session exists; expected for first-time visitors and after sign-out.
    Unauthenticated,
    /// A renewal failed mid-session; the user must sign in again.
    Expired,
}

/// In-memory session state: the access credential, its advisory expiry, and
/// the status machine.
///
/// The expiry is advisory only - the source of truth for credential validity
/// is a 401 response, not a local clock comparison.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: Option<String>,
    access_expires_at: Option<DateTime<Utc>>,
    status: SessionStatus,
}

impl Session {
    pub fn new() -> Self {
        Self {
            access_token: None,
            access_expires_at: None,
            status: SessionStatus::Idle,
        }
    }

    /// Install a new access credential. Status becomes `Authenticated`.
    pub fn set_tokens(&mut self, token: String, expires_at: DateTime<Utc>) {
        self.access_token = Some(token);
        self.access_expires_at = Some(expires_at);
        self.status = SessionStatus::Authenticated;
    }

    /// Drop the credential on sign-out or when no durable session exists.
    /// Status becomes `Unauthenticated`.
    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.access_expires_at = None;
        self.status = SessionStatus::Unauthenticated;
    }

    /// Drop the credential after a failed mid-session renewal. Status becomes
    /// `Expired` so the UI asks for a fresh login instead of treating the
    /// user as a first-time visitor.
    pub fn mark_expired(&mut self) {
        self.access_token = None;
        self.access_expires_at = None;
        self.status = SessionStatus::Expired;
    }

    /// Show a loading state while the startup renewal runs, so first-paint
    /// screens do not flash "logged out".
    pub fn mark_loading(&mut self) {
        self.status = SessionStatus::Loading;
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_expires_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Advisory seconds until the declared expiry (for display). Negative
    /// values are clamped to zero.
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.access_expires_at
            .map(|at| (at - Utc::now()).num_seconds().max(0))
    }

    /// Read-only view handed to route guards and UI bindings.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            access_token: self.access_token.clone(),
            access_expires_at: self.access_expires_at,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer-facing view of the session state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(rename = "accessExpiresAt")]
    pub access_expires_at: Option<DateTime<Utc>>,
}
