//! Session service: single-flight credential renewal, sign-out, and the
//! one-time startup bootstrap.
//!
//! The service owns the session state and is its only writer during renewal.
//! Any number of callers may request a renewal concurrently; all of them
//! share the settlement of a single network call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::credentials::CredentialStore;
use crate::auth::session::{Session, SessionSnapshot, SessionStatus};
use crate::models::auth::{AuthErrorBody, TokenResponse};

/// Cookie carrying the durable session token on renewal/logout calls.
const SESSION_COOKIE: &str = "ld_session";

/// Routes completing an external authentication handoff. The handoff is still
/// establishing the session; a renewal issued now would race it.
const AUTH_CALLBACK_PREFIX: &str = "/auth/callback";

/// Maximum length of a response body quoted in a renewal error
const MAX_REASON_LENGTH: usize = 200;

/// Why a credential renewal failed.
///
/// `NoSession` is the expected outcome for first-time visitors and maps to
/// `Unauthenticated`; everything else maps to `Expired`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no durable session")]
    NoSession,

    #[error("session renewal failed: {0}")]
    Renewal(String),
}

/// Credential handed to every waiter of a successful renewal.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
}

/// Options for a renewal request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Show `Loading` while the renewal runs. Used only by the startup
    /// bootstrap so first-paint screens do not flash "logged out".
    pub mark_loading: bool,
}

/// The in-flight renewal, shared by every caller that arrives while it runs.
type RefreshHandle = Shared<BoxFuture<'static, Result<TokenGrant, RefreshError>>>;

/// Process-wide session coordinator.
///
/// Constructed once at startup and injected into the transport layer and UI
/// bindings. Clone is not needed - pass the `Arc` around.
pub struct SessionService {
    http: Client,
    auth_base_url: String,
    state: RwLock<Session>,
    /// Durable session token, sent as a cookie on renewal and logout calls.
    durable: RwLock<Option<String>>,
    /// Keychain persistence for the durable token. Absent in tests.
    store: Option<CredentialStore>,
    /// Future cell for the single-flight renewal. Check and creation are
    /// atomic under this lock.
    inflight: Mutex<Option<RefreshHandle>>,
    bootstrapped: AtomicBool,
}

impl SessionService {
    /// Create a service with no keychain persistence.
    pub fn new(http: Client, auth_base_url: impl Into<String>) -> Arc<Self> {
        Self::build(http, auth_base_url.into(), None)
    }

    /// Create a service that persists the durable session token in the OS
    /// keychain, seeding it from any token stored by a previous run.
    pub fn with_store(
        http: Client,
        auth_base_url: impl Into<String>,
        store: CredentialStore,
    ) -> Arc<Self> {
        Self::build(http, auth_base_url.into(), Some(store))
    }

    fn build(http: Client, auth_base_url: String, store: Option<CredentialStore>) -> Arc<Self> {
        let durable = store.as_ref().and_then(|s| s.load().ok());
        Arc::new(Self {
            http,
            auth_base_url,
            state: RwLock::new(Session::new()),
            durable: RwLock::new(durable),
            store,
            inflight: Mutex::new(None),
            bootstrapped: AtomicBool::new(false),
        })
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    /// Current access credential, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token().map(str::to_owned)
    }

    /// Install a credential obtained through an explicit login or signup
    /// verification.
    pub async fn install(&self, tokens: &TokenResponse) {
        self.state
            .write()
            .await
            .set_tokens(tokens.access_token.clone(), tokens.access_expires_at);
        if let Some(rotated) = &tokens.refresh_token {
            self.persist_durable(rotated.clone()).await;
        }
    }

    /// Renew the access credential.
    ///
    /// Concurrent callers share one renewal network call and observe the same
    /// settlement, success or failure.
    pub async fn refresh(self: &Arc<Self>) -> Result<TokenGrant, RefreshError> {
        self.refresh_with(RefreshOptions::default()).await
    }

    /// Renew the access credential with explicit options.
    pub async fn refresh_with(
        self: &Arc<Self>,
        options: RefreshOptions,
    ) -> Result<TokenGrant, RefreshError> {
        if options.mark_loading {
            self.state.write().await.mark_loading();
        }

        let handle = {
            let mut inflight = self.inflight.lock().await;
            match inflight.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let service = Arc::clone(self);
                    let handle: RefreshHandle = async move {
                        let result = service.perform_refresh().await;
                        // Cleared before any waiter resumes, so the next
                        // call starts a fresh attempt.
                        *service.inflight.lock().await = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *inflight = Some(handle.clone());
                    handle
                }
            }
        };

        handle.await
    }

    /// One-time startup renewal.
    ///
    /// Guarded so repeated UI mount/unmount does not re-trigger it, and
    /// skipped entirely on external-authentication callback routes. On
    /// failure, any status other than `Expired` collapses to
    /// `Unauthenticated`: an ambiguous startup failure reads as "logged
    /// out", not "session expired".
    pub async fn bootstrap(self: &Arc<Self>, current_route: &str) {
        if current_route.starts_with(AUTH_CALLBACK_PREFIX) {
            debug!(route = current_route, "bootstrap skipped on auth callback route");
            return;
        }
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            return;
        }

        match self.refresh_with(RefreshOptions { mark_loading: true }).await {
            Ok(_) => info!("session re-established on startup"),
            Err(err) => {
                if self.status().await != SessionStatus::Expired {
                    self.state.write().await.clear_tokens();
                }
                debug!(err = %err, "startup renewal did not restore a session");
            }
        }
    }

    /// Sign out: invalidate the durable session server-side and drop all
    /// local credentials. Local state is cleared regardless of what the
    /// server answers.
    pub async fn sign_out(&self) {
        let url = format!("{}/auth/logout", self.auth_base_url);
        let mut request = self.http.post(&url);
        if let Some(token) = self.durable.read().await.clone() {
            request = request.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        match request.send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "logout rejected by server");
            }
            Err(e) => warn!(err = %e, "logout request failed"),
            _ => {}
        }

        self.state.write().await.clear_tokens();
        self.forget_durable().await;
        info!("signed out");
    }

    /// The renewal network call. Writes the outcome into the session state
    /// before returning, so every waiter resumes against settled state.
    async fn perform_refresh(&self) -> Result<TokenGrant, RefreshError> {
        let url = format!("{}/auth/refresh", self.auth_base_url);
        let mut request = self.http.post(&url);
        if let Some(token) = self.durable.read().await.clone() {
            request = request.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = RefreshError::Renewal(format!("renewal request failed: {}", e));
                self.settle_failure(&err).await;
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_failure(status, &body);
            self.settle_failure(&err).await;
            return Err(err);
        }

        let tokens: TokenResponse = match response.json().await {
            Ok(tokens) => tokens,
            Err(e) => {
                let err = RefreshError::Renewal(format!("invalid renewal response: {}", e));
                self.settle_failure(&err).await;
                return Err(err);
            }
        };

        debug!(expires_at = %tokens.access_expires_at, "access credential renewed");
        self.settle_success(&tokens).await;

        Ok(TokenGrant {
            access_token: tokens.access_token,
            access_expires_at: tokens.access_expires_at,
        })
    }

    async fn settle_success(&self, tokens: &TokenResponse) {
        self.state
            .write()
            .await
            .set_tokens(tokens.access_token.clone(), tokens.access_expires_at);
        if let Some(rotated) = &tokens.refresh_token {
            self.persist_durable(rotated.clone()).await;
        }
    }

    async fn settle_failure(&self, err: &RefreshError) {
        match err {
            RefreshError::NoSession => {
                debug!("no durable session; treating as signed out");
                self.state.write().await.clear_tokens();
                self.forget_durable().await;
            }
            RefreshError::Renewal(reason) => {
                warn!(reason = %reason, "credential renewal failed");
                self.state.write().await.mark_expired();
            }
        }
    }

    async fn persist_durable(&self, token: String) {
        if let Some(store) = &self.store {
            if let Err(e) = store.store(&token) {
                warn!(err = %e, "failed to persist durable session token");
            }
        }
        *self.durable.write().await = Some(token);
    }

    async fn forget_durable(&self) {
        *self.durable.write().await = None;
        if let Some(store) = &self.store {
            if let Err(e) = store.delete() {
                debug!(err = %e, "failed to remove stored session token");
            }
        }
    }
}

/// Map a failed renewal response to its terminal classification.
fn classify_failure(status: StatusCode, body: &str) -> RefreshError {
    if let Ok(parsed) = serde_json::from_str::<AuthErrorBody>(body) {
        if parsed.is_missing_session() {
            return RefreshError::NoSession;
        }
    }
    RefreshError::Renewal(format!("renewal rejected ({}): {}", status, truncate_reason(body)))
}

fn truncate_reason(body: &str) -> String {
    if body.len() <= MAX_REASON_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_REASON_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn token_body(token: &str) -> String {
        json!({
            "access_token": token,
            "token_type": "bearer",
            "access_expires_at": "2030-01-01T00:00:00Z",
        })
        .to_string()
    }

    fn rotating_token_body(token: &str, durable: &str) -> String {
        json!({
            "access_token": token,
            "token_type": "bearer",
            "access_expires_at": "2030-01-01T00:00:00Z",
            "refresh_token": durable,
        })
        .to_string()
    }

    fn login_response(token: &str, durable: &str) -> TokenResponse {
        TokenResponse {
            access_token: token.to_string(),
            token_type: "bearer".to_string(),
            access_expires_at: "2030-01-01T00:00:00Z".parse().unwrap(),
            refresh_token: Some(durable.to_string()),
        }
    }

    fn service(url: &str) -> Arc<SessionService> {
        SessionService::new(reqwest::Client::new(), url)
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("fresh-1"))
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        let (a, b, c, d, e) = tokio::join!(
            service.refresh(),
            service.refresh(),
            service.refresh(),
            service.refresh(),
            service.refresh(),
        );

        mock.assert_async().await;
        for grant in [a, b, c, d, e] {
            assert_eq!(grant.unwrap().access_token, "fresh-1");
        }
        assert_eq!(service.status().await, SessionStatus::Authenticated);
        assert_eq!(service.access_token().await.as_deref(), Some("fresh-1"));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_failure_shared_by_waiters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .with_status(500)
            .with_body("upstream exploded")
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        let (a, b, c) = tokio::join!(service.refresh(), service.refresh(), service.refresh());

        mock.assert_async().await;
        let err = a.unwrap_err();
        assert!(matches!(err, RefreshError::Renewal(_)));
        assert_eq!(b.unwrap_err(), err);
        assert_eq!(c.unwrap_err(), err);
        assert_eq!(service.status().await, SessionStatus::Expired);
    }

    #[tokio::test]
    async fn test_no_session_classifies_unauthenticated() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({"error": "no_session_cookie"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        let result = service.refresh().await;

        mock.assert_async().await;
        assert_eq!(result.unwrap_err(), RefreshError::NoSession);
        assert_eq!(service.status().await, SessionStatus::Unauthenticated);
        assert!(service.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_revoked_session_classifies_expired() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({"error": "session_revoked"}).to_string())
            .create_async()
            .await;

        let service = service(&server.url());
        let result = service.refresh().await;

        assert!(matches!(result.unwrap_err(), RefreshError::Renewal(_)));
        assert_eq!(service.status().await, SessionStatus::Expired);
    }

    #[tokio::test]
    async fn test_handle_cleared_between_attempts() {
        let mut server = Server::new_async().await;
        // First attempt runs with no durable token and fails; after an
        // explicit login the retry carries the session cookie and succeeds.
        let failed = server
            .mock("POST", "/auth/refresh")
            .match_header("cookie", Matcher::Missing)
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;
        let renewed = server
            .mock("POST", "/auth/refresh")
            .match_header("cookie", "ld_session=durable-2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("fresh-2"))
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        assert!(service.refresh().await.is_err());
        assert_eq!(service.status().await, SessionStatus::Expired);

        service.install(&login_response("login-1", "durable-2")).await;
        assert_eq!(service.status().await, SessionStatus::Authenticated);

        let grant = service.refresh().await.unwrap();
        assert_eq!(grant.access_token, "fresh-2");

        failed.assert_async().await;
        renewed.assert_async().await;
    }

    #[tokio::test]
    async fn test_renewal_rotates_durable_token() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("POST", "/auth/refresh")
            .match_header("cookie", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rotating_token_body("fresh-1", "rot-1"))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/auth/refresh")
            .match_header("cookie", "ld_session=rot-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("fresh-2"))
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        assert_eq!(service.refresh().await.unwrap().access_token, "fresh-1");
        assert_eq!(service.refresh().await.unwrap().access_token, "fresh-2");

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("boot-1"))
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        service.bootstrap("/dashboard").await;
        service.bootstrap("/invoices").await;

        mock.assert_async().await;
        assert_eq!(service.status().await, SessionStatus::Authenticated);
    }

    #[tokio::test]
    async fn test_bootstrap_skipped_on_auth_callback_route() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let service = service(&server.url());
        service.bootstrap("/auth/callback?provider=google&code=abc").await;

        mock.assert_async().await;
        assert_eq!(service.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_bootstrap_no_session_reads_as_logged_out() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({"error": "no_session_cookie"}).to_string())
            .create_async()
            .await;

        let service = service(&server.url());
        service.bootstrap("/dashboard").await;

        assert_eq!(service.status().await, SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_bootstrap_renewal_failure_reads_as_expired() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let service = service(&server.url());
        service.bootstrap("/dashboard").await;

        assert_eq!(service.status().await, SessionStatus::Expired);
    }

    #[tokio::test]
    async fn test_sign_out_clears_locally_even_if_server_rejects() {
        let mut server = Server::new_async().await;
        let logout = server
            .mock("POST", "/auth/logout")
            .match_header("cookie", "ld_session=durable-9")
            .with_status(500)
            .with_body("nope")
            .expect(1)
            .create_async()
            .await;

        let service = service(&server.url());
        service.install(&login_response("login-9", "durable-9")).await;
        service.sign_out().await;

        logout.assert_async().await;
        assert_eq!(service.status().await, SessionStatus::Unauthenticated);
        assert!(service.access_token().await.is_none());

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert!(snapshot.access_token.is_none());
    }

    #[test]
    fn test_classify_failure_matches_missing_session_codes() {
        let err = classify_failure(
            StatusCode::UNAUTHORIZED,
            &json!({"error": "no_session_cookie"}).to_string(),
        );
        assert_eq!(err, RefreshError::NoSession);

        let err = classify_failure(
            StatusCode::UNAUTHORIZED,
            &json!({"error": "no_session"}).to_string(),
        );
        assert_eq!(err, RefreshError::NoSession);

        let err = classify_failure(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, RefreshError::Renewal(_)));
    }

    #[test]
    fn test_truncate_reason_limits_quoted_body() {
        let long = "x".repeat(5000);
        let reason = truncate_reason(&long);
        assert!(reason.len() < 300);
        assert!(reason.contains("truncated"));
    }
}
