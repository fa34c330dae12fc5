//! API client for the LedgerDesk backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests to fetch invoice, customer, and tax report data.
//!
//! Requests carry the session's bearer credential; a first 401 is recovered
//! by renewing the credential through the session service and replaying the
//! request exactly once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::{SessionService, SessionStatus};
use crate::config::Config;
use crate::models::{
    Customer, CustomerListResponse, Invoice, InvoiceListResponse, NewInvoice, TaxSummary,
    TokenResponse,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
/// This also bounds the credential-renewal call, so a hung renewal cannot
/// block its waiters indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Endpoints that authenticate on their own. They are called without a
/// bearer credential, and a 401 from them never triggers a renewal - a
/// renewal that retried a login or refresh call would loop forever.
const AUTH_EXEMPT_PATHS: &[&str] = &[
    "/auth/signup/request",
    "/auth/signup/verify",
    "/auth/login/request",
    "/auth/login/verify",
    "/auth/otp/resend",
    "/auth/refresh",
    "/auth/logout",
];

fn is_auth_exempt(path: &str) -> bool {
    AUTH_EXEMPT_PATHS.contains(&path)
}

/// Immutable description of one outbound call. Retry state is threaded
/// through the dispatch loop, never stored on the request itself.
struct ApiRequest {
    method: Method,
    url: String,
    path: String,
    body: Option<serde_json::Value>,
}

/// API client for the LedgerDesk backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    session: Arc<SessionService>,
    api_base_url: String,
    auth_base_url: String,
}

impl ApiClient {
    /// Create a new API client against the configured base URLs.
    pub fn new(config: &Config, session: Arc<SessionService>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_base_urls(
            client,
            config.api_base_url.clone(),
            config.auth_base_url.clone(),
            session,
        ))
    }

    /// Create a client against explicit base URLs, sharing an existing
    /// connection pool.
    pub fn with_base_urls(
        client: Client,
        api_base_url: String,
        auth_base_url: String,
        session: Arc<SessionService>,
    ) -> Self {
        Self {
            client,
            session,
            api_base_url,
            auth_base_url,
        }
    }

    fn api_request(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> ApiRequest {
        ApiRequest {
            url: format!("{}{}", self.api_base_url, path),
            path: path.to_string(),
            method,
            body,
        }
    }

    fn auth_request(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> ApiRequest {
        ApiRequest {
            url: format!("{}{}", self.auth_base_url, path),
            path: path.to_string(),
            method,
            body,
        }
    }

    /// Dispatch a request through the credential hooks.
    ///
    /// Request stage: attach the current bearer credential unless the
    /// endpoint is auth-exempt. Response stage: a first 401 triggers one
    /// renewal and one replay, and the replay carries whatever credential
    /// the renewal installed. A second 401, or a 401 from an exempt
    /// endpoint, goes back to the caller unchanged.
    async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let exempt = is_auth_exempt(&request.path);
        let mut retried = false;
        let mut rate_retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self.client.request(request.method.clone(), &request.url);
            if !exempt {
                if let Some(token) = self.session.access_token().await {
                    builder = builder.bearer_auth(token);
                }
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.with_context(|| {
                format!("Failed to send {} request to {}", request.method, request.url)
            })?;

            match response.status() {
                StatusCode::UNAUTHORIZED if !retried && !exempt => {
                    if self.session.status().await == SessionStatus::Unauthenticated {
                        // Known signed-out state; a renewal would just fail
                        // again. Only an explicit login can recover.
                        return Self::check_response(response).await;
                    }
                    debug!(path = %request.path, "credential rejected, renewing once");
                    retried = true;
                    if let Err(renewal) = self.session.refresh().await {
                        // The caller learns why the renewal failed, not that
                        // a 401 happened underneath it.
                        return Err(ApiError::SessionRenewal(renewal).into());
                    }
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    rate_retries += 1;
                    if rate_retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(path = %request.path, retry = rate_retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                _ => return Self::check_response(response).await,
            }
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.execute(&request).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", request.path))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.api_request(Method::GET, path, None)).await
    }

    // ===== Authentication flow =====

    /// Request a one-time passcode for an existing account
    pub async fn request_login(&self, email: &str) -> Result<()> {
        let request =
            self.auth_request(Method::POST, "/auth/login/request", Some(json!({ "email": email })));
        self.execute(&request).await?;
        Ok(())
    }

    /// Verify a login passcode. The returned credential is installed into
    /// the session service.
    pub async fn verify_login(&self, email: &str, code: &str) -> Result<TokenResponse> {
        let request = self.auth_request(
            Method::POST,
            "/auth/login/verify",
            Some(json!({ "email": email, "code": code })),
        );
        let tokens: TokenResponse = self.send_json(request).await?;
        self.session.install(&tokens).await;
        Ok(tokens)
    }

    /// Request a signup passcode for a new account
    pub async fn request_signup(&self, email: &str, company_name: &str) -> Result<()> {
        let request = self.auth_request(
            Method::POST,
            "/auth/signup/request",
            Some(json!({ "email": email, "companyName": company_name })),
        );
        self.execute(&request).await?;
        Ok(())
    }

    /// Verify a signup passcode. The returned credential is installed into
    /// the session service.
    pub async fn verify_signup(&self, email: &str, code: &str) -> Result<TokenResponse> {
        let request = self.auth_request(
            Method::POST,
            "/auth/signup/verify",
            Some(json!({ "email": email, "code": code })),
        );
        let tokens: TokenResponse = self.send_json(request).await?;
        self.session.install(&tokens).await;
        Ok(tokens)
    }

    /// Ask the backend to resend the pending one-time passcode
    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        let request =
            self.auth_request(Method::POST, "/auth/otp/resend", Some(json!({ "email": email })));
        self.execute(&request).await?;
        Ok(())
    }

    // ===== Data fetching methods =====

    /// Fetch all invoices for the signed-in account
    pub async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        let response: InvoiceListResponse = self.get("/invoices/").await?;
        Ok(response.invoices)
    }

    /// Fetch a single invoice with its line items
    pub async fn fetch_invoice(&self, invoice_id: i64) -> Result<Invoice> {
        self.get(&format!("/invoices/{}", invoice_id)).await
    }

    /// Create an invoice from a draft
    pub async fn create_invoice(&self, draft: &NewInvoice) -> Result<Invoice> {
        let request =
            self.api_request(Method::POST, "/invoices/", Some(serde_json::to_value(draft)?));
        self.send_json(request).await
    }

    /// Fetch all customers for the signed-in account
    pub async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        let response: CustomerListResponse = self.get("/customers/").await?;
        Ok(response.customers)
    }

    /// Fetch the yearly tax summary for the reports page
    pub async fn fetch_tax_summary(&self, year: i32) -> Result<TaxSummary> {
        self.get(&format!("/reports/tax-summary?year={}", year)).await
    }
}
