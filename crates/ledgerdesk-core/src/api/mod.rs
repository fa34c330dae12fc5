//! REST API client module for the LedgerDesk backend.
//!
//! This module provides the `ApiClient` used by the dashboard screens. Every
//! outbound call passes through a pair of credential hooks: the request stage
//! attaches the current bearer credential, and the response stage recovers a
//! first 401 by renewing the credential and replaying the call once.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
