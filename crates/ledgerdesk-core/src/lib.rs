//! Core library for LedgerDesk - a customer-facing invoicing and tax dashboard.
//!
//! This crate provides:
//! - `auth`: session state, single-flight credential renewal, startup bootstrap
//! - `api`: the authenticated REST client used by the dashboard screens
//! - `models`: wire and domain types for invoices, customers, and tax reports
//! - `config`: persisted application configuration
//!
//! The access credential lives only in process memory; the durable session
//! token is kept in the OS keychain and used to mint new access credentials.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{RefreshError, SessionService, SessionStatus};
