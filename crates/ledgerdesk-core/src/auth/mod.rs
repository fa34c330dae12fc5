//! Authentication module for session state and credential renewal.
//!
//! This module provides:
//! - `Session`: the in-memory session state container and its status machine
//! - `SessionService`: single-flight credential renewal, sign-out, and the
//!   one-time startup bootstrap
//! - `CredentialStore`: secure OS-level storage for the durable session token
//!
//! The short-lived access credential is never persisted; only the durable
//! session token survives a process restart.

pub mod credentials;
pub mod service;
pub mod session;

pub use credentials::CredentialStore;
pub use service::{RefreshError, RefreshOptions, SessionService, TokenGrant};
pub use session::{Session, SessionSnapshot, SessionStatus};
