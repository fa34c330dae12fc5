use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service name
const SERVICE_NAME: &str = "ledgerdesk";

/// Keychain account under which the durable session token is stored
const SESSION_ACCOUNT: &str = "durable-session";

/// OS-keychain storage for the durable session token.
///
/// Only the durable token is ever persisted; the short-lived access
/// credential stays in process memory.
pub struct CredentialStore {
    account: String,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            account: SESSION_ACCOUNT.to_string(),
        }
    }

    /// Scope the stored token to one account email, for hosts that switch
    /// between several LedgerDesk profiles.
    pub fn for_account(email: &str) -> Self {
        Self {
            account: format!("{}:{}", SESSION_ACCOUNT, email),
        }
    }

    /// Persist the durable session token in the OS keychain
    pub fn store(&self, token: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &self.account)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(token)
            .context("Failed to store session token in keychain")?;
        Ok(())
    }

    /// Retrieve the durable session token from the OS keychain
    pub fn load(&self) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, &self.account)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to read session token from keychain")
    }

    /// Delete the stored durable session token
    pub fn delete(&self) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &self.account)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete session token from keychain")?;
        Ok(())
    }

    /// Check whether a durable session token is stored
    pub fn has_session(&self) -> bool {
        if let Ok(entry) = Entry::new(SERVICE_NAME, &self.account) {
            entry.get_password().is_ok()
        } else {
            false
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
