//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URLs and the last used account email.
//!
//! Configuration is stored at `~/.config/ledgerdesk/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "ledgerdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL for authentication endpoints
const DEFAULT_AUTH_BASE_URL: &str = "https://my.ledgerdesk.io/api";

/// Base URL for main API endpoints
const DEFAULT_API_BASE_URL: &str = "https://api.ledgerdesk.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default)]
    pub last_email: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_auth_base_url() -> String {
    DEFAULT_AUTH_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_base_url: default_auth_base_url(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_falls_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.auth_base_url, DEFAULT_AUTH_BASE_URL);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_saved_fields_survive_round_trip() {
        let config = Config {
            api_base_url: "https://staging.ledgerdesk.io".to_string(),
            auth_base_url: "https://my.staging.ledgerdesk.io/api".to_string(),
            last_email: Some("owner@example.com".to_string()),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_base_url, config.api_base_url);
        assert_eq!(parsed.last_email.as_deref(), Some("owner@example.com"));
    }
}
