//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the backend base URL, request timeout, credential storage backend
//! and the last used username.
//!
//! Configuration is stored at `~/.config/tourbook/config.json` and may be
//! overridden through `TOURBOOK_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "tourbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default backend location. The browser build talked to a `/api` prefix
/// behind the dev proxy; outside the browser we need an absolute URL.
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const ENV_API_URL: &str = "TOURBOOK_API_URL";
const ENV_TIMEOUT_SECS: &str = "TOURBOOK_TIMEOUT_SECS";
const ENV_STORAGE: &str = "TOURBOOK_STORAGE";

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only, nothing survives a restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub storage: StorageBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage: StorageBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if missing) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
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

    /// Apply `TOURBOOK_*` overrides. Bad values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
        if let Some(raw) = lookup(ENV_STORAGE) {
            match raw.parse() {
                Ok(backend) => self.storage = backend,
                Err(e) => warn!(error = %e, "Ignoring invalid {}", ENV_STORAGE),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.storage, StorageBackend::File);
        assert!(config.last_username.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"storage": "keyring"}"#).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "https://tour.example.com/api"),
            (ENV_TIMEOUT_SECS, "3"),
            (ENV_STORAGE, "Memory"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url, "https://tour.example.com/api");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.storage, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|k| match k {
            ENV_TIMEOUT_SECS => Some("soon".to_string()),
            ENV_STORAGE => Some("floppy".to_string()),
            ENV_API_URL => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
