//! Application configuration management.
//!
//! This module handles loading and saving the backoffice configuration:
//! the API base URL, the request timeout, the notification lifetime and the
//! credential backend.
//!
//! Configuration is read from `~/.config/backoffice/config.json` (every field
//! optional) and then overridden by `BACKOFFICE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "backoffice";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default request timeout.
/// 15s is long enough for slow admin endpoints and short enough to surface a dead backend.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default time a notification stays on screen.
pub const DEFAULT_NOTIFICATION_LIFETIME_MS: u64 = 2_000;

/// Default name of the stored credential entry.
pub const DEFAULT_CREDENTIAL_KEY: &str = "token";

pub const ENV_BASE_URL: &str = "BACKOFFICE_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "BACKOFFICE_TIMEOUT_MS";
pub const ENV_NOTIFICATION_LIFETIME_MS: &str = "BACKOFFICE_NOTIFICATION_LIFETIME_MS";
pub const ENV_CREDENTIAL_BACKEND: &str = "BACKOFFICE_CREDENTIAL_BACKEND";
pub const ENV_CREDENTIAL_KEY: &str = "BACKOFFICE_CREDENTIAL_KEY";

/// Where the bearer credential is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// Plain-text file named after the credential key in the data directory
    #[default]
    File,
    /// OS keychain entry
    Keyring,
}

impl CredentialBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "keyring" => Some(Self::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for relative request targets. Empty means targets are used as given.
    pub base_url: String,
    pub timeout_ms: u64,
    pub notification_lifetime_ms: u64,
    pub credential_backend: CredentialBackend,
    pub credential_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            notification_lifetime_ms: DEFAULT_NOTIFICATION_LIFETIME_MS,
            credential_backend: CredentialBackend::default(),
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load only the config file, falling back to defaults when it doesn't exist.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_json(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    ///
    /// Unset variables leave the current value alone; a set but unparseable
    /// numeric or backend value is an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url.trim().to_string();
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_millis(ENV_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_NOTIFICATION_LIFETIME_MS) {
            self.notification_lifetime_ms = parse_millis(ENV_NOTIFICATION_LIFETIME_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CREDENTIAL_BACKEND) {
            self.credential_backend = CredentialBackend::parse(&value).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid {}: {:?} (expected \"file\" or \"keyring\")",
                    ENV_CREDENTIAL_BACKEND,
                    value
                )
            })?;
        }
        if let Some(key) = lookup(ENV_CREDENTIAL_KEY) {
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("{} must not be empty", ENV_CREDENTIAL_KEY);
            }
            self.credential_key = key.to_string();
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn notification_lifetime(&self) -> Duration {
        Duration::from_millis(self.notification_lifetime_ms)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding file-backed credentials.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

fn parse_millis(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid {}: {:?} (expected milliseconds)", name, value))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "");
        assert_eq!(config.timeout(), Duration::from_millis(15_000));
        assert_eq!(config.notification_lifetime(), Duration::from_millis(2_000));
        assert_eq!(config.credential_backend, CredentialBackend::File);
        assert_eq!(config.credential_key, "token");
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let config = Config::from_json(r#"{"base_url": "https://admin.example.com/api"}"#)
            .expect("partial config should parse");
        assert_eq!(config.base_url, "https://admin.example.com/api");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.notification_lifetime_ms, DEFAULT_NOTIFICATION_LIFETIME_MS);
    }

    #[test]
    fn test_from_json_keyring_backend() {
        let config = Config::from_json(r#"{"credential_backend": "keyring", "timeout_ms": 500}"#)
            .expect("config should parse");
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        assert_eq!(config.timeout_ms, 500);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(Config::from_json("{not json").is_err());
        assert!(Config::from_json(r#"{"timeout_ms": "soon"}"#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                (ENV_BASE_URL, " http://localhost:8080/api "),
                (ENV_TIMEOUT_MS, "250"),
                (ENV_NOTIFICATION_LIFETIME_MS, "5000"),
                (ENV_CREDENTIAL_BACKEND, "Keyring"),
                (ENV_CREDENTIAL_KEY, "admin-token"),
            ]))
            .expect("overrides should apply");

        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.notification_lifetime_ms, 5000);
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        assert_eq!(config.credential_key, "admin-token");
    }

    #[test]
    fn test_env_overrides_unset_keeps_values() {
        let mut config = Config::from_json(r#"{"timeout_ms": 42}"#).unwrap();
        config.apply_overrides(lookup(&[])).unwrap();
        assert_eq!(config.timeout_ms, 42);
    }

    #[test]
    fn test_env_overrides_invalid_values() {
        let mut config = Config::default();
        assert!(config.apply_overrides(lookup(&[(ENV_TIMEOUT_MS, "fast")])).is_err());
        assert!(config
            .apply_overrides(lookup(&[(ENV_NOTIFICATION_LIFETIME_MS, "-1")]))
            .is_err());
        assert!(config
            .apply_overrides(lookup(&[(ENV_CREDENTIAL_BACKEND, "cookie")]))
            .is_err());
        assert!(config.apply_overrides(lookup(&[(ENV_CREDENTIAL_KEY, "  ")])).is_err());
    }
}
