//! Configuration Management
//!
//! Handles persistent configuration storage for the client.

use crate::api::versions::{ApiVersion, MAX_VERSION};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENDPOINT_ENV: &str = "MANILA_ENDPOINT";
pub const TOKEN_ENV: &str = "OS_AUTH_TOKEN";
pub const API_VERSION_ENV: &str = "OS_SHARE_API_VERSION";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Share API endpoint, including the project path
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Auth token sent as `X-Auth-Token`
    #[serde(default)]
    pub token: Option<String>,
    /// API microversion to negotiate
    #[serde(default)]
    pub api_version: Option<ApiVersion>,
    /// Flag experimental API calls on the wire
    #[serde(default)]
    pub experimental: Option<bool>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("manila").join("config.json"))
    }

    /// Load configuration from `path`, falling back to defaults when unreadable
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective endpoint (CLI/config > environment)
    pub fn effective_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| std::env::var(ENDPOINT_ENV).ok())
            .filter(|e| !e.is_empty())
    }

    /// Get effective token (CLI/config > environment)
    pub fn effective_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }

    /// Get effective API version (CLI/config > environment > newest known)
    pub fn effective_api_version(&self) -> Result<ApiVersion> {
        if let Some(version) = self.api_version {
            return Ok(version);
        }
        match std::env::var(API_VERSION_ENV) {
            Ok(raw) if !raw.is_empty() => raw.parse(),
            _ => Ok(MAX_VERSION),
        }
    }

    pub fn effective_experimental(&self) -> bool {
        self.experimental.unwrap_or(true)
    }

    /// Set the API version and save to `path`
    pub fn set_api_version(&mut self, version: ApiVersion, path: &std::path::Path) -> Result<()> {
        self.api_version = Some(version);
        self.save_to(path)
    }

    /// Set the endpoint and save to `path`; the endpoint must be an absolute URL
    pub fn set_endpoint(&mut self, endpoint: &str, path: &std::path::Path) -> Result<()> {
        let parsed = url::Url::parse(endpoint).map_err(|e| {
            Error::invalid_input(format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(Error::invalid_input(format!(
                "endpoint '{}' cannot be used as a base URL",
                endpoint
            )));
        }
        self.endpoint = Some(endpoint.to_string());
        self.save_to(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("manila-client-test-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            endpoint: Some("http://manila:8786/v2/p".into()),
            token: None,
            api_version: Some(ApiVersion::new(2, 7)),
            experimental: Some(false),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert!(!loaded.effective_experimental());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_or_malformed_file_yields_defaults() {
        let missing = temp_config_path("missing");
        assert_eq!(Config::load_from(&missing), Config::default());

        let malformed = temp_config_path("malformed");
        std::fs::create_dir_all(malformed.parent().unwrap()).unwrap();
        std::fs::write(&malformed, "{ not json").unwrap();
        assert_eq!(Config::load_from(&malformed), Config::default());

        let _ = std::fs::remove_dir_all(malformed.parent().unwrap());
    }

    #[test]
    fn test_setters_persist_to_path() {
        let path = temp_config_path("setters");
        let mut config = Config::default();

        config
            .set_endpoint("http://manila:8786/v2/project", &path)
            .unwrap();
        config.set_api_version(ApiVersion::new(2, 55), &path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.endpoint.as_deref(), Some("http://manila:8786/v2/project"));
        assert_eq!(loaded.api_version, Some(ApiVersion::new(2, 55)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_set_endpoint_rejects_invalid_url_without_writing() {
        let path = temp_config_path("bad-endpoint");
        let mut config = Config::default();

        assert!(matches!(
            config.set_endpoint("manila:8786", &path),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            config.set_endpoint("not a url", &path),
            Err(Error::InvalidInput(_))
        ));
        assert!(config.endpoint.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_configured_version_wins_over_default() {
        let config = Config {
            api_version: Some(ApiVersion::new(2, 11)),
            ..Config::default()
        };
        assert_eq!(config.effective_api_version().unwrap(), ApiVersion::new(2, 11));
        assert!(Config::default().effective_experimental());
    }
}
