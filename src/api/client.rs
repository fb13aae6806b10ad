//! Share API client
//!
//! Top-level entry point tying the HTTP transport, the negotiated API version
//! and per-resource managers together.

use super::http::HttpClient;
use super::versions::{ApiVersion, ApiVersioned, MAX_VERSION, MIN_VERSION};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::resource::manager::{ActionHook, Hooks};
use crate::resource::share_group_instances::ShareGroupInstanceManager;
use crate::resource::share_group_replicas::ShareGroupReplicaManager;
use crate::resource::share_group_snapshot_instances::ShareGroupSnapshotInstanceManager;
use crate::resource::share_groups::ShareGroupManager;
use crate::resource::shares::ShareManager;
use serde_json::Value;
use std::sync::Arc;

/// Main share API client
///
/// The API version is fixed for the lifetime of the client; every
/// version-gated operation dispatches on it.
#[derive(Clone)]
pub struct Client {
    pub http: HttpClient,
    api_version: ApiVersion,
    experimental: bool,
    hooks: Arc<Hooks>,
}

impl Client {
    pub fn builder(endpoint: &str) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    /// Create a client from the effective configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = config.effective_endpoint().ok_or_else(|| {
            Error::invalid_input("no endpoint configured; set MANILA_ENDPOINT or use --endpoint")
        })?;

        let mut builder = Self::builder(&endpoint)
            .api_version(config.effective_api_version()?)
            .experimental(config.effective_experimental());
        if let Some(token) = config.effective_token() {
            builder = builder.token(&token);
        }
        builder.build()
    }

    /// Whether experimental APIs are flagged on requests from this client
    pub fn supports_experimental(&self) -> bool {
        self.experimental
    }

    pub(crate) fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn shares(&self) -> ShareManager<'_> {
        ShareManager::new(self)
    }

    pub fn share_groups(&self) -> ShareGroupManager<'_> {
        ShareGroupManager::new(self)
    }

    pub fn share_group_replicas(&self) -> ShareGroupReplicaManager<'_> {
        ShareGroupReplicaManager::new(self)
    }

    pub fn share_group_instances(&self) -> ShareGroupInstanceManager<'_> {
        ShareGroupInstanceManager::new(self)
    }

    pub fn share_group_snapshot_instances(&self) -> ShareGroupSnapshotInstanceManager<'_> {
        ShareGroupSnapshotInstanceManager::new(self)
    }
}

impl ApiVersioned for Client {
    fn api_version(&self) -> ApiVersion {
        self.api_version
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    endpoint: String,
    token: Option<String>,
    api_version: ApiVersion,
    experimental: bool,
    hooks: Hooks,
}

impl ClientBuilder {
    fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            token: None,
            api_version: MAX_VERSION,
            experimental: true,
            hooks: Hooks::default(),
        }
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Decide once whether experimental APIs are marked as such on the wire
    pub fn experimental(mut self, enabled: bool) -> Self {
        self.experimental = enabled;
        self
    }

    /// Register a callback that may rewrite action bodies for a resource kind
    ///
    /// Callbacks run in registration order right before the action is posted.
    pub fn action_hook<F>(mut self, kind: &'static str, hook: F) -> Self
    where
        F: Fn(&mut Value) + Send + Sync + 'static,
    {
        self.hooks.add_action_hook(kind, Arc::new(hook) as ActionHook);
        self
    }

    pub fn build(self) -> Result<Client> {
        if self.api_version < MIN_VERSION || self.api_version > MAX_VERSION {
            tracing::warn!(
                "API version {} is outside the known range {}..={}",
                self.api_version,
                MIN_VERSION,
                MAX_VERSION
            );
        }

        let http = HttpClient::new(&self.endpoint, self.token.as_deref(), self.api_version)?;
        tracing::info!(
            "Share API client for {} at version {}",
            http.endpoint(),
            self.api_version
        );

        Ok(Client {
            http,
            api_version: self.api_version,
            experimental: self.experimental,
            hooks: Arc::new(self.hooks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder("http://manila:8786/v2/p").build().unwrap();
        assert_eq!(client.api_version(), MAX_VERSION);
        assert!(client.supports_experimental());
    }

    #[test]
    fn test_experimental_capability_is_fixed_at_build() {
        let client = Client::builder("http://manila:8786/v2/p")
            .experimental(false)
            .api_version(ApiVersion::new(2, 7))
            .build()
            .unwrap();
        assert!(!client.supports_experimental());
        assert_eq!(client.api_version(), ApiVersion::new(2, 7));
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        // An explicit empty endpoint shadows MANILA_ENDPOINT
        let config = Config {
            endpoint: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(config.effective_endpoint(), None);
        assert!(matches!(
            Client::from_config(&config),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_config_uses_configured_values() {
        let config = Config {
            endpoint: Some("http://manila:8786/v2/p".into()),
            token: Some("tok".into()),
            api_version: Some(ApiVersion::new(2, 31)),
            experimental: Some(false),
        };
        let client = Client::from_config(&config).unwrap();
        assert_eq!(client.api_version(), ApiVersion::new(2, 31));
        assert!(!client.supports_experimental());
        assert_eq!(
            client.http.default_headers().get("x-auth-token").unwrap(),
            "tok"
        );
    }

    #[test]
    fn test_unsupported_version_fails_before_any_request() {
        // Nothing listens on this port; dispatch must fail first
        let client = Client::builder("http://127.0.0.1:9/v2/p")
            .api_version(ApiVersion::new(2, 4))
            .build()
            .unwrap();

        let result = tokio_test::block_on(client.shares().migrate_share("share-1", "host", false));
        assert!(matches!(
            result,
            Err(Error::VersionNotFoundForApiMethod { .. })
        ));
    }
}
