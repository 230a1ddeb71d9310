//! Platform adapters and the registry that selects one per account.
//!
//! Each supported platform has one adapter implementing [`PlatformAdapter`].
//! `verify` is a read-only credential check; `test_post` is a live
//! create-then-delete cycle that only runs when the caller opts into live
//! mode, because it leaves real traces on the target platform.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

use crate::accounts::{Platform, SocialAccount};
use crate::config::PlatformEndpoints;
use crate::report::{CheckError, CheckOutcome, ErrorKind};

pub(crate) mod api;
mod discord;
mod linkedin;
mod meta;
mod telegram;
mod twitter;

pub use api::build_http_client;
pub use discord::DiscordAdapter;
pub use linkedin::LinkedinAdapter;
pub use meta::MetaAdapter;
pub use telegram::TelegramAdapter;
pub use twitter::{TwitterAdapter, TwitterAuth};

/// Capability set every platform adapter provides.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Performs a lightweight, read-only credential check.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckError`] classified into the shared taxonomy; missing
    /// credential fields are reported as `ConfigurationError` before any
    /// request is sent.
    async fn verify(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError>;

    /// Performs a live create-then-delete cycle.
    ///
    /// Platforms without a meaningful live test fall back to [`verify`](Self::verify).
    async fn test_post(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        self.verify(account).await
    }
}

/// Maps each platform to the adapter that checks it.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in adapter for every platform.
    pub fn with_defaults(client: Client, endpoints: &PlatformEndpoints) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TwitterAdapter::new(
            client.clone(),
            &endpoints.twitter_api_base,
        )));
        registry.register(Arc::new(MetaAdapter::new(
            Platform::Facebook,
            client.clone(),
            &endpoints.graph_api_base,
        )));
        registry.register(Arc::new(MetaAdapter::new(
            Platform::Instagram,
            client.clone(),
            &endpoints.graph_api_base,
        )));
        registry.register(Arc::new(LinkedinAdapter::new(
            client.clone(),
            &endpoints.linkedin_api_base,
        )));
        registry.register(Arc::new(TelegramAdapter::new(
            client.clone(),
            &endpoints.telegram_api_base,
        )));
        registry.register(Arc::new(DiscordAdapter::new(client)));
        registry
    }

    /// Registers an adapter, replacing any previous one for the same platform.
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// Looks up the adapter for an account, or reports `UnsupportedPlatform`.
    pub fn adapter_for(
        &self,
        account: &SocialAccount,
    ) -> Result<Arc<dyn PlatformAdapter>, CheckError> {
        self.get(account.platform).ok_or_else(|| {
            CheckError::new(
                ErrorKind::UnsupportedPlatform,
                format!("no adapter registered for platform '{}'", account.platform),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Reads a required metadata field or reports which one is missing.
pub(crate) fn require_metadata<'a>(
    account: &'a SocialAccount,
    key: &str,
) -> Result<&'a str, CheckError> {
    account.metadata_value(key).ok_or_else(|| {
        CheckError::configuration(format!(
            "{} account '{}' is missing metadata field '{}'",
            account.platform, account.id, key
        ))
    })
}

/// Reads the bearer token or reports it as missing.
pub(crate) fn require_bearer(account: &SocialAccount) -> Result<&str, CheckError> {
    account.bearer_token().ok_or_else(|| {
        CheckError::configuration(format!(
            "{} account '{}' has no access token",
            account.platform, account.id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_platform() {
        let registry = AdapterRegistry::with_defaults(Client::new(), &PlatformEndpoints::default());
        assert_eq!(registry.len(), Platform::ALL.len());
        for platform in Platform::ALL {
            let adapter = registry.get(platform).expect("adapter registered");
            assert_eq!(adapter.platform(), platform);
        }
    }

    #[test]
    fn test_missing_adapter_is_unsupported_platform() {
        let registry = AdapterRegistry::new();
        let account = SocialAccount::new("tg", Platform::Telegram, "token");
        let err = registry.adapter_for(&account).err().expect("no adapter");
        assert_eq!(err.kind, ErrorKind::UnsupportedPlatform);
    }

    #[test]
    fn test_require_helpers_report_configuration_errors() {
        let account = SocialAccount::new("fb", Platform::Facebook, "");
        assert_eq!(
            require_bearer(&account).unwrap_err().kind,
            ErrorKind::ConfigurationError
        );
        assert_eq!(
            require_metadata(&account, "page_id").unwrap_err().kind,
            ErrorKind::ConfigurationError
        );
    }
}
