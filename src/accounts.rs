//! Social account records checked by the health-check dispatcher.
//!
//! A [`SocialAccount`] is built once per run by a credential store and stays
//! immutable for the rest of that run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::mask_secret;
use crate::oauth::OAuth1Credentials;

/// Supported social platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Facebook,
    Instagram,
    Linkedin,
    Telegram,
    Discord,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Twitter,
        Platform::Facebook,
        Platform::Instagram,
        Platform::Linkedin,
        Platform::Telegram,
        Platform::Discord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "linkedin" => Ok(Platform::Linkedin),
            "telegram" => Ok(Platform::Telegram),
            "discord" => Ok(Platform::Discord),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

/// Where the accounts for a run come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// One account per recognized environment variable group
    #[default]
    Env,
    /// Rows of the `social_accounts` table
    Db,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env => f.write_str("env"),
            CredentialSource::Db => f.write_str("db"),
        }
    }
}

impl FromStr for CredentialSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(CredentialSource::Env),
            "db" => Ok(CredentialSource::Db),
            other => Err(format!("invalid mode '{}', expected 'env' or 'db'", other)),
        }
    }
}

/// One connectable credential set.
#[derive(Clone, PartialEq)]
pub struct SocialAccount {
    pub id: String,
    pub platform: Platform,
    /// Bearer-style secret; empty when the platform authenticates another way
    pub access_token: String,
    pub oauth1: Option<OAuth1Credentials>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Platform-specific auxiliary fields (page id, author URN, webhook URL, ...)
    pub metadata: HashMap<String, String>,
}

impl SocialAccount {
    /// Creates an account with only a bearer token set.
    pub fn new(id: impl Into<String>, platform: Platform, access_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform,
            access_token: access_token.into(),
            oauth1: None,
            refresh_token: None,
            expires_at: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_oauth1(mut self, credentials: OAuth1Credentials) -> Self {
        self.oauth1 = Some(credentials);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a metadata value, treating blank strings as absent.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Returns the bearer token unless it is blank.
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.access_token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

impl fmt::Debug for SocialAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialAccount")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("access_token", &mask_secret(&self.access_token))
            .field("oauth1", &self.oauth1)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("metadata", &self.metadata.keys().collect::<Vec<_>>())
            .finish()
    }
}
