//! Credential stores that supply the accounts for a health-check run.
//!
//! Two sources exist: process configuration (one account per recognized
//! environment variable group) and the persisted `social_accounts` table.
//! Both are read-only from the engine's point of view.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sqlx::PgPool;
use std::collections::HashMap;
use std::env;

use crate::accounts::{Platform, SocialAccount};
use crate::crypto::SecretCipher;
use crate::db;
use crate::oauth::OAuth1Credentials;

/// A read-only source of social accounts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Lists the accounts to check, in a stable order.
    async fn list(&self) -> Result<Vec<SocialAccount>, Box<dyn std::error::Error + Send + Sync>>;
}

/// One environment variable group and the account field each variable fills.
struct EnvGroup {
    platform: Platform,
    prefix: &'static str,
    /// Variable holding the bearer-style secret, if the platform has one
    token_var: Option<&'static str>,
    /// (variable, metadata key) pairs
    metadata_vars: &'static [(&'static str, &'static str)],
}

const TWITTER_OAUTH1_VARS: [&str; 4] = [
    "TWITTER_API_KEY",
    "TWITTER_API_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

const ENV_GROUPS: [EnvGroup; 6] = [
    EnvGroup {
        platform: Platform::Twitter,
        prefix: "TWITTER",
        token_var: Some("TWITTER_BEARER_TOKEN"),
        metadata_vars: &[],
    },
    EnvGroup {
        platform: Platform::Facebook,
        prefix: "FACEBOOK",
        token_var: Some("FACEBOOK_PAGE_ACCESS_TOKEN"),
        metadata_vars: &[("FACEBOOK_PAGE_ID", "page_id")],
    },
    EnvGroup {
        platform: Platform::Instagram,
        prefix: "INSTAGRAM",
        token_var: Some("INSTAGRAM_ACCESS_TOKEN"),
        metadata_vars: &[("INSTAGRAM_USER_ID", "ig_user_id")],
    },
    EnvGroup {
        platform: Platform::Linkedin,
        prefix: "LINKEDIN",
        token_var: Some("LINKEDIN_ACCESS_TOKEN"),
        metadata_vars: &[("LINKEDIN_AUTHOR_URN", "author_urn")],
    },
    EnvGroup {
        platform: Platform::Telegram,
        prefix: "TELEGRAM",
        token_var: Some("TELEGRAM_BOT_TOKEN"),
        metadata_vars: &[("TELEGRAM_CHAT_ID", "chat_id")],
    },
    EnvGroup {
        platform: Platform::Discord,
        prefix: "DISCORD",
        token_var: None,
        metadata_vars: &[("DISCORD_WEBHOOK_URL", "webhook_url")],
    },
];

/// Synthesizes one account per recognized environment variable group.
///
/// A group is recognized when any of its variables is present, even if empty,
/// so half-configured platforms show up as failed checks rather than vanishing.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialStore {
    vars: HashMap<String, String>,
}

impl EnvCredentialStore {
    /// Snapshots the process environment.
    pub fn from_process_env() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    /// Uses an explicit variable map instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|v| v.trim())
    }

    fn build_account(&self, group: &EnvGroup) -> Option<SocialAccount> {
        let refresh_var = format!("{}_REFRESH_TOKEN", group.prefix);
        let expires_var = format!("{}_EXPIRES_AT", group.prefix);

        let oauth1_present = group.platform == Platform::Twitter
            && TWITTER_OAUTH1_VARS.iter().any(|v| self.var(v).is_some());
        let recognized = oauth1_present
            || group.token_var.map_or(false, |v| self.var(v).is_some())
            || group.metadata_vars.iter().any(|(v, _)| self.var(v).is_some());
        if !recognized {
            return None;
        }

        let mut account = SocialAccount::new(
            group.platform.as_str(),
            group.platform,
            group.token_var.and_then(|v| self.var(v)).unwrap_or_default(),
        );

        if oauth1_present {
            let read = |name: &str| self.var(name).unwrap_or_default().to_string();
            account.oauth1 = Some(OAuth1Credentials {
                consumer_key: read(TWITTER_OAUTH1_VARS[0]),
                consumer_secret: read(TWITTER_OAUTH1_VARS[1]),
                token: read(TWITTER_OAUTH1_VARS[2]),
                token_secret: read(TWITTER_OAUTH1_VARS[3]),
            });
        }

        for (var, key) in group.metadata_vars {
            if let Some(value) = self.var(var) {
                account.metadata.insert(key.to_string(), value.to_string());
            }
        }

        account.refresh_token = self
            .var(&refresh_var)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        if let Some(raw) = self.var(&expires_var).filter(|v| !v.is_empty()) {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(expiry) => account.expires_at = Some(expiry.with_timezone(&Utc)),
                Err(e) => warn!(
                    "Ignoring {}: '{}' is not an RFC 3339 timestamp ({})",
                    expires_var, raw, e
                ),
            }
        }

        debug!("Synthesized account from environment: {:?}", account);
        Some(account)
    }
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn list(&self) -> Result<Vec<SocialAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let accounts: Vec<SocialAccount> = ENV_GROUPS
            .iter()
            .filter_map(|group| self.build_account(group))
            .collect();
        info!("Found {} social accounts in environment", accounts.len());
        Ok(accounts)
    }
}

/// Reads accounts from the `social_accounts` table.
pub struct DbCredentialStore {
    pool: PgPool,
    cipher: Option<SecretCipher>,
}

impl DbCredentialStore {
    pub fn new(pool: PgPool, cipher: Option<SecretCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Uses `TOKEN_ENCRYPTION_KEY` for decryption when it is set.
    pub fn from_env(pool: PgPool) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let cipher = SecretCipher::from_env()?;
        if cipher.is_none() {
            info!("TOKEN_ENCRYPTION_KEY not set - reading stored credentials as plaintext");
        }
        Ok(Self::new(pool, cipher))
    }
}

#[async_trait]
impl CredentialStore for DbCredentialStore {
    async fn list(&self) -> Result<Vec<SocialAccount>, Box<dyn std::error::Error + Send + Sync>> {
        db::list_social_accounts(&self.pool, self.cipher.as_ref()).await
    }
}
