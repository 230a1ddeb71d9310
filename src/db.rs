//! Database module for reading persisted social accounts.
//!
//! This module provides access to the `social_accounts` table in PostgreSQL.
//! The health-check engine only ever reads from it; rows are written by the
//! settings layer of the wider application.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::env;

use crate::accounts::{Platform, SocialAccount};
use crate::config::mask_secret;
use crate::crypto::{reveal, SecretCipher};
use crate::oauth::OAuth1Credentials;

/// Establishes a connection to the PostgreSQL database using DATABASE_URL.
///
/// # Returns
///
/// - `Ok(PgPool)`: A connection pool to the database
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If the connection fails or DATABASE_URL is missing
pub async fn get_db_pool() -> Result<PgPool, Box<dyn std::error::Error + Send + Sync>> {
    let database_url =
        env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable is not set")?;

    info!("Connecting to PostgreSQL database");
    debug!("Database URL (masked): {}", mask_secret(&database_url));

    let pool = PgPool::connect(&database_url).await?;
    info!("Successfully connected to PostgreSQL database");

    Ok(pool)
}

/// Creates the `social_accounts` table if it does not exist yet.
pub async fn create_social_accounts_table(
    pool: &PgPool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS social_accounts (
            id TEXT PRIMARY KEY,
            platform TEXT NOT NULL,
            access_token TEXT NOT NULL DEFAULT '',
            consumer_key TEXT,
            consumer_secret TEXT,
            oauth_token TEXT,
            oauth_token_secret TEXT,
            refresh_token TEXT,
            expires_at TIMESTAMPTZ,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Ensured social_accounts table exists");
    Ok(())
}

/// Flattens a JSON metadata object into string values.
///
/// Non-string scalars are rendered with their JSON text; nested values and
/// nulls are dropped.
pub(crate) fn metadata_from_json(value: &serde_json::Value) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    if let Some(object) = value.as_object() {
        for (key, value) in object {
            let rendered = match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            if let Some(rendered) = rendered {
                metadata.insert(key.clone(), rendered);
            }
        }
    }
    metadata
}

/// Raw columns of one `social_accounts` row, secrets still as stored.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoredAccount {
    pub id: String,
    pub platform: String,
    pub access_token: String,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub oauth_token: Option<String>,
    pub oauth_token_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl StoredAccount {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            platform: row.try_get("platform")?,
            access_token: row.try_get("access_token")?,
            consumer_key: row.try_get("consumer_key")?,
            consumer_secret: row.try_get("consumer_secret")?,
            oauth_token: row.try_get("oauth_token")?,
            oauth_token_secret: row.try_get("oauth_token_secret")?,
            refresh_token: row.try_get("refresh_token")?,
            expires_at: row.try_get("expires_at")?,
            metadata: row.try_get("metadata")?,
        })
    }

    /// Resolves the platform and reveals every secret column.
    fn into_account(
        self,
        cipher: Option<&SecretCipher>,
    ) -> Result<SocialAccount, Box<dyn std::error::Error + Send + Sync>> {
        let platform = self.platform.parse::<Platform>()?;

        let any_oauth1 = self.consumer_key.is_some()
            || self.consumer_secret.is_some()
            || self.oauth_token.is_some()
            || self.oauth_token_secret.is_some();
        let oauth1 = if any_oauth1 {
            Some(OAuth1Credentials {
                consumer_key: self.consumer_key.unwrap_or_default(),
                consumer_secret: reveal(cipher, &self.consumer_secret.unwrap_or_default())?,
                token: self.oauth_token.unwrap_or_default(),
                token_secret: reveal(cipher, &self.oauth_token_secret.unwrap_or_default())?,
            })
        } else {
            None
        };

        let refresh_token = match self.refresh_token {
            Some(token) => Some(reveal(cipher, &token)?),
            None => None,
        };

        Ok(SocialAccount {
            id: self.id,
            platform,
            access_token: reveal(cipher, &self.access_token)?,
            oauth1,
            refresh_token,
            expires_at: self.expires_at,
            metadata: metadata_from_json(&self.metadata),
        })
    }
}

/// Converts stored rows into accounts, preserving order.
///
/// A row naming an unknown platform or holding a secret that cannot be
/// decrypted is skipped with a warning; the rest of the batch is unaffected.
pub(crate) fn accounts_from_rows(
    rows: Vec<StoredAccount>,
    cipher: Option<&SecretCipher>,
) -> Vec<SocialAccount> {
    let mut accounts = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        match row.into_account(cipher) {
            Ok(account) => {
                debug!("Loaded account from database: {:?}", account);
                accounts.push(account);
            }
            Err(e) => warn!("Skipping social account '{}': {}", id, e),
        }
    }
    accounts
}

/// Loads every enabled account in insertion order.
///
/// Secret columns are decrypted when `cipher` is given. Rows naming a
/// platform this service does not know, or whose secrets fail to decrypt,
/// are skipped with a warning.
///
/// # Returns
///
/// - `Ok(Vec<SocialAccount>)`: The enabled accounts, possibly empty
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If the query fails
pub async fn list_social_accounts(
    pool: &PgPool,
    cipher: Option<&SecretCipher>,
) -> Result<Vec<SocialAccount>, Box<dyn std::error::Error + Send + Sync>> {
    info!("Querying database for enabled social accounts");

    let rows = sqlx::query(
        r#"
        SELECT id, platform, access_token, consumer_key, consumer_secret,
               oauth_token, oauth_token_secret, refresh_token, expires_at, metadata
        FROM social_accounts
        WHERE enabled = TRUE
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let stored = rows
        .iter()
        .map(StoredAccount::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let accounts = accounts_from_rows(stored, cipher);

    info!("Loaded {} social accounts from database", accounts.len());
    Ok(accounts)
}
