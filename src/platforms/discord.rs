//! Discord webhook adapter.
//!
//! A webhook URL is the whole credential. Without one the account is
//! misconfigured and no request is made.

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use url::Url;

use super::api::send_checked;
use super::{require_metadata, PlatformAdapter};
use crate::accounts::{Platform, SocialAccount};
use crate::report::{CheckError, CheckOutcome};

pub struct DiscordAdapter {
    client: Client,
}

impl DiscordAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformAdapter for DiscordAdapter {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    async fn verify(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        let webhook_url = require_metadata(account, "webhook_url")?;
        let parsed = Url::parse(webhook_url).map_err(|e| {
            CheckError::configuration(format!(
                "discord account '{}' has an invalid webhook URL: {}",
                account.id, e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CheckError::configuration(format!(
                "discord account '{}' webhook URL must be http(s)",
                account.id
            )));
        }

        // GET on a webhook URL returns the webhook object without posting
        let operation = "discord webhook lookup";
        let response = send_checked(self.client.get(parsed), operation).await?;
        let body = response.json(operation)?;
        let name = body
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("unnamed");

        info!("Discord account '{}' webhook '{}' is reachable", account.id, name);
        Ok(CheckOutcome::new(
            Some(response.status),
            format!("webhook {}", name),
        ))
    }
}
