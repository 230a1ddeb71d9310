//! Telegram Bot API adapter.
//!
//! The bot token travels in the request path, so nothing derived from the
//! URL may end up in a result or a log line.

use async_trait::async_trait;
use log::info;
use reqwest::Client;

use super::api::send_checked;
use super::{require_bearer, PlatformAdapter};
use crate::accounts::{Platform, SocialAccount};
use crate::report::{CheckError, CheckOutcome, ErrorKind};

pub struct TelegramAdapter {
    client: Client,
    api_base: String,
}

impl TelegramAdapter {
    pub fn new(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn verify(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        let bot_token = require_bearer(account)?;
        let operation = "telegram bot info";

        let request = self
            .client
            .get(format!("{}/bot{}/getMe", self.api_base, bot_token));
        let response = send_checked(request, operation).await?;
        let body = response.json(operation)?;

        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = body
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("no description");
            return Err(CheckError::new(
                ErrorKind::UnexpectedResponse,
                format!("{} was not ok: {}", operation, description),
            )
            .with_status(response.status));
        }

        let username = body
            .get("result")
            .and_then(|r| r.get("username"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        info!("Telegram account '{}' verified as @{}", account.id, username);

        Ok(CheckOutcome::new(
            Some(response.status),
            format!("bot @{}", username),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:ABC/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 123, "is_bot": true, "username": "acme_bot"}
            })))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tg", Platform::Telegram, "123:ABC");

        let outcome = adapter.verify(&account).await.unwrap();
        assert_eq!(outcome.detail.as_deref(), Some("bot @acme_bot"));
    }

    #[tokio::test]
    async fn test_invalid_token_does_not_leak_into_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false, "error_code": 401, "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let adapter = TelegramAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tg", Platform::Telegram, "999:SECRET");

        let err = adapter.verify(&account).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthenticationError);
        assert!(!err.to_string().contains("SECRET"));
        assert!(!err.detail.unwrap_or_default().contains("SECRET"));
    }

    #[tokio::test]
    async fn test_missing_token_is_configuration_error() {
        let adapter = TelegramAdapter::new(Client::new(), "http://127.0.0.1:9");
        let account = SocialAccount::new("tg", Platform::Telegram, "");
        assert_eq!(
            adapter.verify(&account).await.unwrap_err().kind,
            ErrorKind::ConfigurationError
        );
    }
}
