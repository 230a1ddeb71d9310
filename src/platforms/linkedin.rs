//! LinkedIn adapter.

use async_trait::async_trait;
use log::info;
use reqwest::Client;

use super::api::send_checked;
use super::{require_bearer, require_metadata, PlatformAdapter};
use crate::accounts::{Platform, SocialAccount};
use crate::oauth::build_bearer_auth_header;
use crate::report::{CheckError, CheckOutcome};

pub struct LinkedinAdapter {
    client: Client,
    api_base: String,
}

impl LinkedinAdapter {
    pub fn new(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for LinkedinAdapter {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    async fn verify(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        let token = require_bearer(account)?;
        // Posts are authored as a person or organization URN
        let author = require_metadata(account, "author_urn")?;
        if !author.starts_with("urn:li:") {
            return Err(CheckError::configuration(format!(
                "linkedin account '{}' has malformed author_urn '{}'",
                account.id, author
            )));
        }

        let operation = "linkedin profile lookup";
        let request = self
            .client
            .get(format!("{}/v2/userinfo", self.api_base))
            .header("Authorization", build_bearer_auth_header(token));

        let response = send_checked(request, operation).await?;
        let body = response.json(operation)?;
        let name = body
            .get("name")
            .or_else(|| body.get("sub"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown member");

        info!("LinkedIn account '{}' verified for {}", account.id, author);
        Ok(CheckOutcome::new(
            Some(response.status),
            format!("authenticated as {} posting as {}", name, author),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_profile_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/userinfo"))
            .and(header("Authorization", "Bearer li-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"sub": "abc", "name": "Ada"})),
            )
            .mount(&server)
            .await;

        let adapter = LinkedinAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("li", Platform::Linkedin, "li-token")
            .with_metadata("author_urn", "urn:li:organization:42");

        let outcome = adapter.verify(&account).await.unwrap();
        assert_eq!(
            outcome.detail.as_deref(),
            Some("authenticated as Ada posting as urn:li:organization:42")
        );
    }

    #[tokio::test]
    async fn test_malformed_urn_is_configuration_error() {
        let adapter = LinkedinAdapter::new(Client::new(), "http://127.0.0.1:9");
        let account = SocialAccount::new("li", Platform::Linkedin, "li-token")
            .with_metadata("author_urn", "organization:42");

        let err = adapter.verify(&account).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigurationError);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/userinfo"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = LinkedinAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("li", Platform::Linkedin, "li-token")
            .with_metadata("author_urn", "urn:li:person:7");

        assert_eq!(
            adapter.verify(&account).await.unwrap_err().kind,
            ErrorKind::RateLimitError
        );
    }
}
