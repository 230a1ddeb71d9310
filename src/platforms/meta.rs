//! Facebook Page and Instagram Business adapters over the Graph API.
//!
//! Both platforms share one implementation; they differ only in which
//! metadata id is looked up and which fields are requested.

use async_trait::async_trait;
use log::info;
use reqwest::Client;

use super::api::send_checked;
use super::{require_bearer, require_metadata, PlatformAdapter};
use crate::accounts::{Platform, SocialAccount};
use crate::oauth::build_bearer_auth_header;
use crate::report::{CheckError, CheckOutcome, ErrorKind};

pub struct MetaAdapter {
    platform: Platform,
    client: Client,
    graph_base: String,
}

impl MetaAdapter {
    /// Creates an adapter for `Platform::Facebook` or `Platform::Instagram`.
    pub fn new(platform: Platform, client: Client, graph_base: &str) -> Self {
        debug_assert!(matches!(platform, Platform::Facebook | Platform::Instagram));
        Self {
            platform,
            client,
            graph_base: graph_base.trim_end_matches('/').to_string(),
        }
    }

    /// Metadata key holding the object id, and the fields to request.
    fn lookup(&self) -> (&'static str, &'static str) {
        match self.platform {
            Platform::Instagram => ("ig_user_id", "id,username"),
            _ => ("page_id", "id,name"),
        }
    }
}

#[async_trait]
impl PlatformAdapter for MetaAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn verify(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        let token = require_bearer(account)?;
        let (id_key, fields) = self.lookup();
        let object_id = require_metadata(account, id_key)?;
        let operation = format!("{} account lookup", self.platform);

        let url = format!("{}/{}", self.graph_base, urlencoding::encode(object_id));
        let request = self
            .client
            .get(&url)
            .query(&[("fields", fields)])
            .header("Authorization", build_bearer_auth_header(token));

        let response = send_checked(request, &operation).await?;
        let body = response.json(&operation)?;

        let resolved_id = body.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
            CheckError::new(
                ErrorKind::UnexpectedResponse,
                format!("{} response has no id", operation),
            )
            .with_status(response.status)
        })?;
        let label = body
            .get("name")
            .or_else(|| body.get("username"))
            .and_then(|v| v.as_str())
            .unwrap_or(resolved_id);

        info!(
            "{} account '{}' resolved to {} ({})",
            self.platform, account.id, resolved_id, label
        );
        Ok(CheckOutcome::new(
            Some(response.status),
            format!("resolved {} {}", id_key, label),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_facebook_page_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1234"))
            .and(query_param("fields", "id,name"))
            .and(header("Authorization", "Bearer page-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "1234", "name": "Acme"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MetaAdapter::new(Platform::Facebook, Client::new(), &server.uri());
        let account = SocialAccount::new("fb", Platform::Facebook, "page-token")
            .with_metadata("page_id", "1234");

        let outcome = adapter.verify(&account).await.unwrap();
        assert_eq!(outcome.detail.as_deref(), Some("resolved page_id Acme"));
    }

    #[tokio::test]
    async fn test_instagram_missing_user_id_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = MetaAdapter::new(Platform::Instagram, Client::new(), &server.uri());
        let account = SocialAccount::new("ig", Platform::Instagram, "token");

        let err = adapter.verify(&account).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigurationError);
        assert!(err.message.contains("ig_user_id"));
    }

    #[tokio::test]
    async fn test_missing_scope_is_authorization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/17841"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"message": "(#10) Application does not have permission"}
            })))
            .mount(&server)
            .await;

        let adapter = MetaAdapter::new(Platform::Instagram, Client::new(), &server.uri());
        let account = SocialAccount::new("ig", Platform::Instagram, "token")
            .with_metadata("ig_user_id", "17841");

        let err = adapter.verify(&account).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthorizationError);
        assert!(err.detail.unwrap().contains("does not have permission"));
    }
}
