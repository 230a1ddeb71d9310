//! Twitter/X adapter.
//!
//! Accounts with a bearer token authenticate with it directly; accounts that
//! only carry OAuth 1.0a credentials have every request signed instead.

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::json;

use super::api::{send_checked, ApiResponse};
use super::PlatformAdapter;
use crate::accounts::{Platform, SocialAccount};
use crate::oauth::{build_bearer_auth_header, sign_request, OAuth1Credentials, SignatureRequest};
use crate::report::{CheckError, CheckOutcome, ErrorKind};

/// The authentication strategy chosen for one Twitter account.
#[derive(Debug, Clone, PartialEq)]
pub enum TwitterAuth<'a> {
    Bearer(&'a str),
    OAuth1(&'a OAuth1Credentials),
}

impl<'a> TwitterAuth<'a> {
    /// Picks the bearer token when present, OAuth 1.0a signing otherwise.
    pub fn select(account: &'a SocialAccount) -> Result<Self, CheckError> {
        if let Some(token) = account.bearer_token() {
            return Ok(TwitterAuth::Bearer(token));
        }
        match &account.oauth1 {
            Some(credentials) => Ok(TwitterAuth::OAuth1(credentials)),
            None => Err(CheckError::configuration(format!(
                "twitter account '{}' has neither a bearer token nor OAuth 1.0a credentials",
                account.id
            ))),
        }
    }

    /// Computes the Authorization header for one request.
    fn header(&self, method: &Method, url: &str) -> Result<String, CheckError> {
        match self {
            TwitterAuth::Bearer(token) => Ok(build_bearer_auth_header(token)),
            TwitterAuth::OAuth1(credentials) => {
                let request = SignatureRequest {
                    method: method.as_str(),
                    url,
                    params: &[],
                };
                Ok(sign_request(&request, credentials)?)
            }
        }
    }
}

pub struct TwitterAdapter {
    client: Client,
    api_base: String,
}

impl TwitterAdapter {
    pub fn new(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn request(
        &self,
        auth: &TwitterAuth<'_>,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, CheckError> {
        let url = format!("{}{}", self.api_base, path);
        let header = auth.header(&method, &url)?;
        Ok(self
            .client
            .request(method, &url)
            .header("Authorization", header))
    }
}

fn data_field<'a>(
    value: &'a serde_json::Value,
    field: &str,
    response: &ApiResponse,
    operation: &str,
) -> Result<&'a serde_json::Value, CheckError> {
    value
        .get("data")
        .and_then(|data| data.get(field))
        .ok_or_else(|| {
            CheckError::new(
                ErrorKind::UnexpectedResponse,
                format!("{} response has no data.{}", operation, field),
            )
            .with_status(response.status)
        })
}

#[async_trait]
impl PlatformAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn verify(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        let auth = TwitterAuth::select(account)?;
        let operation = "twitter identity lookup";

        let request = self.request(&auth, Method::GET, "/2/users/me")?;
        let response = send_checked(request, operation).await?;
        let body = response.json(operation)?;

        let username = data_field(&body, "username", &response, operation)?
            .as_str()
            .unwrap_or_default();
        info!("Twitter account '{}' verified as @{}", account.id, username);

        Ok(CheckOutcome::new(
            Some(response.status),
            format!("authenticated as @{}", username),
        ))
    }

    async fn test_post(&self, account: &SocialAccount) -> Result<CheckOutcome, CheckError> {
        let auth = TwitterAuth::select(account)?;

        let create_op = "twitter test post create";
        let text = format!("socialcheck connectivity test {}", Utc::now().to_rfc3339());
        let request = self
            .request(&auth, Method::POST, "/2/tweets")?
            .json(&json!({ "text": text }));
        let created = send_checked(request, create_op).await?;
        let created_body = created.json(create_op)?;
        let post_id = data_field(&created_body, "id", &created, create_op)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                CheckError::new(
                    ErrorKind::UnexpectedResponse,
                    format!("{} returned a non-string post id", create_op),
                )
            })?;
        info!("Created test post {} for account '{}'", post_id, account.id);

        let delete_op = "twitter test post delete";
        let request = self.request(&auth, Method::DELETE, &format!("/2/tweets/{}", post_id))?;
        let deleted = send_checked(request, delete_op).await.map_err(|e| {
            warn!("Test post {} could not be deleted: {}", post_id, e);
            CheckError {
                message: format!("created post {} but could not delete it: {}", post_id, e.message),
                ..e
            }
        })?;
        let deleted_body = deleted.json(delete_op)?;
        if deleted_body
            .get("data")
            .and_then(|d| d.get("deleted"))
            .and_then(|d| d.as_bool())
            != Some(true)
        {
            return Err(CheckError::new(
                ErrorKind::UnexpectedResponse,
                format!("post {} was created but the delete was not confirmed", post_id),
            )
            .with_status(deleted.status));
        }

        Ok(CheckOutcome::new(
            Some(deleted.status),
            format!("created and deleted post {}", post_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth1_credentials() -> OAuth1Credentials {
        OAuth1Credentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            token: "tk".to_string(),
            token_secret: "ts".to_string(),
        }
    }

    #[test]
    fn test_select_prefers_bearer() {
        let account =
            SocialAccount::new("tw", Platform::Twitter, "bearer").with_oauth1(oauth1_credentials());
        assert_eq!(TwitterAuth::select(&account).unwrap(), TwitterAuth::Bearer("bearer"));
    }

    #[test]
    fn test_select_falls_back_to_oauth1() {
        let creds = oauth1_credentials();
        let account = SocialAccount::new("tw", Platform::Twitter, "").with_oauth1(creds.clone());
        assert_eq!(TwitterAuth::select(&account).unwrap(), TwitterAuth::OAuth1(&creds));
    }

    #[test]
    fn test_select_without_credentials_is_configuration_error() {
        let account = SocialAccount::new("tw", Platform::Twitter, "");
        assert_eq!(
            TwitterAuth::select(&account).unwrap_err().kind,
            ErrorKind::ConfigurationError
        );
    }

    #[tokio::test]
    async fn test_verify_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("Authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "1", "username": "socialbot"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TwitterAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tw", Platform::Twitter, "good-token");
        let outcome = adapter.verify(&account).await.unwrap();

        assert_eq!(outcome.http_status, Some(200));
        assert_eq!(outcome.detail.as_deref(), Some("authenticated as @socialbot"));
    }

    #[tokio::test]
    async fn test_verify_signs_with_oauth1_when_no_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header_regex(
                "Authorization",
                r#"^OAuth oauth_consumer_key="ck", .*oauth_signature=""#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "1", "username": "signed"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TwitterAdapter::new(Client::new(), &server.uri());
        let account =
            SocialAccount::new("tw", Platform::Twitter, "").with_oauth1(oauth1_credentials());
        assert!(adapter.verify(&account).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_with_broken_oauth1_is_signing_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut creds = oauth1_credentials();
        creds.consumer_secret = String::new();
        let adapter = TwitterAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tw", Platform::Twitter, "").with_oauth1(creds);

        assert_eq!(
            adapter.verify(&account).await.unwrap_err().kind,
            ErrorKind::SigningError
        );
    }

    #[tokio::test]
    async fn test_verify_revoked_token_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("{\"title\":\"Unauthorized\"}"),
            )
            .mount(&server)
            .await;

        let adapter = TwitterAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tw", Platform::Twitter, "revoked");
        let err = adapter.verify(&account).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::AuthenticationError);
        assert_eq!(err.http_status, Some(401));
    }

    #[tokio::test]
    async fn test_live_post_creates_then_deletes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": "1799", "text": "socialcheck connectivity test"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/2/tweets/1799"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"deleted": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = TwitterAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tw", Platform::Twitter, "token");
        let outcome = adapter.test_post(&account).await.unwrap();

        assert_eq!(outcome.detail.as_deref(), Some("created and deleted post 1799"));
    }

    #[tokio::test]
    async fn test_live_post_reports_failed_delete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": "42"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/2/tweets/42"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let adapter = TwitterAdapter::new(Client::new(), &server.uri());
        let account = SocialAccount::new("tw", Platform::Twitter, "token");
        let err = adapter.test_post(&account).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::AuthorizationError);
        assert!(err.message.contains("created post 42"));
    }
}
