//! Shared HTTP plumbing for the platform adapters.
//!
//! Every adapter funnels its requests through [`send_checked`], which logs the
//! exchange and translates transport failures and non-success statuses into
//! the shared [`CheckError`] taxonomy.

use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use crate::report::{CheckError, ErrorKind};

/// Longest response excerpt attached to a result or written to the log.
pub(crate) const MAX_DETAIL_LEN: usize = 200;

/// Builds the HTTP client shared by all adapters.
///
/// Only the connect phase has a timeout here; the whole-request deadline is
/// enforced per account by the dispatcher.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("socialcheck/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!("{}... [truncated, {} total bytes]", truncated, text.len())
    } else {
        sanitized
    }
}

/// A successful (2xx) platform response.
#[derive(Debug, Clone)]
pub(crate) struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Parses the body as JSON, reporting garbage as an unexpected response.
    pub fn json(&self, operation: &str) -> Result<serde_json::Value, CheckError> {
        serde_json::from_str(&self.body).map_err(|e| {
            CheckError::new(
                ErrorKind::UnexpectedResponse,
                format!("{} returned a body that is not JSON: {}", operation, e),
            )
            .with_status(self.status)
            .with_detail(sanitize_for_logging(&self.body, MAX_DETAIL_LEN))
        })
    }
}

/// Converts a transport error without exposing the request URL, which may
/// carry credentials (Telegram bot tokens live in the path).
pub(crate) fn network_error(error: reqwest::Error, operation: &str) -> CheckError {
    let error = error.without_url();
    let reason = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    CheckError::new(
        ErrorKind::NetworkError,
        format!("{} {}: {}", operation, reason, error),
    )
}

/// Sends a request and classifies the response.
///
/// # Returns
///
/// - `Ok(ApiResponse)`: The status and body of a 2xx response
/// - `Err(CheckError)`: A transport failure or a non-success status, with the
///   sanitized body attached as detail
pub(crate) async fn send_checked(
    request_builder: RequestBuilder,
    operation: &str,
) -> Result<ApiResponse, CheckError> {
    info!("Sending request for operation: {}", operation);

    let response = request_builder
        .send()
        .await
        .map_err(|e| network_error(e, operation))?;

    let status = response.status();
    info!(
        "Received response with status: {} for operation: {}",
        status, operation
    );

    let body = response
        .text()
        .await
        .map_err(|e| network_error(e, operation))?;

    if status.is_success() {
        debug!(
            "Response summary for '{}': {} bytes received",
            operation,
            body.len()
        );
        return Ok(ApiResponse {
            status: status.as_u16(),
            body,
        });
    }

    let excerpt = sanitize_for_logging(&body, MAX_DETAIL_LEN);
    warn!("Operation '{}' failed - Status: {}", operation, status);
    debug!("Error response for '{}': {}", operation, excerpt);

    let error = CheckError::from_status(status.as_u16(), operation);
    if excerpt.is_empty() {
        Err(error)
    } else {
        Err(error.with_detail(excerpt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_sanitize_replaces_control_characters() {
        assert_eq!(sanitize_for_logging("a\nb\tc\u{7}", 50), "a b c?");
    }

    #[test]
    fn test_sanitize_truncates_long_text() {
        let long = "x".repeat(300);
        let sanitized = sanitize_for_logging(&long, 10);
        assert!(sanitized.starts_with("xxxxxxxxxx..."));
        assert!(sanitized.contains("300 total bytes"));
    }

    #[tokio::test]
    async fn test_send_checked_classifies_statuses() {
        let server = MockServer::start().await;
        for (route, status) in [("/unauthorized", 401), ("/forbidden", 403), ("/limited", 429)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_string("{\"error\":\"nope\"}"))
                .mount(&server)
                .await;
        }

        let client = Client::new();
        let expectations = [
            ("/unauthorized", ErrorKind::AuthenticationError),
            ("/forbidden", ErrorKind::AuthorizationError),
            ("/limited", ErrorKind::RateLimitError),
        ];
        for (route, kind) in expectations {
            let err = send_checked(client.get(format!("{}{}", server.uri(), route)), "probe")
                .await
                .unwrap_err();
            assert_eq!(err.kind, kind, "route {}", route);
            assert_eq!(err.detail.as_deref(), Some("{\"error\":\"nope\"}"));
        }
    }

    #[tokio::test]
    async fn test_send_checked_reports_connection_failure_as_network_error() {
        let client = Client::new();
        // Port 9 (discard) on localhost is not expected to accept connections
        let err = send_checked(client.get("http://127.0.0.1:9/secret-token/path"), "probe")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert!(!err.message.contains("secret-token"));
    }
}
