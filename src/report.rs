//! Health-check results and the error taxonomy shared by every adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::accounts::{CredentialSource, Platform, SocialAccount};
use crate::oauth::SigningError;

/// Why a single account check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Required credential fields are absent; no network call was made
    ConfigurationError,
    /// The credential's `expires_at` is in the past; no network call was made
    TokenExpired,
    /// OAuth 1.0a credentials are structurally invalid
    SigningError,
    /// The platform answered 401
    AuthenticationError,
    /// The platform answered 403
    AuthorizationError,
    /// The platform answered 429
    RateLimitError,
    /// Transport-level failure
    NetworkError,
    /// The per-account deadline elapsed
    Timeout,
    /// No adapter is registered for the platform
    UnsupportedPlatform,
    /// Any other non-success status, or a success body that could not be understood
    UnexpectedResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A failed check as reported by an adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CheckError {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    /// Sanitized diagnostic text, such as a truncated response body
    pub detail: Option<String>,
}

impl CheckError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            detail: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Maps a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, operation: &str) -> Self {
        let kind = match status {
            401 => ErrorKind::AuthenticationError,
            403 => ErrorKind::AuthorizationError,
            429 => ErrorKind::RateLimitError,
            _ => ErrorKind::UnexpectedResponse,
        };
        Self::new(kind, format!("{} returned HTTP {}", operation, status)).with_status(status)
    }
}

impl From<SigningError> for CheckError {
    fn from(e: SigningError) -> Self {
        CheckError::new(ErrorKind::SigningError, e.to_string())
    }
}

/// A successful adapter call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub http_status: Option<u16>,
    /// Short human-readable note, e.g. the identity that was resolved
    pub detail: Option<String>,
}

impl CheckOutcome {
    pub fn new(http_status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            http_status,
            detail: Some(detail.into()),
        }
    }
}

/// The outcome of checking one account in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub account_id: String,
    pub platform: Platform,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TestResult {
    pub fn success(account: &SocialAccount, outcome: CheckOutcome, latency_ms: u64) -> Self {
        Self {
            account_id: account.id.clone(),
            platform: account.platform,
            ok: true,
            http_status: outcome.http_status,
            error_kind: None,
            latency_ms,
            detail: outcome.detail,
        }
    }

    pub fn failure(
        account_id: &str,
        platform: Platform,
        error: CheckError,
        latency_ms: u64,
    ) -> Self {
        let detail = match error.detail {
            Some(detail) => format!("{} ({})", error.message, detail),
            None => error.message,
        };
        Self {
            account_id: account_id.to_string(),
            platform,
            ok: false,
            http_status: error.http_status,
            error_kind: Some(error.kind),
            latency_ms,
            detail: Some(detail),
        }
    }
}

/// Aggregated result of one health-check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub ok: bool,
    pub mode: CredentialSource,
    pub live: bool,
    pub count: usize,
    pub results: Vec<TestResult>,
}

impl HealthReport {
    /// Builds a report whose `ok` is the conjunction of every result.
    pub fn from_results(mode: CredentialSource, live: bool, results: Vec<TestResult>) -> Self {
        Self {
            ok: results.iter().all(|r| r.ok),
            mode,
            live,
            count: results.len(),
            results,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }
}
