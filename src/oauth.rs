//! OAuth request authentication for the platform adapters.
//!
//! This module builds `Authorization` header values for the two strategies the
//! adapters use: plain bearer tokens and OAuth 1.0a HMAC-SHA1 request signing
//! (RFC 5849). Everything here is synchronous and free of I/O; the nonce and
//! timestamp can be passed in so signed headers are reproducible in tests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use log::debug;
use rand::RngCore;
use sha1::Sha1;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Signature method advertised in every signed request.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Protocol version advertised in every signed request.
pub const OAUTH_VERSION: &str = "1.0";

/// Number of random bytes drawn for each nonce.
const NONCE_BYTES: usize = 32;

/// Errors raised while producing an OAuth 1.0a signature.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("OAuth 1.0a credential field `{0}` is empty")]
    MissingField(&'static str),

    #[error("cannot sign request for invalid URL: {0}")]
    InvalidUrl(String),

    /// Surfaces the error of the fallible `Mac::new_from_slice`. HMAC accepts
    /// keys of any length, so HMAC-SHA1 never produces it in practice.
    #[error("HMAC key rejected: {0}")]
    InvalidKey(String),
}

/// The consumer and token credential quadruple used for OAuth 1.0a signing.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl OAuth1Credentials {
    /// Rejects credential sets where any of the four fields is empty.
    pub fn validate(&self) -> Result<(), SigningError> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("token", &self.token),
            ("token_secret", &self.token_secret),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(SigningError::MissingField(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &crate::config::mask_secret(&self.consumer_key))
            .field("consumer_secret", &"[REDACTED]")
            .field("token", &crate::config::mask_secret(&self.token))
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

/// A single request to be signed.
///
/// `params` holds the query or form-body parameters that take part in the
/// signature. JSON bodies are not signed and must not be listed here.
#[derive(Debug, Clone)]
pub struct SignatureRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub params: &'a [(String, String)],
}

/// Builds the Authorization header for bearer token authentication.
///
/// # Example
///
/// ```rust
/// use socialcheck::build_bearer_auth_header;
///
/// let header = build_bearer_auth_header("your_bearer_token");
/// assert_eq!(header, "Bearer your_bearer_token");
/// ```
pub fn build_bearer_auth_header(bearer_token: &str) -> String {
    format!("Bearer {}", bearer_token)
}

/// Percent-encodes a value using the RFC 3986 unreserved set.
///
/// Only ASCII letters, digits, `-`, `.`, `_` and `~` pass through unchanged.
/// A space becomes `%20` and `+` becomes `%2B`, unlike form encoding.
///
/// ```rust
/// use socialcheck::oauth::percent_encode;
///
/// assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
/// ```
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Generates a fresh nonce from 32 random bytes.
///
/// The bytes are base64-encoded and every non-alphanumeric character is
/// removed, so the nonce never needs escaping.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD
        .encode(bytes)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Current Unix time in whole seconds, as a string.
pub fn current_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// Splits a request URL into its normalized base-string URI and query pairs.
///
/// Scheme and host are lowercased, default ports are dropped, and the query
/// and fragment are removed from the URI.
pub fn normalize_url(raw: &str) -> Result<(String, Vec<(String, String)>), SigningError> {
    let url = Url::parse(raw).map_err(|e| SigningError::InvalidUrl(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| SigningError::InvalidUrl("URL has no host".to_string()))?;

    let mut base = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
    // `Url::port` is None when the port is the scheme default
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }
    base.push_str(url.path());

    let query = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    Ok((base, query))
}

/// Encodes and sorts parameters into the normalized parameter string.
pub fn build_parameter_string(params: &BTreeMap<String, String>) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Joins method, base URI and parameter string into the signature base string.
pub fn build_signature_base_string(method: &str, base_url: &str, parameter_string: &str) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url),
        percent_encode(parameter_string)
    )
}

/// Builds the HMAC key from the consumer and token secrets.
pub fn build_signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// Computes the base64 HMAC-SHA1 signature of `base_string`.
pub fn hmac_sha1_signature(signing_key: &str, base_string: &str) -> Result<String, SigningError> {
    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Builds the OAuth 1.0a `Authorization` header with a caller-supplied nonce
/// and timestamp.
///
/// For fixed inputs the output is byte-identical across calls. Request
/// parameters that collide with an `oauth_*` protocol parameter are
/// overridden by the protocol value.
///
/// # Errors
///
/// - [`SigningError::MissingField`] if any credential field is empty
/// - [`SigningError::InvalidUrl`] if the request URL cannot be parsed
pub fn build_oauth1_header(
    request: &SignatureRequest<'_>,
    credentials: &OAuth1Credentials,
    nonce: &str,
    timestamp: &str,
) -> Result<String, SigningError> {
    credentials.validate()?;

    let (base_url, query) = normalize_url(request.url)?;

    let oauth_params: [(&str, &str); 6] = [
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let mut merged: BTreeMap<String, String> = query.into_iter().collect();
    for (k, v) in request.params {
        merged.insert(k.clone(), v.clone());
    }
    for (k, v) in oauth_params.iter() {
        merged.insert(k.to_string(), v.to_string());
    }

    let parameter_string = build_parameter_string(&merged);
    let base_string = build_signature_base_string(request.method, &base_url, &parameter_string);
    let signing_key = build_signing_key(&credentials.consumer_secret, &credentials.token_secret);
    let signature = hmac_sha1_signature(&signing_key, &base_string)?;

    debug!(
        "Signed {} {} with {} parameters",
        request.method.to_ascii_uppercase(),
        base_url,
        merged.len()
    );

    let mut parts: Vec<String> = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect();
    parts.push(format!("oauth_signature=\"{}\"", percent_encode(&signature)));

    Ok(format!("OAuth {}", parts.join(", ")))
}

/// Signs a request with a freshly generated nonce and the current time.
pub fn sign_request(
    request: &SignatureRequest<'_>,
    credentials: &OAuth1Credentials,
) -> Result<String, SigningError> {
    build_oauth1_header(request, credentials, &generate_nonce(), &current_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs_credentials() -> OAuth1Credentials {
        OAuth1Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        }
    }

    fn docs_params() -> Vec<(String, String)> {
        vec![
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities".to_string(), "true".to_string()),
        ]
    }

    const DOCS_NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const DOCS_TIMESTAMP: &str = "1318622958";

    #[test]
    fn test_percent_encode_uses_unreserved_set() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_parameter_string_sorts_keys_bytewise() {
        let mut params = BTreeMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("oauth_nonce".to_string(), "n".to_string());
        params.insert("a".to_string(), "1".to_string());

        assert_eq!(build_parameter_string(&params), "a=1&b=2&oauth_nonce=n");
    }

    #[test]
    fn test_parameter_string_uppercase_sorts_before_lowercase() {
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "x".to_string());
        params.insert("Z".to_string(), "y".to_string());

        assert_eq!(build_parameter_string(&params), "Z=y&a=x");
    }

    #[test]
    fn test_signature_base_string_matches_documented_example() {
        let (base_url, _) =
            normalize_url("https://api.twitter.com/1.1/statuses/update.json").unwrap();

        let mut params: BTreeMap<String, String> = docs_params().into_iter().collect();
        let creds = docs_credentials();
        params.insert("oauth_consumer_key".into(), creds.consumer_key.clone());
        params.insert("oauth_nonce".into(), DOCS_NONCE.into());
        params.insert("oauth_signature_method".into(), SIGNATURE_METHOD.into());
        params.insert("oauth_timestamp".into(), DOCS_TIMESTAMP.into());
        params.insert("oauth_token".into(), creds.token.clone());
        params.insert("oauth_version".into(), OAUTH_VERSION.into());

        let base = build_signature_base_string("post", &base_url, &build_parameter_string(&params));
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_header_matches_documented_signature() {
        let params = docs_params();
        let request = SignatureRequest {
            method: "POST",
            url: "https://api.twitter.com/1.1/statuses/update.json",
            params: &params,
        };

        let header =
            build_oauth1_header(&request, &docs_credentials(), DOCS_NONCE, DOCS_TIMESTAMP).unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
        assert!(header.ends_with(", oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_version=\"1.0\""));
    }

    #[test]
    fn test_header_is_deterministic_for_fixed_nonce_and_timestamp() {
        let params = docs_params();
        let request = SignatureRequest {
            method: "POST",
            url: "https://api.twitter.com/1.1/statuses/update.json",
            params: &params,
        };
        let creds = docs_credentials();

        let first = build_oauth1_header(&request, &creds, "abc123", "1700000000").unwrap();
        let second = build_oauth1_header(&request, &creds, "abc123", "1700000000").unwrap();
        assert_eq!(first, second);

        let other_nonce = build_oauth1_header(&request, &creds, "abc124", "1700000000").unwrap();
        assert_ne!(first, other_nonce);
    }

    #[test]
    fn test_caller_params_cannot_override_oauth_values() {
        let creds = docs_credentials();
        let honest = build_oauth1_header(
            &SignatureRequest {
                method: "GET",
                url: "https://api.x.com/2/users/me",
                params: &[],
            },
            &creds,
            "realnonce",
            "1700000000",
        )
        .unwrap();

        let spoofed_params = vec![("oauth_nonce".to_string(), "spoofed".to_string())];
        let spoofed = build_oauth1_header(
            &SignatureRequest {
                method: "GET",
                url: "https://api.x.com/2/users/me",
                params: &spoofed_params,
            },
            &creds,
            "realnonce",
            "1700000000",
        )
        .unwrap();

        assert_eq!(honest, spoofed);
        assert!(!spoofed.contains("spoofed"));
    }

    #[test]
    fn test_query_string_is_signed_as_parameters() {
        let creds = docs_credentials();
        let params = vec![("user.fields".to_string(), "id".to_string())];
        let from_params = build_oauth1_header(
            &SignatureRequest {
                method: "GET",
                url: "https://api.x.com/2/users/me",
                params: &params,
            },
            &creds,
            "n",
            "1",
        )
        .unwrap();
        let from_query = build_oauth1_header(
            &SignatureRequest {
                method: "GET",
                url: "https://API.x.com:443/2/users/me?user.fields=id#frag",
                params: &[],
            },
            &creds,
            "n",
            "1",
        )
        .unwrap();

        assert_eq!(from_params, from_query);
    }

    #[test]
    fn test_normalize_url_keeps_non_default_port() {
        let (base, query) = normalize_url("http://Example.COM:8080/r%20v/X?id=123").unwrap();
        assert_eq!(base, "http://example.com:8080/r%20v/X");
        assert_eq!(query, vec![("id".to_string(), "123".to_string())]);
    }

    #[test]
    fn test_empty_credential_field_is_rejected() {
        let mut creds = docs_credentials();
        creds.token_secret = String::new();

        let result = build_oauth1_header(
            &SignatureRequest {
                method: "GET",
                url: "https://api.x.com/2/users/me",
                params: &[],
            },
            &creds,
            "n",
            "1",
        );
        assert_eq!(result, Err(SigningError::MissingField("token_secret")));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = build_oauth1_header(
            &SignatureRequest {
                method: "GET",
                url: "not a url",
                params: &[],
            },
            &docs_credentials(),
            "n",
            "1",
        );
        assert!(matches!(result, Err(SigningError::InvalidUrl(_))));
    }

    #[test]
    fn test_generate_nonce_is_alphanumeric_and_unique() {
        let first = generate_nonce();
        let second = generate_nonce();

        assert!(first.len() >= 32, "nonce too short: {}", first);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let rendered = format!("{:?}", docs_credentials());
        assert!(!rendered.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(!rendered.contains("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"));
    }

    #[test]
    fn test_hmac_accepts_keys_of_any_length() {
        assert!(hmac_sha1_signature("", "base").is_ok());
        assert!(hmac_sha1_signature(&"k".repeat(500), "base").is_ok());
    }

    #[test]
    fn test_build_bearer_auth_header() {
        assert_eq!(build_bearer_auth_header("abc"), "Bearer abc");
    }
}
