//! Configuration module for the socialcheck service.
//!
//! This module contains configuration structures and environment variable handling
//! for the health-check dispatcher and the platform API endpoints.

use log::{debug, info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default per-account check timeout in seconds.
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 10;
/// Default deadline for a whole batch in seconds.
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 60;
/// Default number of checks allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.x.com";
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";
pub const DEFAULT_LINKEDIN_API_BASE: &str = "https://api.linkedin.com";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Masks a secret for logging, keeping at most a short prefix and suffix.
///
/// Short values are fully hidden so that nothing meaningful leaks.
///
/// ```rust
/// use socialcheck::config::mask_secret;
///
/// assert_eq!(mask_secret("abcdefgh12345678XYZ"), "abcd...XYZ");
/// assert_eq!(mask_secret("short"), "***");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Base URLs for every platform API the adapters talk to.
///
/// Overridable through the environment so the adapters can be pointed at a
/// mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformEndpoints {
    pub twitter_api_base: String,
    pub graph_api_base: String,
    pub linkedin_api_base: String,
    pub telegram_api_base: String,
}

impl Default for PlatformEndpoints {
    fn default() -> Self {
        Self {
            twitter_api_base: DEFAULT_TWITTER_API_BASE.to_string(),
            graph_api_base: DEFAULT_GRAPH_API_BASE.to_string(),
            linkedin_api_base: DEFAULT_LINKEDIN_API_BASE.to_string(),
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
        }
    }
}

impl PlatformEndpoints {
    /// Loads endpoint overrides, falling back to the public APIs.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            twitter_api_base: endpoint_from_env("TWITTER_API_BASE", defaults.twitter_api_base),
            graph_api_base: endpoint_from_env("GRAPH_API_BASE", defaults.graph_api_base),
            linkedin_api_base: endpoint_from_env("LINKEDIN_API_BASE", defaults.linkedin_api_base),
            telegram_api_base: endpoint_from_env("TELEGRAM_API_BASE", defaults.telegram_api_base),
        }
    }

    /// Points every platform at the same base URL.
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            twitter_api_base: base.clone(),
            graph_api_base: base.clone(),
            linkedin_api_base: base.clone(),
            telegram_api_base: base,
        }
    }
}

fn endpoint_from_env(name: &str, default: String) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!("Using {} override: {}", name, value);
            value.trim().trim_end_matches('/').to_string()
        }
        _ => default,
    }
}

/// Runtime settings for the health-check dispatcher and scheduler.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Deadline applied to each account check
    pub check_timeout: Duration,
    /// Outer deadline for a whole batch served over HTTP
    pub batch_timeout: Duration,
    /// Maximum number of account checks in flight
    pub max_concurrency: usize,
    /// Cron expression for the scheduled sweep, if enabled
    pub cron_schedule: Option<String>,
    /// Whether the scheduled sweep runs live post tests
    pub cron_live: bool,
    pub endpoints: PlatformEndpoints,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
            batch_timeout: Duration::from_secs(DEFAULT_BATCH_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cron_schedule: None,
            cron_live: false,
            endpoints: PlatformEndpoints::default(),
        }
    }
}

impl HealthCheckConfig {
    /// Creates a new `HealthCheckConfig` from environment variables.
    ///
    /// # Optional Environment Variables
    ///
    /// - `HEALTHCHECK_TIMEOUT_SECS`: per-account timeout (default 10)
    /// - `HEALTHCHECK_BATCH_TIMEOUT_SECS`: whole-batch deadline for HTTP requests (default 60)
    /// - `HEALTHCHECK_MAX_CONCURRENCY`: concurrent checks cap (default 8)
    /// - `HEALTHCHECK_CRON`: cron expression enabling the scheduled sweep
    /// - `HEALTHCHECK_CRON_LIVE`: run live post tests in the scheduled sweep (default false)
    /// - `TWITTER_API_BASE`, `GRAPH_API_BASE`, `LINKEDIN_API_BASE`, `TELEGRAM_API_BASE`
    ///
    /// # Returns
    ///
    /// - `Ok(HealthCheckConfig)`: If every set variable parses
    /// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If a numeric or boolean value is invalid
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading health-check configuration from environment variables");

        let check_timeout_secs =
            parse_env("HEALTHCHECK_TIMEOUT_SECS", DEFAULT_CHECK_TIMEOUT_SECS)?;
        let batch_timeout_secs =
            parse_env("HEALTHCHECK_BATCH_TIMEOUT_SECS", DEFAULT_BATCH_TIMEOUT_SECS)?;
        let max_concurrency = parse_env("HEALTHCHECK_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?;
        let cron_live = parse_env("HEALTHCHECK_CRON_LIVE", false)?;

        if check_timeout_secs == 0 {
            return Err("HEALTHCHECK_TIMEOUT_SECS must be greater than zero".into());
        }
        if max_concurrency == 0 {
            return Err("HEALTHCHECK_MAX_CONCURRENCY must be greater than zero".into());
        }
        if batch_timeout_secs < check_timeout_secs {
            warn!(
                "HEALTHCHECK_BATCH_TIMEOUT_SECS ({}) is shorter than HEALTHCHECK_TIMEOUT_SECS ({})",
                batch_timeout_secs, check_timeout_secs
            );
        }

        let cron_schedule = env::var("HEALTHCHECK_CRON")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        match &cron_schedule {
            Some(expr) => info!("Scheduled health sweep enabled: {}", expr),
            None => info!("No HEALTHCHECK_CRON set - scheduled health sweep disabled"),
        }

        let config = HealthCheckConfig {
            check_timeout: Duration::from_secs(check_timeout_secs),
            batch_timeout: Duration::from_secs(batch_timeout_secs),
            max_concurrency,
            cron_schedule,
            cron_live,
            endpoints: PlatformEndpoints::from_env(),
        };
        debug!("Health-check configuration: {:?}", config);

        Ok(config)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("{} has invalid value '{}': {}", name, raw, e).into()),
        _ => Ok(default),
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set, it defaults to 3000.
///
/// # Errors
///
/// Returns an error if `PORT` is set to a value that is not a valid port number.
///
/// # Example
///
/// ```rust
/// use socialcheck::get_server_port;
///
/// // With no PORT set
/// let port = get_server_port().unwrap(); // Returns 3000
/// ```
pub fn get_server_port() -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
    parse_env("PORT", 3000u16)
}
