//! # Socialcheck Library
//!
//! Verifies that stored social-media credentials still work. Each configured
//! account is checked concurrently against its platform's API and the results
//! are returned as one ordered health report.
//!
//! ## Features
//!
//! - OAuth 1.0a (HMAC-SHA1) request signing for Twitter/X
//! - Platform adapters for Twitter/X, Facebook, Instagram, LinkedIn, Telegram and Discord
//! - Concurrent health checks with per-account timeouts and order-preserving results
//! - Token expiry short-circuit before any network call
//! - Credentials from environment variables or a PostgreSQL `social_accounts` table
//! - Optional scheduled health sweep
//!
//! ## Configuration
//!
//! - `PORT`: Server port (defaults to 3000)
//! - `DATABASE_URL`: PostgreSQL connection string, enables `mode=db`
//! - `TOKEN_ENCRYPTION_KEY`: hex key for encrypted credential columns
//! - `HEALTHCHECK_*`: timeouts, concurrency and schedule, see [`HealthCheckConfig`]
//!
//! ## API Endpoints
//!
//! - `GET /health`: Returns service health status
//! - `GET /api/social/health?live=<bool>&mode=<env|db>`: Runs a credential health check

pub mod accounts;
pub mod config;
pub mod cronjob;
pub mod crypto;
pub mod db;
pub mod dispatcher;
pub mod handlers;
pub mod oauth;
pub mod platforms;
pub mod report;
pub mod store;
pub mod token;

// Re-export commonly used types and functions
pub use accounts::{CredentialSource, Platform, SocialAccount};
pub use config::{get_server_port, HealthCheckConfig, PlatformEndpoints};
pub use cronjob::{run_health_sweep, start_health_cronjob};
pub use dispatcher::{DispatchError, HealthCheckDispatcher};
pub use handlers::{build_router, handle_health, handle_social_health, AppState};
pub use oauth::{build_bearer_auth_header, build_oauth1_header, sign_request, OAuth1Credentials};
pub use platforms::{AdapterRegistry, PlatformAdapter};
pub use report::{CheckError, ErrorKind, HealthReport, TestResult};
pub use store::{CredentialStore, DbCredentialStore, EnvCredentialStore};
pub use token::is_expired;
