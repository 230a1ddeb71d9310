//! # Socialcheck
//!
//! A Rust web service that verifies social-media credentials on demand.
//!
//! ## Environment Variables
//!
//! - `PORT`: Server port (defaults to 3000)
//! - `DATABASE_URL`: PostgreSQL connection string; without it only `mode=env` is served
//! - `TOKEN_ENCRYPTION_KEY`: hex key for encrypted `social_accounts` columns
//! - `HEALTHCHECK_TIMEOUT_SECS`, `HEALTHCHECK_BATCH_TIMEOUT_SECS`, `HEALTHCHECK_MAX_CONCURRENCY`
//! - `HEALTHCHECK_CRON`, `HEALTHCHECK_CRON_LIVE`: optional scheduled sweep
//! - Platform credentials such as `TWITTER_BEARER_TOKEN` or `DISCORD_WEBHOOK_URL`
//!
//! ## API Endpoints
//!
//! - `GET /health`: Returns service health status
//! - `GET /api/social/health`: Checks every configured account

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use socialcheck::db::{create_social_accounts_table, get_db_pool};
use socialcheck::platforms::build_http_client;
use socialcheck::{
    build_router, get_server_port, start_health_cronjob, AdapterRegistry, AppState,
    CredentialStore, DbCredentialStore, EnvCredentialStore, HealthCheckConfig,
    HealthCheckDispatcher,
};

/// Connects the database store when `DATABASE_URL` is set.
async fn connect_db_store() -> Option<Arc<dyn CredentialStore>> {
    if std::env::var("DATABASE_URL").is_err() {
        info!("DATABASE_URL not set - mode=db requests will be rejected");
        return None;
    }

    let pool = match get_db_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return None;
        }
    };
    if let Err(e) = create_social_accounts_table(&pool).await {
        warn!("Failed to ensure social_accounts table exists: {}", e);
    }

    match DbCredentialStore::from_env(pool) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            error!("Database credential store disabled: {}", e);
            None
        }
    }
}

/// Main entry point for the socialcheck web service.
///
/// Initializes logging, loads configuration, builds the adapter registry and
/// credential stores, starts the optional scheduled sweep and serves HTTP
/// until terminated.
///
/// # Example Usage
///
/// ```bash
/// # Run with default port 3000
/// cargo run
///
/// # Run with debug logging and a sweep every 15 minutes
/// RUST_LOG=debug HEALTHCHECK_CRON="0 0/15 * * * *" cargo run
/// ```
#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::init();

    let config = match HealthCheckConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let port = match get_server_port() {
        Ok(port) => port,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let client = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let registry = AdapterRegistry::with_defaults(client, &config.endpoints);
    info!("Registered adapters for {} platforms", registry.len());

    let state = AppState {
        dispatcher: HealthCheckDispatcher::new(registry)
            .with_max_concurrency(config.max_concurrency),
        config: Arc::new(config),
        env_store: Arc::new(EnvCredentialStore::from_process_env()),
        db_store: connect_db_store().await,
    };

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = match start_health_cronjob(state.clone()).await {
        Ok(Some(scheduler)) => match scheduler.start().await {
            Ok(()) => {
                info!("Scheduled health sweep started");
                Some(scheduler)
            }
            Err(e) => {
                error!("Failed to start cronjob scheduler: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            error!("Failed to create cronjob scheduler: {}", e);
            None
        }
    };

    let app = build_router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!("Starting socialcheck server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("HTTP server error: {}", e);
    }
}
