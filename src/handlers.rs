//! HTTP route handlers for the socialcheck service.
//!
//! This module contains the route handlers, their shared state and the router
//! that wires them together.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::accounts::CredentialSource;
use crate::config::HealthCheckConfig;
use crate::dispatcher::HealthCheckDispatcher;
use crate::report::HealthReport;
use crate::store::CredentialStore;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: HealthCheckDispatcher,
    pub config: Arc<HealthCheckConfig>,
    pub env_store: Arc<dyn CredentialStore>,
    /// Absent when no `DATABASE_URL` is configured
    pub db_store: Option<Arc<dyn CredentialStore>>,
}

impl AppState {
    /// Resolves the credential store for a mode.
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn CredentialStore>)`: The store backing `mode`
    /// - `Err(String)`: If `mode` is `db` and no database is configured
    pub fn store_for(&self, mode: CredentialSource) -> Result<Arc<dyn CredentialStore>, String> {
        match mode {
            CredentialSource::Env => Ok(self.env_store.clone()),
            CredentialSource::Db => self.db_store.clone().ok_or_else(|| {
                "database credential store is not configured (DATABASE_URL is not set)".to_string()
            }),
        }
    }
}

/// Query parameters accepted by `/api/social/health`.
#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    pub live: Option<String>,
    pub mode: Option<String>,
}

type ErrorResponse = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (status, Json(json!({"ok": false, "error": message.into()})))
}

/// Builds the application router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/social/health", get(handle_social_health))
        .with_state(state)
}

/// Handles GET requests to the `/health` endpoint.
///
/// This endpoint reports that the service itself is up. It never touches any
/// social platform.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "socialcheck"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "socialcheck"}))
}

/// Handles GET requests to the `/api/social/health` endpoint.
///
/// Lists the accounts for the requested credential mode, checks all of them
/// concurrently and returns the [`HealthReport`].
///
/// # Query Parameters
///
/// - `live`: also run each platform's post test (default `false`)
/// - `mode`: `env` or `db` (default `env`)
///
/// # Returns
///
/// - `200 OK`: Every account passed
/// - `207 Multi-Status`: At least one account failed; the report says which
/// - `400 Bad Request`: Unknown mode, no accounts, or duplicate account ids
/// - `500 Internal Server Error`: The store could not be read or the batch deadline passed
///
/// Error bodies have the shape `{"ok": false, "error": "<message>"}`.
pub async fn handle_social_health(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> Result<(StatusCode, Json<HealthReport>), ErrorResponse> {
    let live = match query.live.as_deref() {
        None => false,
        Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
            let message = format!("invalid live flag '{}', expected 'true' or 'false'", raw);
            warn!("Rejected health check request: {}", message);
            error_response(StatusCode::BAD_REQUEST, message)
        })?,
    };
    let mode = match query.mode.as_deref() {
        None => CredentialSource::default(),
        Some(raw) => raw.parse::<CredentialSource>().map_err(|e| {
            warn!("Rejected health check request: {}", e);
            error_response(StatusCode::BAD_REQUEST, e)
        })?,
    };

    info!("Social health check requested (mode: {}, live: {})", mode, live);

    let store = state.store_for(mode).map_err(|e| {
        error!("Cannot serve {} mode health check: {}", mode, e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;

    let accounts = store.list().await.map_err(|e| {
        error!("Failed to list {} accounts: {}", mode, e);
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to load accounts: {}", e),
        )
    })?;

    let run = state
        .dispatcher
        .run(mode, accounts, live, state.config.check_timeout);
    let report = match tokio::time::timeout(state.config.batch_timeout, run).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            warn!("Health check rejected: {}", e);
            return Err(error_response(StatusCode::BAD_REQUEST, e.to_string()));
        }
        Err(_) => {
            error!(
                "Health check exceeded the batch deadline of {:?}",
                state.config.batch_timeout
            );
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "health check did not finish within {} ms",
                    state.config.batch_timeout.as_millis()
                ),
            ));
        }
    };

    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    info!(
        "Social health check finished: {}/{} accounts healthy",
        report.count - report.failed_count(),
        report.count
    );
    Ok((status, Json(report)))
}
