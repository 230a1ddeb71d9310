//! Cronjob module for scheduled health sweeps.
//!
//! When `HEALTHCHECK_CRON` is set, the service periodically checks the
//! environment-configured accounts and logs a summary, so broken credentials
//! show up in the logs before anyone calls the HTTP endpoint.

use log::{error, info, warn};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::accounts::CredentialSource;
use crate::handlers::AppState;
use crate::report::HealthReport;

/// Runs one env-mode health check and logs every failing account.
///
/// # Returns
///
/// - `Ok(HealthReport)`: The report of the sweep
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If the accounts could not be listed or the batch was rejected
pub async fn run_health_sweep(
    state: &AppState,
    live: bool,
) -> Result<HealthReport, Box<dyn std::error::Error + Send + Sync>> {
    let mode = CredentialSource::Env;
    let accounts = state.store_for(mode)?.list().await?;
    let report = state
        .dispatcher
        .run(mode, accounts, live, state.config.check_timeout)
        .await?;

    for result in report.results.iter().filter(|r| !r.ok) {
        warn!(
            "Account '{}' ({}) failed: {} - {}",
            result.account_id,
            result.platform,
            result
                .error_kind
                .map(|k| k.to_string())
                .unwrap_or_default(),
            result.detail.as_deref().unwrap_or("")
        );
    }
    info!(
        "Scheduled health sweep: {}/{} accounts healthy",
        report.count - report.failed_count(),
        report.count
    );

    Ok(report)
}

/// Creates the scheduler for the periodic health sweep.
///
/// The job uses the cron expression from `HEALTHCHECK_CRON` (six or seven
/// fields, seconds first, e.g. `"0 0/15 * * * *"`) and runs live post tests
/// only when `HEALTHCHECK_CRON_LIVE` is true.
///
/// # Returns
///
/// - `Ok(Some(JobScheduler))`: The configured, not yet started, scheduler
/// - `Ok(None)`: If no schedule is configured
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If the scheduler cannot be created or the expression is invalid
///
/// # Example
///
/// ```rust,no_run
/// use socialcheck::{start_health_cronjob, AppState};
///
/// async fn run(state: AppState) {
///     if let Some(scheduler) = start_health_cronjob(state).await.unwrap() {
///         scheduler.start().await.unwrap();
///     }
/// }
/// ```
pub async fn start_health_cronjob(
    state: AppState,
) -> Result<Option<JobScheduler>, Box<dyn std::error::Error + Send + Sync>> {
    let schedule = match state.config.cron_schedule.clone() {
        Some(schedule) => schedule,
        None => return Ok(None),
    };
    let live = state.config.cron_live;

    let sched = JobScheduler::new().await?;
    sched
        .add(Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let state = state.clone();
            Box::pin(async move {
                info!("Starting scheduled health sweep (live: {})", live);
                if let Err(e) = run_health_sweep(&state, live).await {
                    error!("Scheduled health sweep failed: {}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduled health sweep registered with schedule '{}'", schedule);
    Ok(Some(sched))
}
