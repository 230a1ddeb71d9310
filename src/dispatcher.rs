//! Concurrent health checks over a batch of accounts.
//!
//! Every account gets its own task and its own result slot. Slots are
//! addressed by submission index, so the report order never depends on which
//! check finishes first, and no task ever touches another task's slot.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::accounts::{CredentialSource, Platform, SocialAccount};
use crate::config::DEFAULT_MAX_CONCURRENCY;
use crate::platforms::AdapterRegistry;
use crate::report::{CheckError, ErrorKind, HealthReport, TestResult};
use crate::token::account_expired;

/// Structural failures that stop a batch before any check runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no social accounts are configured for mode '{0}'")]
    NoAccounts(CredentialSource),

    #[error("account id '{0}' appears more than once in the batch")]
    DuplicateAccountId(String),
}

/// Runs platform adapters concurrently and assembles a [`HealthReport`].
#[derive(Clone)]
pub struct HealthCheckDispatcher {
    registry: Arc<AdapterRegistry>,
    max_concurrency: usize,
}

impl HealthCheckDispatcher {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Caps the number of checks in flight. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Checks every account and returns results in submission order.
    ///
    /// Each check is bounded by `per_check_timeout`, measured from the moment
    /// the check acquires a concurrency slot. A failing, timed-out or
    /// panicking check only ever affects its own result.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NoAccounts`] if `accounts` is empty
    /// - [`DispatchError::DuplicateAccountId`] if two accounts share an id
    pub async fn run(
        &self,
        mode: CredentialSource,
        accounts: Vec<SocialAccount>,
        live: bool,
        per_check_timeout: Duration,
    ) -> Result<HealthReport, DispatchError> {
        if accounts.is_empty() {
            warn!("Health check requested with no accounts (mode: {})", mode);
            return Err(DispatchError::NoAccounts(mode));
        }
        if let Some(id) = find_duplicate_id(&accounts) {
            return Err(DispatchError::DuplicateAccountId(id));
        }

        info!(
            "Starting health check of {} accounts (mode: {}, live: {}, timeout: {:?})",
            accounts.len(),
            mode,
            live,
            per_check_timeout
        );

        let identities: Vec<(String, Platform)> = accounts
            .iter()
            .map(|a| (a.id.clone(), a.platform))
            .collect();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let handles: Vec<JoinHandle<TestResult>> = accounts
            .into_iter()
            .map(|account| {
                let registry = Arc::clone(&self.registry);
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    // The semaphore is never closed, so acquire cannot fail
                    let _permit = semaphore.acquire_owned().await.ok();
                    check_account(&registry, &account, live, per_check_timeout).await
                })
            })
            .collect();

        // Dropping this future, e.g. on a caller deadline, aborts every check
        // still queued or in flight.
        let mut tasks = AbortOnDrop(handles);
        let mut slots: Vec<Option<TestResult>> = vec![None; tasks.0.len()];
        for (index, handle) in tasks.0.iter_mut().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let (id, platform) = &identities[index];
                    error!("Health check task for account '{}' aborted: {}", id, e);
                    TestResult::failure(
                        id,
                        *platform,
                        CheckError::new(ErrorKind::NetworkError, "check task aborted"),
                        0,
                    )
                }
            };
            slots[index] = Some(result);
        }

        let results: Vec<TestResult> = slots.into_iter().flatten().collect();
        let report = HealthReport::from_results(mode, live, results);
        info!(
            "Health check finished: {}/{} accounts healthy",
            report.count - report.failed_count(),
            report.count
        );
        Ok(report)
    }
}

/// Aborts the wrapped tasks when dropped. Aborting a finished task is a no-op.
struct AbortOnDrop(Vec<JoinHandle<TestResult>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn find_duplicate_id(accounts: &[SocialAccount]) -> Option<String> {
    let mut seen = HashSet::with_capacity(accounts.len());
    for account in accounts {
        if !seen.insert(account.id.as_str()) {
            return Some(account.id.clone());
        }
    }
    None
}

/// Checks one account: expiry short-circuit, adapter lookup, then the
/// adapter call under the per-account deadline.
async fn check_account(
    registry: &AdapterRegistry,
    account: &SocialAccount,
    live: bool,
    per_check_timeout: Duration,
) -> TestResult {
    let started = Instant::now();
    let elapsed_ms = |started: Instant| started.elapsed().as_millis() as u64;

    if account_expired(account, Utc::now()) {
        debug!("Account '{}' token expired, skipping network call", account.id);
        let error = CheckError::new(
            ErrorKind::TokenExpired,
            format!(
                "access token expired at {}",
                account
                    .expires_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default()
            ),
        );
        return TestResult::failure(&account.id, account.platform, error, elapsed_ms(started));
    }

    let adapter = match registry.adapter_for(account) {
        Ok(adapter) => adapter,
        Err(error) => {
            return TestResult::failure(&account.id, account.platform, error, elapsed_ms(started))
        }
    };

    let call = async {
        if live {
            adapter.test_post(account).await
        } else {
            adapter.verify(account).await
        }
    };

    // Dropping the future on timeout cancels the in-flight request
    let outcome = match tokio::time::timeout(per_check_timeout, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(CheckError::new(
            ErrorKind::Timeout,
            format!("check exceeded {} ms", per_check_timeout.as_millis()),
        )),
    };

    let latency_ms = elapsed_ms(started);
    match outcome {
        Ok(outcome) => {
            debug!("Account '{}' healthy in {} ms", account.id, latency_ms);
            TestResult::success(account, outcome, latency_ms)
        }
        Err(error) => {
            warn!(
                "Account '{}' ({}) failed health check: {}",
                account.id, account.platform, error
            );
            TestResult::failure(&account.id, account.platform, error, latency_ms)
        }
    }
}
