//! Account Health Check Script
//!
//! Runs one credential health check from the command line and prints the JSON
//! report.
//!
//! Usage:
//!   check_accounts [--live] [--mode env|db]
//!
//! Exit codes: 0 when every account passed, 2 when at least one failed,
//! 1 when the check could not run at all.

use std::process;
use std::sync::Arc;

use socialcheck::db::get_db_pool;
use socialcheck::platforms::build_http_client;
use socialcheck::{
    AdapterRegistry, CredentialSource, CredentialStore, DbCredentialStore, EnvCredentialStore,
    HealthCheckConfig, HealthCheckDispatcher,
};

struct Options {
    live: bool,
    mode: CredentialSource,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        live: false,
        mode: CredentialSource::Env,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--live" => options.live = true,
            "--mode" => {
                let value = args.next().ok_or("--mode requires a value")?;
                options.mode = value.parse()?;
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(options)
}

async fn run(options: Options) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let config = HealthCheckConfig::from_env()?;
    let registry = AdapterRegistry::with_defaults(build_http_client()?, &config.endpoints);
    let dispatcher =
        HealthCheckDispatcher::new(registry).with_max_concurrency(config.max_concurrency);

    let store: Arc<dyn CredentialStore> = match options.mode {
        CredentialSource::Env => Arc::new(EnvCredentialStore::from_process_env()),
        CredentialSource::Db => Arc::new(DbCredentialStore::from_env(get_db_pool().await?)?),
    };
    let accounts = store.list().await?;

    let report = tokio::time::timeout(
        config.batch_timeout,
        dispatcher.run(options.mode, accounts, options.live, config.check_timeout),
    )
    .await
    .map_err(|_| "health check did not finish within the batch deadline")??;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.ok)
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("Usage: check_accounts [--live] [--mode env|db]");
            process::exit(1);
        }
    };

    match run(options).await {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("❌ Health check failed: {}", e);
            process::exit(1);
        }
    }
}
