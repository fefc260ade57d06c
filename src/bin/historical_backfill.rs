//! # Historical Backfill CLI
//!
//! Runs one backfill job described by an INI configuration file.
//!
//! ```text
//! historical-backfill <CONFIG> [USERNAME] [PASSWORD]
//! ```
//!
//! Exit status is 0 on success, 2 for configuration errors and 1 for any
//! other failure.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use historical_backfill::config::{ConfigManager, CredentialOverrides};
use historical_backfill::database::PgConnectionProvider;
use historical_backfill::error::BackfillError;
use historical_backfill::logging::{init_structured_logging, log_error};
use historical_backfill::orchestration::{BackfillOrchestrator, RunSummary};
use historical_backfill::storage::S3ObjectStore;

#[derive(Parser, Debug)]
#[command(name = "historical-backfill")]
#[command(about = "Export a date range of a source table to S3 in fixed-size windows")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the INI configuration file
    config: PathBuf,

    /// Database username, used when the configuration leaves it unset
    username: Option<String>,

    /// Database password, used when the configuration leaves it unset
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_structured_logging();

    match run(cli).await {
        Ok(summary) => {
            info!(
                run_id = %summary.run_id,
                windows = summary.windows_processed,
                total_rows = summary.total_rows,
                ledger_key = summary.ledger_key.as_deref(),
                "Backfill finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let cause = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<BackfillError>());
            let code = cause.map_or(1, BackfillError::exit_code);
            let context = format!(
                "kind={} exit_code={code}",
                cause.map_or("unknown", BackfillError::kind)
            );
            log_error("cli", "run", &format!("{err:#}"), Some(&context));
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let overrides = CredentialOverrides {
        username: cli.username,
        password: cli.password,
    };

    let manager = ConfigManager::load_from_file(&cli.config, &overrides)
        .map_err(BackfillError::from)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    info!(config = %manager.debug_config(), "Configuration loaded");

    let config = Arc::new(manager.into_config());
    let run_id = Uuid::new_v4();

    let connections = Arc::new(PgConnectionProvider::from_config(&config.database));
    let store = Arc::new(S3ObjectStore::from_config(&config.storage, run_id).await);

    let mut orchestrator =
        BackfillOrchestrator::new(config, connections, store).with_run_id(run_id);
    let summary = orchestrator
        .run()
        .await
        .with_context(|| format!("backfill run {run_id} failed"))?;
    Ok(summary)
}
