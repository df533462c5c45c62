//! `asset-sync`: run one pipeline pass with the configuration taken from the
//! environment, print the run report as JSON and exit non-zero when any
//! asset, object or phase failed.

use anyhow::Context;
use core_runtime::config::PipelineConfig;
use core_runtime::logging::init_logging;
use core_service::{bootstrap_desktop, logging_config_from_env};
use core_sync::RunStatus;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging(logging_config_from_env()).context("failed to initialize logging")?;

    let config = PipelineConfig::from_env().context("invalid configuration")?;
    info!(
        source = ?config.source_root,
        output = ?config.output_root,
        remote = config.remote.is_some(),
        publish = config.vcs.is_some(),
        "Starting pipeline pass"
    );

    let service = bootstrap_desktop(config).context("failed to bootstrap service")?;
    let report = match service.run_once().await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "Pipeline pass failed");
            return Err(err).context("pipeline pass failed");
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(match report.status() {
        RunStatus::Completed => ExitCode::SUCCESS,
        RunStatus::CompletedWithErrors => ExitCode::from(2),
    })
}
