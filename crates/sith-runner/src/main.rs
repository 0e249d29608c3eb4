//! Batch runner: executes an ensemble of tumour growth runs and exports each.

mod config;
mod ensemble;
mod telemetry;

use anyhow::{bail, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_logging()?;

    let runner = config::runner_config_from_env()?;
    let simulation = config::load_simulation_config(runner.config_path.as_deref())?;

    info!("Starting SITH runner");
    info!(
        runs = runner.runs,
        concurrency = runner.max_concurrent_runs,
        output_dir = %runner.output_dir,
        target = simulation.population_target,
        "Ensemble configured"
    );

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    let report = ensemble::run_ensemble(&runner, simulation, token).await?;

    for run in &report.completed {
        info!(
            run_id = %run.summary.run_id,
            seed = run.summary.seed,
            outcome = ?run.summary.outcome,
            population = run.summary.population,
            species = run.summary.species_total,
            wall_secs = run.summary.wall_secs(),
            dir = %run.export_dir.display(),
            "Run result"
        );
    }

    for run in &report.failed {
        error!(seed = run.seed, error = %run.error, "Run did not complete");
    }

    if !report.failed.is_empty() {
        bail!(
            "{} of {} runs failed",
            report.failed.len(),
            report.failed.len() + report.completed.len()
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping runs");
}
