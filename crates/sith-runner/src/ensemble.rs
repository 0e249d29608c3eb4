//! Independent runs executed by a pool of worker tasks.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sith_core::{RunnerConfig, SimulationConfig};
use sith_export::{write_projection, ColorScheme, ResultProjector};
use sith_world::{RunJob, RunSummary};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Result of a whole ensemble
#[derive(Debug, Default)]
pub struct EnsembleReport {
    pub completed: Vec<CompletedRun>,
    pub failed: Vec<FailedRun>,
}

#[derive(Debug)]
pub struct CompletedRun {
    pub summary: RunSummary,
    pub export_dir: PathBuf,
}

#[derive(Debug)]
pub struct FailedRun {
    pub seed: u64,
    pub error: String,
}

/// One job per run; run `i` is seeded with `base_seed + i`.
///
/// The runner timeout becomes each run's wall-time limit, keeping the tighter
/// of the two when the config already sets one.
pub fn plan_jobs(runner: &RunnerConfig, base: &SimulationConfig) -> Vec<RunJob> {
    let base_seed = runner.base_seed.unwrap_or(base.seed);
    let max_wall_time_secs = match (base.max_wall_time_secs, runner.run_timeout_secs) {
        (Some(own), Some(timeout)) => Some(own.min(timeout)),
        (own, timeout) => own.or(timeout),
    };
    (0..runner.runs)
        .map(|i| {
            RunJob::new(SimulationConfig {
                seed: base_seed.wrapping_add(i as u64),
                max_wall_time_secs,
                ..base.clone()
            })
        })
        .collect()
}

/// Execute every planned run on `max_concurrent_runs` worker tasks.
///
/// Cancelling `token` stops all runs between events; runs stopped this way
/// still export their committed state.
#[instrument(skip_all, fields(runs = runner.runs))]
pub async fn run_ensemble(
    runner: &RunnerConfig,
    base: SimulationConfig,
    token: CancellationToken,
) -> Result<EnsembleReport> {
    let output_dir = PathBuf::from(&runner.output_dir);
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let queue = Arc::new(Mutex::new(VecDeque::from(plan_jobs(runner, &base))));
    let workers = runner.max_concurrent_runs.min(runner.runs).max(1);

    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let queue = queue.clone();
        let token = token.clone();
        let output_dir = output_dir.clone();

        handles.push(tokio::spawn(async move {
            debug!("Worker task {} started", i);
            let mut results = Vec::new();
            loop {
                let next = queue.lock().await.pop_front();
                let Some(job) = next else { break };
                let seed = job.config.seed;
                let result = execute_job(job, &output_dir, token.clone()).await;
                results.push((seed, result));
            }
            results
        }));
    }

    let mut report = EnsembleReport::default();
    for handle in handles {
        let results = match handle.await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Worker task panicked");
                continue;
            }
        };
        for (seed, result) in results {
            match result {
                Ok(run) => report.completed.push(run),
                Err(e) => {
                    error!(seed, error = %e, "Run failed");
                    report.failed.push(FailedRun {
                        seed,
                        error: format!("{e:#}"),
                    });
                }
            }
        }
    }

    report.completed.sort_by_key(|run| run.summary.seed);
    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        "Ensemble finished"
    );
    Ok(report)
}

/// Run one job on a blocking worker and export its terminal state
#[instrument(skip_all, fields(run_id = %job.run_id, seed = job.config.seed))]
async fn execute_job(
    job: RunJob,
    output_dir: &Path,
    token: CancellationToken,
) -> Result<CompletedRun> {
    if token.is_cancelled() {
        warn!("Shutdown requested before the run started");
    }

    let export_dir = output_dir.join(job.run_id.to_string());
    let start = Instant::now();

    let stop_token = token;
    let dir = export_dir.clone();
    let summary = tokio::task::spawn_blocking(move || -> Result<RunSummary> {
        let stop = || stop_token.is_cancelled();
        let report = job.execute_until(&stop)?;

        let projection = ResultProjector::new().project(&report.simulation)?;
        let mut rng = ChaCha8Rng::seed_from_u64(report.summary.seed);
        let colors = ColorScheme::generate(report.simulation.species().len(), &mut rng);
        write_projection(&dir, &projection, &report.summary, &colors)?;

        Ok(report.summary)
    })
    .await??;

    info!(
        outcome = ?summary.outcome,
        population = summary.population,
        elapsed_secs = start.elapsed().as_secs_f64(),
        dir = %export_dir.display(),
        "Run exported"
    );

    Ok(CompletedRun {
        summary,
        export_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sith_world::{CancelReason, RunOutcome};

    fn base_config() -> SimulationConfig {
        SimulationConfig {
            population_target: 150,
            birth_rate: 1.0,
            death_rate: 0.1,
            mutation_prob: 0.2,
            driver_prob: 0.2,
            selection: 0.1,
            seed: 5,
            lattice_side: Some(41),
            ..Default::default()
        }
    }

    fn runner_config(runs: usize) -> RunnerConfig {
        RunnerConfig {
            output_dir: std::env::temp_dir()
                .join(format!("sith-runner-{}", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            runs,
            max_concurrent_runs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_jobs_seeds() {
        let runner = RunnerConfig {
            runs: 3,
            base_seed: Some(100),
            ..Default::default()
        };
        let seeds: Vec<u64> = plan_jobs(&runner, &base_config())
            .iter()
            .map(|job| job.config.seed)
            .collect();
        assert_eq!(seeds, vec![100, 101, 102]);

        let runner = RunnerConfig {
            runs: 2,
            ..Default::default()
        };
        let seeds: Vec<u64> = plan_jobs(&runner, &base_config())
            .iter()
            .map(|job| job.config.seed)
            .collect();
        assert_eq!(seeds, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_ensemble_exports_every_run() {
        let runner = runner_config(3);
        let report = run_ensemble(&runner, base_config(), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.failed.is_empty());
        assert_eq!(report.completed.len(), 3);
        for run in &report.completed {
            assert!(run.export_dir.join("summary.json").exists());
            assert!(run.export_dir.join("cells.json").exists());
        }
        std::fs::remove_dir_all(&runner.output_dir).unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_ensemble_still_exports() {
        let runner = runner_config(2);
        let token = CancellationToken::new();
        token.cancel();

        let config = SimulationConfig {
            population_target: 50_000,
            ..base_config()
        };
        let report = run_ensemble(&runner, config, token).await.unwrap();

        assert_eq!(report.completed.len(), 2);
        for run in &report.completed {
            assert_eq!(
                run.summary.outcome,
                RunOutcome::Cancelled(CancelReason::Signal)
            );
            assert!(run.export_dir.join("summary.json").exists());
        }
        std::fs::remove_dir_all(&runner.output_dir).unwrap();
    }

    #[test]
    fn test_plan_jobs_applies_run_timeout() {
        let runner = RunnerConfig {
            runs: 2,
            run_timeout_secs: Some(30),
            ..Default::default()
        };
        assert!(plan_jobs(&runner, &base_config())
            .iter()
            .all(|job| job.config.max_wall_time_secs == Some(30)));

        let tighter = SimulationConfig {
            max_wall_time_secs: Some(10),
            ..base_config()
        };
        assert!(plan_jobs(&runner, &tighter)
            .iter()
            .all(|job| job.config.max_wall_time_secs == Some(10)));

        let untimed = RunnerConfig {
            runs: 1,
            ..Default::default()
        };
        assert_eq!(plan_jobs(&untimed, &base_config())[0].config.max_wall_time_secs, None);
    }

    #[tokio::test]
    async fn test_timed_out_run_reports_wall_time() {
        let runner = RunnerConfig {
            run_timeout_secs: Some(0),
            ..runner_config(1)
        };
        let config = SimulationConfig {
            population_target: 50_000,
            ..base_config()
        };
        let report = run_ensemble(&runner, config, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.completed.len(), 1);
        let run = &report.completed[0];
        assert_eq!(
            run.summary.outcome,
            RunOutcome::Cancelled(CancelReason::WallTime)
        );
        assert!(run.export_dir.join("summary.json").exists());
        std::fs::remove_dir_all(&runner.output_dir).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_reported_per_run() {
        let runner = runner_config(2);
        let config = SimulationConfig {
            death_rate: 2.0,
            ..base_config()
        };
        let report = run_ensemble(&runner, config, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.completed.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report
            .failed
            .iter()
            .all(|f| f.error.contains("can not be greater than birth rate")));
        std::fs::remove_dir_all(&runner.output_dir).unwrap();
    }
}
