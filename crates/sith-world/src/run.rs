//! Isolated run wrapper for ensemble execution.

use crate::simulation::{EventCounters, RunOutcome, Simulation, StopSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sith_core::{MutationId, Result, RunId, SimulationConfig};
use tracing::{info, instrument};

/// A run that can be handed to a worker. It carries nothing but its
/// configuration, so every execution builds fresh state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunJob {
    pub run_id: RunId,
    pub config: SimulationConfig,
}

impl RunJob {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            run_id: RunId::new(),
            config,
        }
    }

    /// Execute this run to completion
    pub fn execute(self) -> Result<RunReport> {
        self.execute_until(&|| false)
    }

    /// Execute this run, polling `stop` between events
    #[instrument(skip(self, stop), fields(run_id = %self.run_id, seed = self.config.seed))]
    pub fn execute_until<S: StopSignal + ?Sized>(self, stop: &S) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut simulation = Simulation::new(self.config)?;
        let outcome = simulation.run_until(stop)?;
        let finished_at = Utc::now();

        let summary = RunSummary::from_simulation(
            self.run_id,
            outcome,
            &simulation,
            started_at,
            finished_at,
        );
        info!(
            run_id = %self.run_id,
            outcome = ?outcome,
            population = summary.population,
            species = summary.species_total,
            "Run complete"
        );

        Ok(RunReport {
            summary,
            simulation,
        })
    }
}

/// Terminal state of a run together with its summary
pub struct RunReport {
    pub summary: RunSummary,
    pub simulation: Simulation,
}

/// Serializable overview of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub seed: u64,
    pub population: u64,
    pub species_total: usize,
    pub species_extant: usize,
    pub total_mutations: u32,
    pub drivers: Vec<MutationId>,
    pub counters: EventCounters,
    pub simulated_time: f64,
    pub rate_bound: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn from_simulation<R: rand::Rng>(
        run_id: RunId,
        outcome: RunOutcome,
        simulation: &Simulation<R>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            outcome,
            seed: simulation.context().config().seed,
            population: simulation.population(),
            species_total: simulation.species().len(),
            species_extant: simulation.species().extant().count(),
            total_mutations: simulation.registry().total_mutations(),
            drivers: simulation.registry().drivers(),
            counters: simulation.counters().clone(),
            simulated_time: simulation.time(),
            rate_bound: simulation.context().rate_bound(),
            started_at,
            finished_at,
        }
    }

    pub fn wall_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            population_target: 200,
            birth_rate: 1.0,
            death_rate: 0.2,
            mutation_prob: 0.1,
            driver_prob: 0.1,
            selection: 0.2,
            seed,
            lattice_side: Some(41),
            ..Default::default()
        }
    }

    #[test]
    fn test_run_job_execute() {
        let job = RunJob::new(test_config(3));
        let run_id = job.run_id;
        let report = job.execute().unwrap();

        assert_eq!(report.summary.run_id, run_id);
        assert_eq!(report.summary.population, report.simulation.population());
        assert!(report.summary.finished_at >= report.summary.started_at);
        report.simulation.verify().unwrap();
    }

    #[test]
    fn test_runs_are_isolated() {
        // Two jobs with the same seed share nothing, so they must agree exactly
        let a = RunJob::new(test_config(11)).execute().unwrap();
        let b = RunJob::new(test_config(11)).execute().unwrap();

        assert_ne!(a.summary.run_id, b.summary.run_id);
        assert_eq!(a.summary.outcome, b.summary.outcome);
        assert_eq!(a.summary.counters, b.summary.counters);
        assert_eq!(a.simulation.cells(), b.simulation.cells());
        assert_eq!(a.summary.drivers, b.summary.drivers);
    }

    #[test]
    fn test_summary_serialization() {
        let report = RunJob::new(test_config(5)).execute().unwrap();
        let json = serde_json::to_string(&report.summary).unwrap();
        let decoded: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.run_id, report.summary.run_id);
        assert_eq!(decoded.outcome, report.summary.outcome);
    }
}
