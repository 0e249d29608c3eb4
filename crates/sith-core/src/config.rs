//! Configuration types for the simulation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Number of candidate events between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 2_000_000;

/// Largest lattice side representable with `i16` coordinates
pub const MAX_LATTICE_SIDE: u32 = i16::MAX as u32;

/// Smallest lattice side that still has an interior site
pub const MIN_LATTICE_SIDE: u32 = 3;

/// Parameters of a single tumor growth run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Stop once this many cells are alive
    pub population_target: u64,
    /// Wild-type birth rate
    pub birth_rate: f64,
    /// Wild-type death rate
    pub death_rate: f64,
    /// Probability that a division produces a new mutation (u)
    pub mutation_prob: f64,
    /// Probability that a new mutation is a driver (du)
    pub driver_prob: f64,
    /// Selective advantage of a driver mutation (s)
    pub selection: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Explicit lattice side, overriding the population-based sizing
    pub lattice_side: Option<u32>,
    /// Stop after this many candidate events
    pub max_events: Option<u64>,
    /// Stop after this much wall-clock time
    pub max_wall_time_secs: Option<u64>,
    /// Events between progress log lines
    pub progress_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population_target: 100_000,
            birth_rate: 1.0,
            death_rate: 0.0,
            mutation_prob: 0.01,
            driver_prob: 0.003,
            selection: 0.1,
            seed: 0,
            lattice_side: None,
            max_events: None,
            max_wall_time_secs: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl SimulationConfig {
    /// Check every parameter, returning the lattice dimensions to allocate.
    ///
    /// Each violated constraint maps to its own `ConfigError` variant; nothing is
    /// clamped.
    pub fn validate(&self) -> Result<LatticeDims, ConfigError> {
        if self.population_target < 1 {
            return Err(ConfigError::PopulationTargetTooSmall(self.population_target));
        }

        for (name, value) in [
            ("birth", self.birth_rate),
            ("death", self.death_rate),
            ("mutation probability", self.mutation_prob),
            ("driver probability", self.driver_prob),
            ("selection coefficient", self.selection),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteRate { name, value });
            }
        }

        if self.death_rate > self.birth_rate {
            return Err(ConfigError::DeathExceedsBirth {
                birth: self.birth_rate,
                death: self.death_rate,
            });
        }
        if self.birth_rate < 0.0 {
            return Err(ConfigError::NegativeRate {
                name: "birth",
                value: self.birth_rate,
            });
        }
        if self.death_rate < 0.0 {
            return Err(ConfigError::NegativeRate {
                name: "death",
                value: self.death_rate,
            });
        }
        if self.birth_rate == 0.0 {
            return Err(ConfigError::ZeroBirthRate);
        }
        if !(0.0..=1.0).contains(&self.mutation_prob) {
            return Err(ConfigError::MutationProbabilityOutOfRange(self.mutation_prob));
        }
        if !(0.0..=1.0).contains(&self.driver_prob) {
            return Err(ConfigError::DriverProbabilityOutOfRange(self.driver_prob));
        }
        if self.selection < 0.0 {
            return Err(ConfigError::NegativeSelection(self.selection));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::ZeroProgressInterval);
        }

        let side = self
            .lattice_side
            .unwrap_or_else(|| LatticeDims::for_target(self.population_target).side);
        LatticeDims::with_side(side, self.population_target)
    }

    /// Upper bound on the per-cell event rate at run start
    pub fn initial_rate_bound(&self) -> f64 {
        self.birth_rate + self.death_rate
    }
}

/// Side length of the cubic lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeDims {
    pub side: u32,
}

impl LatticeDims {
    /// Pick a side from the population target using coarse bands.
    ///
    /// The bands leave enough headroom that a compact cluster grown from the
    /// centre reaches the target well before touching the boundary.
    pub fn for_target(target: u64) -> Self {
        let side = if target > 100_000_000 {
            2000
        } else if target > 10_000_000 {
            1000
        } else {
            500
        };
        Self { side }
    }

    /// Use an explicit side, rejecting volumes whose interior can not hold the target
    pub fn with_side(side: u32, target: u64) -> Result<Self, ConfigError> {
        if !(MIN_LATTICE_SIDE..=MAX_LATTICE_SIDE).contains(&side) {
            return Err(ConfigError::LatticeSideOutOfRange {
                side,
                max: MAX_LATTICE_SIDE,
            });
        }
        let dims = Self { side };
        if dims.interior_capacity() < target {
            return Err(ConfigError::LatticeTooSmall {
                side,
                capacity: dims.interior_capacity(),
                target,
            });
        }
        Ok(dims)
    }

    /// Total number of sites
    pub fn capacity(&self) -> u64 {
        u64::from(self.side).pow(3)
    }

    /// Sites not touching the boundary; cells are never placed outside these
    pub fn interior_capacity(&self) -> u64 {
        u64::from(self.side - 2).pow(3)
    }

    /// Coordinate of the centre along every axis
    pub fn half(&self) -> i16 {
        // side <= MAX_LATTICE_SIDE, so side / 2 always fits
        (self.side / 2) as i16
    }
}

/// Settings for the batch runner binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Path to a JSON `SimulationConfig`; defaults are used when absent
    pub config_path: Option<String>,
    /// Directory that receives one sub-directory of exports per run
    pub output_dir: String,
    /// Number of independent runs in the ensemble
    pub runs: usize,
    /// Seed of the first run; run `i` uses `base_seed + i`
    pub base_seed: Option<u64>,
    /// Wall-clock cap applied to every run
    pub run_timeout_secs: Option<u64>,
    /// Runs executed at the same time
    pub max_concurrent_runs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            output_dir: "./data/runs".to_string(),
            runs: 1,
            base_seed: None,
            run_timeout_secs: None,
            max_concurrent_runs: 4,
        }
    }
}
