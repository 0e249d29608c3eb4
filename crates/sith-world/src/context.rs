//! Per-run simulation context.

use crate::genotype::GenotypeRegistry;
use sith_core::{LatticeDims, Result, SimulationConfig};

/// Everything a run needs that is not tied to a particular cell or species:
/// the validated configuration, the lattice dimensions derived from it, the
/// rejection-sampling rate bound, and the mutation registry.
///
/// Each run owns exactly one context, so independent runs never share state.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    config: SimulationConfig,
    dims: LatticeDims,
    rate_bound: f64,
    pub registry: GenotypeRegistry,
}

impl SimulationContext {
    /// Validate `config` and derive the run parameters from it
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let dims = config.validate()?;
        let rate_bound = config.initial_rate_bound();

        Ok(Self {
            config,
            dims,
            rate_bound,
            registry: GenotypeRegistry::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn dims(&self) -> LatticeDims {
        self.dims
    }

    /// Current upper bound on any species' `birth_rate + death_rate`
    pub fn rate_bound(&self) -> f64 {
        self.rate_bound
    }

    /// Raise the bound to cover `total_rate`. Returns `true` if it moved.
    pub fn raise_rate_bound(&mut self, total_rate: f64) -> bool {
        if total_rate > self.rate_bound {
            self.rate_bound = total_rate;
            true
        } else {
            false
        }
    }
}
