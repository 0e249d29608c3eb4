//! Simulation engine for growing a tumor.
//!
//! The engine advances the population one candidate event at a time using
//! rejection kinetic Monte Carlo: a live cell is drawn uniformly, then a
//! uniform value in `[0, rate_bound)` decides between birth, death and a null
//! event. The bound is raised whenever a new species would exceed it, so every
//! species is sampled at its true rate.

use crate::context::SimulationContext;
use crate::genotype::GenotypeRegistry;
use crate::lattice::Lattice;
use crate::phylogeny::PhylogenyLog;
use crate::species::SpeciesTable;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sith_core::{
    Cell, Coord, Error, InvariantViolation, MutationId, Result, SimulationConfig, SpeciesId,
};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace};

/// Events between polls of the wall clock and external stop signals
const STOP_CHECK_INTERVAL: u64 = 1024;

/// Something that can ask a running simulation to stop between events.
pub trait StopSignal {
    fn should_stop(&self) -> bool;
}

impl<F: Fn() -> bool> StopSignal for F {
    fn should_stop(&self) -> bool {
        self()
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The population reached the configured target
    ReachedTarget,
    /// Every cell died
    Extinct,
    /// The run was stopped early; its state is still consistent
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    EventLimit,
    WallTime,
    Signal,
}

/// Result of a single candidate event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Birth {
        parent: SpeciesId,
        daughter: SpeciesId,
        coord: Coord,
        mutation: Option<MutationId>,
    },
    /// The chosen neighbour was occupied
    RejectedBirth { coord: Coord },
    Death { species: SpeciesId, coord: Coord },
    Null,
}

/// Running tallies of what the event loop has done
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    pub events: u64,
    pub births: u64,
    pub rejected_births: u64,
    pub deaths: u64,
    pub null_events: u64,
    pub mutations: u64,
    pub driver_mutations: u64,
}

pub struct Simulation<R = ChaCha8Rng> {
    context: SimulationContext,
    lattice: Lattice,
    species: SpeciesTable,
    phylogeny: PhylogenyLog,
    cells: Vec<Cell>,
    rng: R,
    counters: EventCounters,
    time: f64,
}

impl Simulation<ChaCha8Rng> {
    /// Build a run seeded from `config.seed`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    /// Build a run that draws from `rng`.
    ///
    /// The configuration is validated before the lattice or cell registry are
    /// allocated.
    pub fn with_rng(config: SimulationConfig, rng: R) -> Result<Self> {
        let context = SimulationContext::new(config)?;
        let config = context.config();

        let mut lattice = Lattice::new(context.dims());
        let mut species = SpeciesTable::founder(config.birth_rate, config.death_rate);
        let mut cells = Vec::with_capacity(config.population_target as usize);

        let founder = Cell::new(lattice.center(), SpeciesId::FOUNDER);
        lattice.place(founder.coord)?;
        species.increment(SpeciesId::FOUNDER, 1)?;
        cells.push(founder);

        debug!(
            side = lattice.side(),
            target = config.population_target,
            rate_bound = context.rate_bound(),
            "Simulation initialised"
        );

        Ok(Self {
            context,
            lattice,
            species,
            phylogeny: PhylogenyLog::new(),
            cells,
            rng,
            counters: EventCounters::default(),
            time: 0.0,
        })
    }

    /// Run until the target is reached, the population dies out, or a
    /// configured event/time limit is hit
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.run_until(&|| false)
    }

    /// Like [`run`](Self::run), additionally polling `stop` between events
    #[instrument(skip(self, stop), fields(
        target = self.context.config().population_target,
        seed = self.context.config().seed,
    ))]
    pub fn run_until<S: StopSignal + ?Sized>(&mut self, stop: &S) -> Result<RunOutcome> {
        let config = self.context.config().clone();
        info!(
            "Starting simulation: target {} cells, lattice side {}",
            config.population_target,
            self.lattice.side()
        );

        let started = Instant::now();
        let wall_limit = config.max_wall_time_secs.map(Duration::from_secs);

        let outcome = loop {
            if let Some(outcome) = self.terminal_outcome() {
                break outcome;
            }
            if config.max_events.is_some_and(|max| self.counters.events >= max) {
                break RunOutcome::Cancelled(CancelReason::EventLimit);
            }
            if self.counters.events % STOP_CHECK_INTERVAL == 0 {
                if wall_limit.is_some_and(|limit| started.elapsed() >= limit) {
                    break RunOutcome::Cancelled(CancelReason::WallTime);
                }
                if stop.should_stop() {
                    break RunOutcome::Cancelled(CancelReason::Signal);
                }
            }

            self.step()?;

            if self.counters.events % config.progress_interval == 0 {
                self.emit_progress();
            }
        };

        self.emit_run_summary(outcome, started.elapsed());
        Ok(outcome)
    }

    /// Terminal state, if the population has reached one
    pub fn terminal_outcome(&self) -> Option<RunOutcome> {
        let live = self.population();
        if live == 0 {
            Some(RunOutcome::Extinct)
        } else if live >= self.context.config().population_target {
            Some(RunOutcome::ReachedTarget)
        } else {
            None
        }
    }

    /// Process one candidate event.
    ///
    /// Calling this on an extinct population is a no-op returning
    /// [`Event::Null`].
    pub fn step(&mut self) -> Result<Event> {
        if self.cells.is_empty() {
            return Ok(Event::Null);
        }

        let rate_bound = self.context.rate_bound();
        let live = self.cells.len() as f64;
        // 1 - U lies in (0, 1], so the logarithm is finite
        let waiting: f64 = 1.0 - self.rng.gen::<f64>();
        self.time += -waiting.ln() / (live * rate_bound);
        self.counters.events += 1;

        let index = self.rng.gen_range(0..self.cells.len());
        let cell = self.cells[index];
        let species = self.species.get(cell.species)?;
        let (birth_rate, death_rate) = (species.birth_rate, species.death_rate);
        debug_assert!(birth_rate + death_rate <= rate_bound);

        let draw = self.rng.gen::<f64>() * rate_bound;
        if draw < birth_rate {
            self.attempt_birth(cell)
        } else if draw < birth_rate + death_rate {
            self.kill(index)
        } else {
            self.counters.null_events += 1;
            Ok(Event::Null)
        }
    }

    fn attempt_birth(&mut self, parent: Cell) -> Result<Event> {
        let neighbors = self.lattice.neighbors6(parent.coord);
        let target = neighbors[self.rng.gen_range(0..neighbors.len())];

        if self.lattice.is_occupied(target)? {
            self.counters.rejected_births += 1;
            trace!(coord = %target, "Birth rejected: site occupied");
            return Ok(Event::RejectedBirth { coord: target });
        }
        if self.lattice.on_boundary(target) {
            return Err(Error::CapacityExceeded {
                coord: target,
                side: self.lattice.side(),
            });
        }

        let (daughter, mutation) = if self.rng.gen_bool(self.context.config().mutation_prob) {
            let (species, mutation) = self.mutate(parent.species)?;
            (species, Some(mutation))
        } else {
            (parent.species, None)
        };

        self.lattice.place(target)?;
        self.species.increment(daughter, 1)?;
        self.cells.push(Cell::new(target, daughter));
        self.counters.births += 1;

        Ok(Event::Birth {
            parent: parent.species,
            daughter,
            coord: target,
            mutation,
        })
    }

    /// Give a daughter of `parent` one new mutation and resolve its species
    fn mutate(&mut self, parent: SpeciesId) -> Result<(SpeciesId, MutationId)> {
        let mutation = self.context.registry.next_mutation_id()?;
        let is_driver = self.rng.gen_bool(self.context.config().driver_prob);
        self.counters.mutations += 1;

        let parent_species = self.species.get(parent)?;
        let mut genotype = parent_species.genotype.clone();
        genotype.push(mutation);

        let death_rate = parent_species.death_rate;
        let birth_rate = if is_driver {
            self.context.registry.mark_driver(mutation)?;
            self.counters.driver_mutations += 1;
            parent_species.birth_rate * (1.0 + self.context.config().selection)
        } else {
            parent_species.birth_rate
        };

        let (daughter, created) =
            self.species
                .lookup_or_create(genotype, birth_rate, death_rate, parent)?;
        if created {
            self.phylogeny.record(daughter, parent)?;
            if self.context.raise_rate_bound(birth_rate + death_rate) {
                debug!(
                    species = %daughter,
                    rate_bound = self.context.rate_bound(),
                    "Raised rejection rate bound"
                );
            }
            debug!(
                species = %daughter,
                parent = %parent,
                mutation = %mutation,
                driver = is_driver,
                birth_rate = birth_rate,
                "New species"
            );
        }

        Ok((daughter, mutation))
    }

    fn kill(&mut self, index: usize) -> Result<Event> {
        let cell = self.cells.swap_remove(index);
        self.lattice.remove(cell.coord)?;
        self.species.decrement(cell.species, 1)?;
        self.counters.deaths += 1;

        if self.cells.is_empty() {
            info!(events = self.counters.events, "Population went extinct");
        }

        Ok(Event::Death {
            species: cell.species,
            coord: cell.coord,
        })
    }

    /// Check every bookkeeping invariant against the current state.
    ///
    /// This walks all cells and species, so it is meant for tests and
    /// post-run audits rather than the inner loop.
    pub fn verify(&self) -> Result<()> {
        let live = self.population();
        let occupied = self.lattice.occupied();
        let species_total = self.species.total_count();
        if live != occupied || live != species_total {
            return Err(InvariantViolation::PopulationMismatch {
                live,
                occupied,
                species_total,
            }
            .into());
        }

        let mut tallies = vec![0u64; self.species.len()];
        for cell in &self.cells {
            if !self.lattice.is_occupied(cell.coord)? {
                return Err(InvariantViolation::EmptySite { coord: cell.coord }.into());
            }
            let tally = tallies
                .get_mut(cell.species.index())
                .ok_or(InvariantViolation::UnknownSpecies(cell.species))?;
            *tally += 1;
        }

        let registry = &self.context.registry;
        for (species, tallied) in self.species.iter().zip(tallies) {
            if species.count != tallied {
                return Err(InvariantViolation::SpeciesCountMismatch {
                    species: species.id,
                    recorded: species.count,
                    tallied,
                }
                .into());
            }

            let mut seen = HashSet::with_capacity(species.genotype.len());
            for &mutation in &species.genotype {
                if !registry.is_assigned(mutation) {
                    return Err(InvariantViolation::UnknownMutation(mutation).into());
                }
                if !seen.insert(mutation) {
                    return Err(InvariantViolation::DuplicateMutationInGenotype {
                        species: species.id,
                        mutation,
                    }
                    .into());
                }
            }

            if !species.id.is_founder() && self.phylogeny.parent_of(species.id) != species.parent {
                return Err(InvariantViolation::MissingPhylogenyEdge(species.id).into());
            }
        }

        Ok(())
    }

    fn emit_progress(&self) {
        info!(
            event = "progress",
            events = self.counters.events,
            population = self.population(),
            species = self.species.len(),
            mutations = self.context.registry.total_mutations(),
            drivers = self.context.registry.driver_count(),
            time = self.time,
            "Progress: {} cells after {} events",
            self.population(),
            self.counters.events
        );
    }

    fn emit_run_summary(&self, outcome: RunOutcome, elapsed: Duration) {
        let rejection_rate = if self.counters.events > 0 {
            (self.counters.null_events + self.counters.rejected_births) as f64
                / self.counters.events as f64
                * 100.0
        } else {
            0.0
        };

        info!(
            event = "run_summary",
            outcome = ?outcome,
            population = self.population(),
            species_total = self.species.len(),
            species_extant = self.species.extant().count(),
            mutations = self.context.registry.total_mutations(),
            drivers = self.context.registry.driver_count(),
            events = self.counters.events,
            births = self.counters.births,
            deaths = self.counters.deaths,
            rejected_births = self.counters.rejected_births,
            null_events = self.counters.null_events,
            wasted_draws = format!("{:.2}%", rejection_rate),
            simulated_time = self.time,
            wall_secs = elapsed.as_secs_f64(),
            "Simulation finished"
        );
    }

    /// Number of live cells
    pub fn population(&self) -> u64 {
        self.cells.len() as u64
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn phylogeny(&self) -> &PhylogenyLog {
        &self.phylogeny
    }

    pub fn registry(&self) -> &GenotypeRegistry {
        &self.context.registry
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn counters(&self) -> &EventCounters {
        &self.counters
    }

    /// Simulated time elapsed, in units of the inverse rates
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Length of a cell's genotype, its mutation burden
    pub fn genotype_length(&self, cell: &Cell) -> Result<usize> {
        Ok(self.species.get(cell.species)?.genotype.len())
    }
}
