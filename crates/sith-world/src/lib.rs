//! Tumor growth simulation engine.
//!
//! This crate implements the 3D lattice where cells divide, mutate and die,
//! together with the species and phylogeny bookkeeping that tracks the
//! resulting clonal structure.

pub mod context;
pub mod genotype;
pub mod lattice;
pub mod phylogeny;
pub mod run;
pub mod simulation;
pub mod species;

pub use context::SimulationContext;
pub use genotype::GenotypeRegistry;
pub use lattice::Lattice;
pub use phylogeny::{PhylogenyEdge, PhylogenyLog};
pub use run::{RunJob, RunReport, RunSummary};
pub use simulation::{CancelReason, Event, EventCounters, RunOutcome, Simulation, StopSignal};
pub use species::{Species, SpeciesTable};
