//! Error types for the simulation.

use crate::types::{Coord, MutationId, SpeciesId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Capacity exceeded: growth reached the lattice boundary at {coord} (side {side})")]
    CapacityExceeded { coord: Coord, side: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Rejected simulation parameters, detected before anything is allocated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("population target must be at least 1, got {0}")]
    PopulationTargetTooSmall(u64),

    #[error("death rate {death} can not be greater than birth rate {birth}")]
    DeathExceedsBirth { birth: f64, death: f64 },

    #[error("{name} rate must be non-negative, got {value}")]
    NegativeRate { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFiniteRate { name: &'static str, value: f64 },

    #[error("mutation probability u must be in [0, 1], got {0}")]
    MutationProbabilityOutOfRange(f64),

    #[error("driver probability du must be in [0, 1], got {0}")]
    DriverProbabilityOutOfRange(f64),

    #[error("selection coefficient s must be non-negative, got {0}")]
    NegativeSelection(f64),

    #[error("lattice side must be in [3, {max}], got {side}")]
    LatticeSideOutOfRange { side: u32, max: u32 },

    #[error("lattice of side {side} holds {capacity} sites, fewer than the target {target}")]
    LatticeTooSmall { side: u32, capacity: u64, target: u64 },

    #[error("birth rate must be positive, otherwise the population can never change")]
    ZeroBirthRate,

    #[error("progress interval must be at least 1")]
    ZeroProgressInterval,
}

/// Internal consistency failures. Each variant carries the ids or coordinates
/// needed to diagnose the bug.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("site {coord} is already occupied")]
    OccupiedSite { coord: Coord },

    #[error("site {coord} is already empty")]
    EmptySite { coord: Coord },

    #[error("coordinate {coord} is outside a lattice of side {side}")]
    OutOfBounds { coord: Coord, side: u32 },

    #[error("species {species} count {count} can not be decremented by {delta}")]
    NegativeSpeciesCount { species: SpeciesId, count: u64, delta: u64 },

    #[error("species {0} does not exist")]
    UnknownSpecies(SpeciesId),

    #[error("mutation {0} has not been assigned")]
    UnknownMutation(MutationId),

    #[error("mutation {mutation} appears twice in the genotype of species {species}")]
    DuplicateMutationInGenotype { species: SpeciesId, mutation: MutationId },

    #[error("species {0} already has a recorded parent")]
    DuplicatePhylogenyEdge(SpeciesId),

    #[error("the founder species can not be recorded as a child")]
    FounderAsChild,

    #[error("parent {parent} of species {child} was not created before it")]
    ParentNotOlder { child: SpeciesId, parent: SpeciesId },

    #[error("species {0} has no recorded parent")]
    MissingPhylogenyEdge(SpeciesId),

    #[error("species {species} records {recorded} cells but {tallied} live cells carry it")]
    SpeciesCountMismatch { species: SpeciesId, recorded: u64, tallied: u64 },

    #[error("{kind} id space exhausted")]
    IdSpaceExhausted { kind: &'static str },

    #[error("population mismatch: {live} live cells, {occupied} occupied sites, species total {species_total}")]
    PopulationMismatch { live: u64, occupied: u64, species_total: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::NegativeSelection(-0.5).into();
        assert!(matches!(err, Error::Config(ConfigError::NegativeSelection(_))));
        assert!(err.to_string().contains("selection coefficient"));
    }

    #[test]
    fn test_invariant_message_carries_coordinates() {
        let err: Error = InvariantViolation::OccupiedSite {
            coord: Coord::new(1, 2, 3),
        }
        .into();
        assert!(err.to_string().contains("(1, 2, 3)"));
    }
}
