//! Mutation id assignment and driver bookkeeping.

use sith_core::{InvariantViolation, MutationId, Result};
use std::collections::BTreeSet;

/// Hands out mutation ids for one run and remembers which ones are drivers.
#[derive(Debug, Clone, Default)]
pub struct GenotypeRegistry {
    next_id: u32,
    drivers: BTreeSet<MutationId>,
}

impl GenotypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next mutation id
    pub fn next_mutation_id(&mut self) -> Result<MutationId> {
        let id = MutationId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(InvariantViolation::IdSpaceExhausted { kind: "mutation" })?;
        Ok(id)
    }

    /// Number of ids assigned so far, which is also the next unassigned id
    pub fn total_mutations(&self) -> u32 {
        self.next_id
    }

    pub fn is_assigned(&self, id: MutationId) -> bool {
        id.0 < self.next_id
    }

    pub fn mark_driver(&mut self, id: MutationId) -> Result<()> {
        if !self.is_assigned(id) {
            return Err(InvariantViolation::UnknownMutation(id).into());
        }
        self.drivers.insert(id);
        Ok(())
    }

    pub fn is_driver(&self, id: MutationId) -> bool {
        self.drivers.contains(&id)
    }

    /// Driver mutations in ascending id order
    pub fn drivers(&self) -> Vec<MutationId> {
        self.drivers.iter().copied().collect()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }
}
