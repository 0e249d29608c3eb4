//! Species bookkeeping.
//!
//! A species is the set of cells sharing one genotype. Species are stored in
//! an append-only arena: ids are dense, never reused, and a species stays in
//! the table after its last cell dies so the phylogeny can still refer to it.

use serde::{Deserialize, Serialize};
use sith_core::{Genotype, InvariantViolation, Result, SpeciesId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub genotype: Genotype,
    pub count: u64,
    pub birth_rate: f64,
    pub death_rate: f64,
    /// Species this one arose from; `None` for the founder
    pub parent: Option<SpeciesId>,
}

impl Species {
    /// Summed per-cell event rate
    pub fn total_rate(&self) -> f64 {
        self.birth_rate + self.death_rate
    }
}

#[derive(Debug, Clone)]
pub struct SpeciesTable {
    species: Vec<Species>,
    by_genotype: HashMap<Genotype, SpeciesId>,
}

impl SpeciesTable {
    /// A table holding only the founder species, with an empty genotype and no cells
    pub fn founder(birth_rate: f64, death_rate: f64) -> Self {
        let founder = Species {
            id: SpeciesId::FOUNDER,
            genotype: Genotype::new(),
            count: 0,
            birth_rate,
            death_rate,
            parent: None,
        };
        let mut by_genotype = HashMap::new();
        by_genotype.insert(Genotype::new(), SpeciesId::FOUNDER);

        Self {
            species: vec![founder],
            by_genotype,
        }
    }

    /// Return the species for `genotype`, creating it if it is new.
    ///
    /// An existing species keeps its rates. The flag is `true` only when a new
    /// id was allocated.
    pub fn lookup_or_create(
        &mut self,
        genotype: Genotype,
        birth_rate: f64,
        death_rate: f64,
        parent: SpeciesId,
    ) -> Result<(SpeciesId, bool)> {
        if let Some(&id) = self.by_genotype.get(&genotype) {
            return Ok((id, false));
        }
        self.get(parent)?;

        let id = next_species_id(self.species.len())?;
        self.by_genotype.insert(genotype.clone(), id);
        self.species.push(Species {
            id,
            genotype,
            count: 0,
            birth_rate,
            death_rate,
            parent: Some(parent),
        });
        Ok((id, true))
    }

    pub fn increment(&mut self, id: SpeciesId, delta: u64) -> Result<()> {
        let species = self.get_mut(id)?;
        species.count += delta;
        Ok(())
    }

    pub fn decrement(&mut self, id: SpeciesId, delta: u64) -> Result<()> {
        let species = self.get_mut(id)?;
        species.count = species.count.checked_sub(delta).ok_or(
            InvariantViolation::NegativeSpeciesCount {
                species: id,
                count: species.count,
                delta,
            },
        )?;
        Ok(())
    }

    pub fn get(&self, id: SpeciesId) -> Result<&Species> {
        self.species
            .get(id.index())
            .ok_or_else(|| InvariantViolation::UnknownSpecies(id).into())
    }

    fn get_mut(&mut self, id: SpeciesId) -> Result<&mut Species> {
        self.species
            .get_mut(id.index())
            .ok_or_else(|| InvariantViolation::UnknownSpecies(id).into())
    }

    /// Longest genotype in the table, used to size export rows
    pub fn max_genotype_length(&self) -> usize {
        self.species
            .iter()
            .map(|s| s.genotype.len())
            .max()
            .unwrap_or(0)
    }

    /// Largest `birth_rate + death_rate` over every species ever created
    pub fn max_total_rate(&self) -> f64 {
        self.species
            .iter()
            .map(Species::total_rate)
            .fold(0.0, f64::max)
    }

    /// Sum of all species counts
    pub fn total_count(&self) -> u64 {
        self.species.iter().map(|s| s.count).sum()
    }

    /// Species that still have at least one live cell
    pub fn extant(&self) -> impl Iterator<Item = &Species> + '_ {
        self.species.iter().filter(|s| s.count > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> + '_ {
        self.species.iter()
    }

    pub fn as_slice(&self) -> &[Species] {
        &self.species
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

/// Dense id for the species stored at position `len`
fn next_species_id(len: usize) -> Result<SpeciesId> {
    u32::try_from(len)
        .map(SpeciesId)
        .map_err(|_| InvariantViolation::IdSpaceExhausted { kind: "species" }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sith_core::{Error, MutationId};

    #[test]
    fn test_species_ids_never_truncate() {
        assert_eq!(next_species_id(7).unwrap(), SpeciesId(7));
        assert_eq!(
            next_species_id(u32::MAX as usize).unwrap(),
            SpeciesId(u32::MAX)
        );
        assert!(matches!(
            next_species_id(u32::MAX as usize + 1),
            Err(Error::Invariant(InvariantViolation::IdSpaceExhausted { kind: "species" }))
        ));
    }

    #[test]
    fn test_founder_table() {
        let table = SpeciesTable::founder(1.0, 0.2);
        assert_eq!(table.len(), 1);

        let founder = table.get(SpeciesId::FOUNDER).unwrap();
        assert!(founder.genotype.is_empty());
        assert_eq!(founder.count, 0);
        assert_eq!(founder.parent, None);
        assert!((table.max_total_rate() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_lookup_or_create() {
        let mut table = SpeciesTable::founder(1.0, 0.0);

        let (id, created) = table
            .lookup_or_create(vec![MutationId(0)], 1.5, 0.0, SpeciesId::FOUNDER)
            .unwrap();
        assert_eq!(id, SpeciesId(1));
        assert!(created);

        // Same genotype again: same id, rates untouched
        let (again, created) = table
            .lookup_or_create(vec![MutationId(0)], 9.0, 9.0, SpeciesId::FOUNDER)
            .unwrap();
        assert_eq!(again, id);
        assert!(!created);
        assert_eq!(table.get(id).unwrap().birth_rate, 1.5);

        // Existing founder genotype resolves to the founder
        let (founder, created) = table
            .lookup_or_create(Vec::new(), 1.0, 0.0, SpeciesId::FOUNDER)
            .unwrap();
        assert_eq!(founder, SpeciesId::FOUNDER);
        assert!(!created);
    }

    #[test]
    fn test_genotype_order_matters() {
        let mut table = SpeciesTable::founder(1.0, 0.0);
        let (a, _) = table
            .lookup_or_create(vec![MutationId(0), MutationId(1)], 1.0, 0.0, SpeciesId::FOUNDER)
            .unwrap();
        let (b, created) = table
            .lookup_or_create(vec![MutationId(1), MutationId(0)], 1.0, 0.0, SpeciesId::FOUNDER)
            .unwrap();
        assert_ne!(a, b);
        assert!(created);
        assert_eq!(table.max_genotype_length(), 2);
    }

    #[test]
    fn test_counts() {
        let mut table = SpeciesTable::founder(1.0, 0.0);
        table.increment(SpeciesId::FOUNDER, 3).unwrap();
        table.decrement(SpeciesId::FOUNDER, 2).unwrap();
        assert_eq!(table.total_count(), 1);
        assert_eq!(table.extant().count(), 1);

        table.decrement(SpeciesId::FOUNDER, 1).unwrap();
        assert_eq!(table.extant().count(), 0);
        // Extinct species stay in the table
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_negative_count_is_invariant_violation() {
        let mut table = SpeciesTable::founder(1.0, 0.0);
        table.increment(SpeciesId::FOUNDER, 1).unwrap();

        let err = table.decrement(SpeciesId::FOUNDER, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::Invariant(InvariantViolation::NegativeSpeciesCount {
                count: 1,
                delta: 2,
                ..
            })
        ));
        assert_eq!(table.get(SpeciesId::FOUNDER).unwrap().count, 1);
    }

    #[test]
    fn test_unknown_species() {
        let mut table = SpeciesTable::founder(1.0, 0.0);
        assert!(table.increment(SpeciesId(7), 1).is_err());
        assert!(table
            .lookup_or_create(vec![MutationId(0)], 1.0, 0.0, SpeciesId(7))
            .is_err());
        assert_eq!(table.len(), 1);
    }
}
