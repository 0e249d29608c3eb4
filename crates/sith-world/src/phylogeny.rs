//! Species-level ancestry, recorded as child → parent edges.

use serde::{Deserialize, Serialize};
use sith_core::{InvariantViolation, Result, SpeciesId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhylogenyEdge {
    pub child: SpeciesId,
    pub parent: SpeciesId,
}

/// Append-only log with one edge per species created after the founder.
#[derive(Debug, Clone, Default)]
pub struct PhylogenyLog {
    edges: Vec<PhylogenyEdge>,
    parent_of: HashMap<SpeciesId, SpeciesId>,
}

impl PhylogenyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, child: SpeciesId, parent: SpeciesId) -> Result<()> {
        if child.is_founder() {
            return Err(InvariantViolation::FounderAsChild.into());
        }
        if self.parent_of.contains_key(&child) {
            return Err(InvariantViolation::DuplicatePhylogenyEdge(child).into());
        }
        if parent >= child {
            return Err(InvariantViolation::ParentNotOlder { child, parent }.into());
        }
        self.parent_of.insert(child, parent);
        self.edges.push(PhylogenyEdge { child, parent });
        Ok(())
    }

    /// Edges in creation order
    pub fn edges(&self) -> &[PhylogenyEdge] {
        &self.edges
    }

    pub fn parent_of(&self, child: SpeciesId) -> Option<SpeciesId> {
        self.parent_of.get(&child).copied()
    }

    pub fn children(&self) -> Vec<SpeciesId> {
        self.edges.iter().map(|e| e.child).collect()
    }

    pub fn parents(&self) -> Vec<SpeciesId> {
        self.edges.iter().map(|e| e.parent).collect()
    }

    /// Ancestry of `species`, starting with itself and ending at the root
    pub fn lineage(&self, species: SpeciesId) -> Vec<SpeciesId> {
        let mut lineage = vec![species];
        let mut current = species;
        // parent < child for every edge, so this terminates
        while let Some(parent) = self.parent_of(current) {
            lineage.push(parent);
            current = parent;
        }
        lineage
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sith_core::Error;

    #[test]
    fn test_record_in_order() {
        let mut log = PhylogenyLog::new();
        log.record(SpeciesId(1), SpeciesId(0)).unwrap();
        log.record(SpeciesId(2), SpeciesId(1)).unwrap();
        log.record(SpeciesId(3), SpeciesId(0)).unwrap();

        assert_eq!(log.len(), 3);
        assert_eq!(log.children(), vec![SpeciesId(1), SpeciesId(2), SpeciesId(3)]);
        assert_eq!(log.parents(), vec![SpeciesId(0), SpeciesId(1), SpeciesId(0)]);
    }

    #[test]
    fn test_founder_never_a_child() {
        let mut log = PhylogenyLog::new();
        let err = log.record(SpeciesId::FOUNDER, SpeciesId(1)).unwrap_err();
        assert!(matches!(err, Error::Invariant(InvariantViolation::FounderAsChild)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_child_recorded_once() {
        let mut log = PhylogenyLog::new();
        log.record(SpeciesId(1), SpeciesId(0)).unwrap();
        assert!(log.record(SpeciesId(1), SpeciesId(0)).is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_parent_must_be_older() {
        let mut log = PhylogenyLog::new();
        let err = log.record(SpeciesId(2), SpeciesId(5)).unwrap_err();
        assert!(matches!(
            err,
            Error::Invariant(InvariantViolation::ParentNotOlder { .. })
        ));
    }

    #[test]
    fn test_lineage() {
        let mut log = PhylogenyLog::new();
        log.record(SpeciesId(1), SpeciesId(0)).unwrap();
        log.record(SpeciesId(2), SpeciesId(1)).unwrap();
        log.record(SpeciesId(3), SpeciesId(2)).unwrap();

        assert_eq!(
            log.lineage(SpeciesId(3)),
            vec![SpeciesId(3), SpeciesId(2), SpeciesId(1), SpeciesId(0)]
        );
        assert_eq!(log.lineage(SpeciesId::FOUNDER), vec![SpeciesId::FOUNDER]);
    }
}
