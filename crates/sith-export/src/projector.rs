//! Flat tables derived from a finished run.
//!
//! These are the shapes plotting front-ends consume: one row per live cell,
//! one padded row per species, a per-mutation frequency vector and the
//! phylogeny as two aligned columns.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sith_core::{Result, SpeciesId};
use sith_world::Simulation;

/// Fill value for genotype positions a species does not have
pub const GENOTYPE_PADDING: i64 = -1;

/// One live cell, with coordinates relative to the lattice centre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRow {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub species: u32,
    /// Length of the cell's genotype
    pub mutations: u32,
    /// Euclidean distance from the centre
    pub distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellTable {
    pub rows: Vec<CellRow>,
}

impl CellTable {
    /// Six-column numeric matrix: x, y, z, species, mutations, distance
    pub fn to_matrix(&self) -> Vec<[f64; 6]> {
        self.rows
            .iter()
            .map(|r| {
                [
                    f64::from(r.x),
                    f64::from(r.y),
                    f64::from(r.z),
                    f64::from(r.species),
                    f64::from(r.mutations),
                    r.distance,
                ]
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Species genotypes as a rectangular matrix.
///
/// Row `i` describes species `i`: its mutation ids, padded with
/// [`GENOTYPE_PADDING`] up to the longest genotype, followed by the species'
/// live cell count in the last column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesMatrix {
    pub ncol: usize,
    pub rows: Vec<Vec<i64>>,
}

impl SpeciesMatrix {
    pub fn count(&self, species: SpeciesId) -> Option<i64> {
        self.rows.get(species.index()).and_then(|r| r.last().copied())
    }
}

/// Phylogeny as aligned child/parent columns, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhylogenyTable {
    pub children: Vec<u32>,
    pub parents: Vec<u32>,
}

impl PhylogenyTable {
    /// Two-column view, one `[child, parent]` row per edge
    pub fn rows(&self) -> Vec<[u32; 2]> {
        self.children
            .iter()
            .zip(&self.parents)
            .map(|(&c, &p)| [c, p])
            .collect()
    }
}

/// A driver mutation and how many live cells carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRow {
    pub mutation: u32,
    pub frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub cells: CellTable,
    pub species: SpeciesMatrix,
    /// Entry `m` counts the live cells carrying mutation `m`
    pub mutation_frequencies: Vec<u64>,
    pub phylogeny: PhylogenyTable,
    pub drivers: Vec<DriverRow>,
}

/// Converts the terminal state of a run into [`Projection`] tables.
///
/// Projection only reads the simulation, so projecting the same state twice
/// gives identical tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultProjector;

impl ResultProjector {
    pub fn new() -> Self {
        Self
    }

    pub fn project<R: Rng>(&self, simulation: &Simulation<R>) -> Result<Projection> {
        let mutation_frequencies = self.mutation_frequencies(simulation);
        let drivers = simulation
            .registry()
            .drivers()
            .into_iter()
            .map(|m| DriverRow {
                mutation: m.0,
                frequency: mutation_frequencies.get(m.index()).copied().unwrap_or(0),
            })
            .collect();

        Ok(Projection {
            cells: self.cell_table(simulation)?,
            species: self.species_matrix(simulation),
            mutation_frequencies,
            phylogeny: self.phylogeny_table(simulation),
            drivers,
        })
    }

    pub fn cell_table<R: Rng>(&self, simulation: &Simulation<R>) -> Result<CellTable> {
        let half = i32::from(simulation.context().dims().half());
        let species = simulation.species();

        let rows = simulation
            .cells()
            .iter()
            .map(|cell| -> Result<CellRow> {
                let x = i32::from(cell.coord.x) - half;
                let y = i32::from(cell.coord.y) - half;
                let z = i32::from(cell.coord.z) - half;
                let (fx, fy, fz) = (f64::from(x), f64::from(y), f64::from(z));
                Ok(CellRow {
                    x,
                    y,
                    z,
                    species: cell.species.0,
                    mutations: species.get(cell.species)?.genotype.len() as u32,
                    distance: (fx * fx + fy * fy + fz * fz).sqrt(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CellTable { rows })
    }

    pub fn species_matrix<R: Rng>(&self, simulation: &Simulation<R>) -> SpeciesMatrix {
        let table = simulation.species();
        let width = table.max_genotype_length();

        let rows = table
            .iter()
            .map(|species| {
                let mut row: Vec<i64> = species.genotype.iter().map(|m| i64::from(m.0)).collect();
                row.resize(width, GENOTYPE_PADDING);
                row.push(species.count as i64);
                row
            })
            .collect();

        SpeciesMatrix {
            ncol: width + 1,
            rows,
        }
    }

    pub fn mutation_frequencies<R: Rng>(&self, simulation: &Simulation<R>) -> Vec<u64> {
        let mut frequencies = vec![0u64; simulation.registry().total_mutations() as usize];
        for species in simulation.species().iter() {
            for mutation in &species.genotype {
                if let Some(f) = frequencies.get_mut(mutation.index()) {
                    *f += species.count;
                }
            }
        }
        frequencies
    }

    pub fn phylogeny_table<R: Rng>(&self, simulation: &Simulation<R>) -> PhylogenyTable {
        let log = simulation.phylogeny();
        PhylogenyTable {
            children: log.children().into_iter().map(|s| s.0).collect(),
            parents: log.parents().into_iter().map(|s| s.0).collect(),
        }
    }
}
