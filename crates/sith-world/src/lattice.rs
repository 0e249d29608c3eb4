//! 3D occupancy lattice.

use sith_core::{Coord, Direction, InvariantViolation, LatticeDims, Result};

/// A cubic occupancy volume stored as one flat bitset.
///
/// Site `(x, y, z)` lives at bit `x + side * (y + side * z)`. The lattice only
/// records which sites are taken; which cell sits there is tracked by the
/// engine's live-cell registry.
#[derive(Debug, Clone)]
pub struct Lattice {
    side: u32,
    bits: Vec<u64>,
    occupied: u64,
}

impl Lattice {
    pub fn new(dims: LatticeDims) -> Self {
        let words = dims.capacity().div_ceil(64) as usize;
        Self {
            side: dims.side,
            bits: vec![0; words],
            occupied: 0,
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Number of occupied sites
    pub fn occupied(&self) -> u64 {
        self.occupied
    }

    /// The site the founder cell starts on
    pub fn center(&self) -> Coord {
        let half = (self.side / 2) as i16;
        Coord::new(half, half, half)
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        let side = self.side as i32;
        let inside = |v: i16| (0..side).contains(&i32::from(v));
        inside(coord.x) && inside(coord.y) && inside(coord.z)
    }

    /// Linear index of a site, or an error if it lies outside the volume
    pub fn linear_index(&self, coord: Coord) -> Result<usize> {
        if !self.in_bounds(coord) {
            return Err(InvariantViolation::OutOfBounds {
                coord,
                side: self.side,
            }
            .into());
        }
        let side = self.side as usize;
        Ok(coord.x as usize + side * (coord.y as usize + side * coord.z as usize))
    }

    pub fn is_occupied(&self, coord: Coord) -> Result<bool> {
        let index = self.linear_index(coord)?;
        Ok(self.bit(index))
    }

    /// Reserve a site for a new cell
    pub fn place(&mut self, coord: Coord) -> Result<()> {
        let index = self.linear_index(coord)?;
        if self.bit(index) {
            return Err(InvariantViolation::OccupiedSite { coord }.into());
        }
        self.bits[index / 64] |= 1 << (index % 64);
        self.occupied += 1;
        Ok(())
    }

    /// Free a site when its cell dies
    pub fn remove(&mut self, coord: Coord) -> Result<()> {
        let index = self.linear_index(coord)?;
        if !self.bit(index) {
            return Err(InvariantViolation::EmptySite { coord }.into());
        }
        self.bits[index / 64] &= !(1 << (index % 64));
        self.occupied -= 1;
        Ok(())
    }

    /// Axis-aligned neighbours of a site, clipped to the volume
    pub fn neighbors6(&self, coord: Coord) -> Vec<Coord> {
        Direction::all()
            .iter()
            .filter_map(|d| {
                let (dx, dy, dz) = d.to_delta();
                coord.offset(dx, dy, dz)
            })
            .filter(|c| self.in_bounds(*c))
            .collect()
    }

    /// True when at least one axis neighbour would fall outside the volume
    pub fn on_boundary(&self, coord: Coord) -> bool {
        let last = self.side as i32 - 1;
        [coord.x, coord.y, coord.z]
            .iter()
            .any(|&v| i32::from(v) <= 0 || i32::from(v) >= last)
    }

    fn bit(&self, index: usize) -> bool {
        self.bits[index / 64] & (1 << (index % 64)) != 0
    }
}
