//! Per-species display colours.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Grey level used for the founder species
pub const FOUNDER_GRAY: f64 = 0.5;
/// Channel range for every other species, kept away from black and white
pub const CHANNEL_MIN: f64 = 0.09;
pub const CHANNEL_MAX: f64 = 0.91;

pub type Rgb = [f64; 3];

/// One RGB triple per species, indexed by species id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub colors: Vec<Rgb>,
}

impl ColorScheme {
    pub fn generate<R: Rng>(species: usize, rng: &mut R) -> Self {
        let colors = (0..species)
            .map(|i| {
                if i == 0 {
                    [FOUNDER_GRAY; 3]
                } else {
                    [
                        rng.gen_range(CHANNEL_MIN..=CHANNEL_MAX),
                        rng.gen_range(CHANNEL_MIN..=CHANNEL_MAX),
                        rng.gen_range(CHANNEL_MIN..=CHANNEL_MAX),
                    ]
                }
            })
            .collect();
        Self { colors }
    }

    pub fn get(&self, species: usize) -> Option<Rgb> {
        self.colors.get(species).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
