//! Read-only projections of finished runs and their JSON export.

pub mod color;
pub mod projector;
pub mod writer;

pub use color::{ColorScheme, Rgb};
pub use projector::{
    CellRow, CellTable, DriverRow, PhylogenyTable, Projection, ResultProjector, SpeciesMatrix,
    GENOTYPE_PADDING,
};
pub use writer::{read_summary, write_projection};
