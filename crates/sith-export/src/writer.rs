//! JSON export of a projected run.

use crate::color::ColorScheme;
use crate::projector::Projection;
use serde::Serialize;
use sith_core::Result;
use sith_world::RunSummary;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CELLS_FILE: &str = "cells.json";
pub const SPECIES_FILE: &str = "species.json";
pub const MUTATIONS_FILE: &str = "mutations.json";
pub const PHYLOGENY_FILE: &str = "phylogeny.json";
pub const DRIVERS_FILE: &str = "drivers.json";
pub const COLORS_FILE: &str = "colors.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// Write every table of `projection`, the colour scheme and the run summary
/// into `dir`, creating it if needed. Returns the paths written.
pub fn write_projection(
    dir: &Path,
    projection: &Projection,
    summary: &RunSummary,
    colors: &ColorScheme,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let written = vec![
        write_json(dir, CELLS_FILE, &projection.cells.rows)?,
        write_json(dir, SPECIES_FILE, &projection.species)?,
        write_json(dir, MUTATIONS_FILE, &projection.mutation_frequencies)?,
        write_json(dir, PHYLOGENY_FILE, &projection.phylogeny)?,
        write_json(dir, DRIVERS_FILE, &projection.drivers)?,
        write_json(dir, COLORS_FILE, &colors.colors)?,
        write_json(dir, SUMMARY_FILE, summary)?,
    ];

    info!(
        run_id = %summary.run_id,
        dir = %dir.display(),
        files = written.len(),
        "Exported run"
    );
    Ok(written)
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut out = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut out, value)?;
    out.flush()?;
    debug!(path = %path.display(), "Wrote table");
    Ok(path)
}

/// Read back a run summary written by [`write_projection`]
pub fn read_summary(dir: &Path) -> Result<RunSummary> {
    let data = fs::read(dir.join(SUMMARY_FILE))?;
    Ok(serde_json::from_slice(&data)?)
}
