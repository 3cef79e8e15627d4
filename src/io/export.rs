//! Export a solution to JSON.
//!
//! The export carries the full `Solution` (offsets, drift, tare, diagnostics and
//! reduced readings) plus the configuration that produced it, so a run can be
//! reproduced or compared later.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Solution, SolveConfig};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct SolutionFile<'a> {
    tool: &'static str,
    config: &'a SolveConfig,
    drift_rate_per_day: f64,
    solution: &'a Solution,
}

/// Write the solution JSON.
pub fn write_solution_json(path: &Path, solution: &Solution, config: &SolveConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create solution JSON '{}': {e}", path.display())))?;

    let out = SolutionFile {
        tool: "ginv",
        config,
        drift_rate_per_day: solution.drift_rate_per_day(),
        solution,
    };
    serde_json::to_writer_pretty(file, &out)
        .map_err(|e| AppError::new(2, format!("Failed to write solution JSON: {e}")))?;

    Ok(())
}
