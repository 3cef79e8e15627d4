//! Write drift-curve JSON files.
//!
//! The curve file is the portable representation of the fitted drift:
//! - polynomial degree + coefficients (µGal, elapsed seconds)
//! - reference time the polynomial is measured from
//! - a precomputed grid for external plotting

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DriftDegree, Solution};
use crate::error::AppError;

/// A saved drift curve (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub reference_time: DateTime<Utc>,
    pub degree: DriftDegree,
    pub coefficients: Vec<f64>,
    pub drift_rate_per_day: f64,
    pub grid: Vec<CurveSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSample {
    pub time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub value: f64,
}

/// Sample the solution's drift every `interval_seconds`.
pub fn build_curve_file(solution: &Solution, interval_seconds: f64) -> CurveFile {
    let grid = solution
        .drift_curve(interval_seconds)
        .into_iter()
        .map(|p| CurveSample {
            time: solution.reference_time + Duration::milliseconds((p.elapsed_seconds * 1000.0).round() as i64),
            elapsed_seconds: p.elapsed_seconds,
            value: p.value,
        })
        .collect();

    CurveFile {
        tool: "ginv".to_string(),
        reference_time: solution.reference_time,
        degree: solution.degree,
        coefficients: solution.drift_coefficients.clone(),
        drift_rate_per_day: solution.drift_rate_per_day(),
        grid,
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, solution: &Solution, interval_seconds: f64) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    let curve = build_curve_file(solution, interval_seconds);
    serde_json::to_writer_pretty(file, &curve)
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}
