//! Design matrix construction.
//!
//! The builder emits one row per parameter and one column per observation:
//!
//! ```text
//! t^d, ..., t^1, 1      drift polynomial (d + 1 rows)
//! [bm == B1], ...       one indicator row per non-anchor benchmark
//! [i >= tare]           optional tare step
//! ```
//!
//! The solver wants observations × parameters, so callers transpose with
//! `DesignMatrix::transposed`.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::DriftDegree;

/// What a design-matrix row estimates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Parameter {
    /// Drift coefficient for `t^power` (power 0 is the constant term).
    Drift { power: usize },
    /// Gravity offset of a benchmark relative to the anchor.
    Benchmark(String),
    /// Step offset applied from `index` onward.
    Tare { index: usize },
}

/// Parameter-major design matrix (parameters × observations).
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub parameters: Vec<Parameter>,
    pub rows: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn n_parameters(&self) -> usize {
        self.rows.nrows()
    }

    pub fn n_observations(&self) -> usize {
        self.rows.ncols()
    }

    /// Observations × parameters, as consumed by the solver.
    pub fn transposed(&self) -> DMatrix<f64> {
        self.rows.transpose()
    }

    /// Benchmarks with an indicator row, in row order.
    pub fn benchmarks(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().filter_map(|p| match p {
            Parameter::Benchmark(label) => Some(label.as_str()),
            _ => None,
        })
    }

    pub fn tare_index(&self) -> Option<usize> {
        self.parameters.iter().find_map(|p| match p {
            Parameter::Tare { index } => Some(*index),
            _ => None,
        })
    }
}

/// Polynomial drift rows: `[t^d, ..., t, 1]`.
pub fn drift_matrix(times: &[f64], degree: DriftDegree) -> DMatrix<f64> {
    let d = degree.order();
    DMatrix::from_fn(d + 1, times.len(), |row, col| times[col].powi((d - row) as i32))
}

/// `1` where the observation was taken at `benchmark`, else `0`.
pub fn indicator_row<S: AsRef<str>>(benchmark: &str, labels: &[S]) -> Vec<f64> {
    labels
        .iter()
        .map(|l| if l.as_ref() == benchmark { 1.0 } else { 0.0 })
        .collect()
}

/// `0` before `index`, `1` at and after it.
pub fn tare_row(n: usize, index: usize) -> Vec<f64> {
    (0..n).map(|i| if i < index { 0.0 } else { 1.0 }).collect()
}

/// Non-anchor benchmarks in first-encountered order.
pub fn unique_benchmarks<S: AsRef<str>>(labels: &[S], anchor: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.as_ref();
        if label != anchor && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

/// Tare index clamped to `[0, n]`, kept only if it splits the observations.
pub fn effective_tare_index(tare: Option<usize>, n: usize) -> Option<usize> {
    let index = tare?.min(n);
    (index > 0 && index < n).then_some(index)
}

/// Assemble the full parameter-major design matrix.
///
/// `labels` and `times` describe the same observations and must have equal length.
pub fn build_design_matrix<S: AsRef<str>>(
    times: &[f64],
    degree: DriftDegree,
    labels: &[S],
    anchor: &str,
    tare: Option<usize>,
) -> DesignMatrix {
    debug_assert_eq!(labels.len(), times.len(), "one label per observation time");
    let n = times.len();
    let drift = drift_matrix(times, degree);
    let benchmarks = unique_benchmarks(labels, anchor);
    let tare = effective_tare_index(tare, n);

    let n_params = drift.nrows() + benchmarks.len() + usize::from(tare.is_some());
    let mut rows = DMatrix::<f64>::zeros(n_params, n);
    let mut parameters = Vec::with_capacity(n_params);

    let d = degree.order();
    for r in 0..drift.nrows() {
        rows.row_mut(r).copy_from(&drift.row(r));
        parameters.push(Parameter::Drift { power: d - r });
    }

    let mut r = drift.nrows();
    for benchmark in benchmarks {
        for (col, v) in indicator_row(&benchmark, labels).into_iter().enumerate() {
            rows[(r, col)] = v;
        }
        parameters.push(Parameter::Benchmark(benchmark));
        r += 1;
    }

    if let Some(index) = tare {
        for (col, v) in tare_row(n, index).into_iter().enumerate() {
            rows[(r, col)] = v;
        }
        parameters.push(Parameter::Tare { index });
    }

    DesignMatrix { parameters, rows }
}
