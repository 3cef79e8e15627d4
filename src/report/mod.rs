//! Reporting utilities: per-benchmark summaries and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::Solution;

/// One line of the benchmark table.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub benchmark: String,
    pub is_anchor: bool,
    /// µGal relative to the anchor.
    pub offset: f64,
    pub std_dev: f64,
    /// Number of used readings at this benchmark.
    pub readings: usize,
    /// RMS of the readings' residuals (µGal).
    pub rms_residual: f64,
}

impl BenchmarkSummary {
    /// 2-sigma interval, the figure surveyors usually quote.
    pub fn two_sigma(&self) -> f64 {
        2.0 * self.std_dev
    }
}

/// Summaries in display order: anchor first, then benchmarks by label.
pub fn summarize_benchmarks(solution: &Solution) -> Vec<BenchmarkSummary> {
    solution
        .benchmark_order()
        .into_iter()
        .filter_map(|label| {
            let offset = solution.offset(label)?;
            let residuals: Vec<f64> = solution
                .reduced
                .iter()
                .filter(|r| r.benchmark == label)
                .map(|r| r.residual)
                .collect();
            let rms_residual = if residuals.is_empty() {
                0.0
            } else {
                (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
            };

            Some(BenchmarkSummary {
                benchmark: label.to_string(),
                is_anchor: label == solution.anchor,
                offset: offset.offset,
                std_dev: offset.std_dev,
                readings: residuals.len(),
                rms_residual,
            })
        })
        .collect()
}
