//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during inversion
//! - exported to JSON
//! - built by hand in tests or by the synthetic survey generator

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::inversion::InversionError;

/// Milligal to microgal.
pub const MGAL_TO_UGAL: f64 = 1000.0;

/// Seconds per day, used to report drift rates in µGal/day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// A single relative-gravimeter reading at a benchmark.
///
/// Values are in milligal as delivered by the instrument. `include` is the only
/// field a caller is expected to flip between solves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub benchmark: String,
    /// Gravity reading (mGal).
    pub value: f64,
    /// 1-sigma reading uncertainty (mGal). Must be finite and > 0.
    pub error: f64,
    /// Whether the instrument already applied its earth-tide correction.
    pub tide_applied: bool,
    /// Earth-tide correction reported by the instrument (mGal).
    pub tide: f64,
    /// Whether the reading takes part in the next solve.
    pub include: bool,
}

impl Observation {
    /// A reading in the normalized format: tide considered applied, zero tide value.
    pub fn new(time: DateTime<Utc>, benchmark: impl Into<String>, value: f64, error: f64) -> Self {
        Self {
            time,
            benchmark: benchmark.into(),
            value,
            error,
            tide_applied: true,
            tide: 0.0,
            include: true,
        }
    }

    pub fn with_tide(mut self, applied: bool, tide: f64) -> Self {
        self.tide_applied = applied;
        self.tide = tide;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.include = false;
        self
    }
}

/// Degree of the drift polynomial.
///
/// Only linear, quadratic and cubic drift are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(into = "u8", try_from = "u8")]
pub enum DriftDegree {
    #[value(name = "1")]
    Linear,
    #[value(name = "2")]
    Quadratic,
    #[value(name = "3")]
    Cubic,
}

impl DriftDegree {
    pub fn order(self) -> usize {
        match self {
            DriftDegree::Linear => 1,
            DriftDegree::Quadratic => 2,
            DriftDegree::Cubic => 3,
        }
    }

    /// Number of drift parameters (powers down to 1, plus the constant term).
    pub fn param_count(self) -> usize {
        self.order() + 1
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DriftDegree::Linear => "linear",
            DriftDegree::Quadratic => "quadratic",
            DriftDegree::Cubic => "cubic",
        }
    }
}

impl From<DriftDegree> for u8 {
    fn from(value: DriftDegree) -> Self {
        value.order() as u8
    }
}

impl TryFrom<u8> for DriftDegree {
    type Error = InversionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DriftDegree::Linear),
            2 => Ok(DriftDegree::Quadratic),
            3 => Ok(DriftDegree::Cubic),
            other => Err(InversionError::InvalidConfiguration(format!(
                "unsupported drift degree {other} (expected 1, 2 or 3)"
            ))),
        }
    }
}

/// How observations are weighted in the normal equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Weighting {
    /// `1 / error²` per reading.
    InverseVariance,
    /// Every reading weighs 1 (ordinary least squares).
    Uniform,
}

/// Everything a single solve depends on besides the observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveConfig {
    pub degree: DriftDegree,
    /// Reference benchmark. `None` picks the benchmark of the earliest reading,
    /// whether or not it is included.
    pub anchor: Option<String>,
    /// Target tide-correction state of the values fed to the solver.
    pub correct_tide: bool,
    pub weighting: Weighting,
    pub tare_enabled: bool,
    /// Index into the used (included, time-ordered) readings where the tare starts.
    pub tare_index: usize,
    /// Subtract the fitted drift from reduced values (display only).
    pub remove_drift: bool,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            degree: DriftDegree::Linear,
            anchor: None,
            correct_tide: true,
            weighting: Weighting::InverseVariance,
            tare_enabled: false,
            tare_index: 0,
            remove_drift: false,
        }
    }
}

/// Gravity difference of a benchmark relative to the anchor (µGal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOffset {
    pub offset: f64,
    pub std_dev: f64,
}

impl BenchmarkOffset {
    pub const ANCHOR: BenchmarkOffset = BenchmarkOffset { offset: 0.0, std_dev: 0.0 };
}

/// Fitted tare step (µGal) starting at `index` of the used readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TareEstimate {
    pub index: usize,
    pub offset: f64,
    pub std_dev: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub n_observations: usize,
    pub n_parameters: usize,
    /// `n_observations - n_parameters - 1`.
    pub dof: usize,
    /// Weighted sum of squared residuals.
    pub chi_square: f64,
    /// `chi_square / dof`, the factor applied to the normal-matrix inverse.
    pub variance_factor: f64,
}

/// A used reading after corrections, in µGal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedObservation {
    /// Position in the caller's observation list.
    pub index: usize,
    pub time: DateTime<Utc>,
    pub benchmark: String,
    pub elapsed_seconds: f64,
    /// Tide-toggled reading as fed to the solver.
    pub value: f64,
    /// Fitted offset of the reading's benchmark.
    pub offset: f64,
    /// Fitted drift at the reading's elapsed time.
    pub drift: f64,
    /// Fitted tare contribution (0 before the tare index).
    pub tare: f64,
    /// `value - offset - tare`, minus `drift` when drift removal is enabled.
    pub reduced: f64,
    /// `value - (drift + offset + tare)`.
    pub residual: f64,
}

/// A sampled point on the drift curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub elapsed_seconds: f64,
    pub value: f64,
}

/// Output of a single inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub degree: DriftDegree,
    pub anchor: String,
    /// Time of the first used reading; drift time is measured from here.
    pub reference_time: DateTime<Utc>,
    /// Elapsed seconds of the last used reading.
    pub span_seconds: f64,
    /// Drift polynomial in elapsed seconds, highest power first, constant last (µGal).
    pub drift_coefficients: Vec<f64>,
    pub drift_std_devs: Vec<f64>,
    pub benchmark_offsets: BTreeMap<String, BenchmarkOffset>,
    pub tare: Option<TareEstimate>,
    pub diagnostics: FitDiagnostics,
    pub reduced: Vec<ReducedObservation>,
}

impl Solution {
    /// Coefficient of the linear drift term (µGal/s).
    pub fn drift_rate_per_second(&self) -> f64 {
        let n = self.drift_coefficients.len();
        if n < 2 {
            return 0.0;
        }
        self.drift_coefficients[n - 2]
    }

    pub fn drift_rate_per_day(&self) -> f64 {
        self.drift_rate_per_second() * SECONDS_PER_DAY
    }

    /// Anchor first, then the remaining benchmarks in ascending label order.
    pub fn benchmark_order(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.benchmark_offsets.len());
        out.push(self.anchor.as_str());
        out.extend(
            self.benchmark_offsets
                .keys()
                .map(String::as_str)
                .filter(|label| *label != self.anchor),
        );
        out
    }

    pub fn offset(&self, benchmark: &str) -> Option<BenchmarkOffset> {
        self.benchmark_offsets.get(benchmark).copied()
    }

    /// Drift curve sampled every `interval_seconds` over the used time span.
    pub fn drift_curve(&self, interval_seconds: f64) -> Vec<CurvePoint> {
        crate::math::interpolate_curve(&self.drift_coefficients, self.span_seconds, interval_seconds)
    }
}
