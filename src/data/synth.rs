//! Synthetic survey generation.
//!
//! Produces a looped benchmark survey with known offsets, linear instrument
//! drift, Gaussian reading noise, an optional tare step and an optional
//! semi-diurnal tide. Runs are reproducible from the seed.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{MGAL_TO_UGAL, Observation};
use crate::error::AppError;

/// Principal lunar semi-diurnal (M2) period in seconds.
const M2_PERIOD_SECONDS: f64 = 44_714.0;

/// Reading level of the anchor benchmark (mGal), typical of a relative gravimeter dial.
const BASE_READING_MGAL: f64 = 2_345.678;

/// Largest absolute synthetic benchmark offset (µGal).
const MAX_OFFSET_UGAL: f64 = 250.0;

/// Parameters of a synthetic survey.
#[derive(Debug, Clone)]
pub struct SurveyPlan {
    pub benchmarks: usize,
    pub loops: usize,
    pub start: DateTime<Utc>,
    /// Time between consecutive readings.
    pub step_seconds: i64,
    /// Linear instrument drift (µGal/hour).
    pub drift_per_hour: f64,
    /// Standard deviation of the reading noise (µGal).
    pub noise_ugal: f64,
    /// Reported 1-sigma reading error (mGal).
    pub reading_error: f64,
    /// Amplitude of the applied tide correction (mGal). Zero disables it.
    pub tide_amplitude: f64,
    /// Step of `magnitude` µGal from reading `index` onward.
    pub tare: Option<(usize, f64)>,
    pub seed: u64,
}

impl Default for SurveyPlan {
    fn default() -> Self {
        Self {
            benchmarks: 4,
            loops: 3,
            start: DateTime::<Utc>::UNIX_EPOCH + Duration::days(19_000),
            step_seconds: 600,
            drift_per_hour: 10.0,
            noise_ugal: 3.0,
            reading_error: 0.005,
            tide_amplitude: 0.0,
            tare: None,
            seed: 42,
        }
    }
}

/// Generated readings plus the truth they were generated from.
#[derive(Debug, Clone)]
pub struct SyntheticSurvey {
    pub observations: Vec<Observation>,
    /// True offsets relative to the first benchmark (µGal).
    pub true_offsets: BTreeMap<String, f64>,
    pub drift_per_second: f64,
}

/// `BM01`, `BM02`, ...
pub fn benchmark_label(i: usize) -> String {
    format!("BM{:02}", i + 1)
}

pub fn generate_survey(plan: &SurveyPlan) -> Result<SyntheticSurvey, AppError> {
    if plan.benchmarks < 2 {
        return Err(AppError::new(2, "A survey needs at least two benchmarks."));
    }
    if plan.loops == 0 {
        return Err(AppError::new(2, "A survey needs at least one loop."));
    }
    if plan.step_seconds <= 0 {
        return Err(AppError::new(2, "Reading interval must be > 0 seconds."));
    }
    if !(plan.noise_ugal.is_finite() && plan.noise_ugal >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }
    if !(plan.reading_error.is_finite() && plan.reading_error > 0.0) {
        return Err(AppError::new(2, "Reading error must be finite and > 0."));
    }

    let mut rng = StdRng::seed_from_u64(plan.seed);
    let noise = Normal::new(0.0, plan.noise_ugal)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut true_offsets = BTreeMap::new();
    for i in 0..plan.benchmarks {
        let offset = if i == 0 {
            0.0
        } else {
            rng.gen_range(-MAX_OFFSET_UGAL..=MAX_OFFSET_UGAL)
        };
        true_offsets.insert(benchmark_label(i), offset);
    }

    let drift_per_second = plan.drift_per_hour / 3600.0;
    let n = plan.benchmarks * plan.loops;
    let mut observations = Vec::with_capacity(n);

    for k in 0..n {
        let label = benchmark_label(k % plan.benchmarks);
        let elapsed = k as i64 * plan.step_seconds;
        let t = elapsed as f64;

        let tare = match plan.tare {
            Some((index, magnitude)) if k >= index => magnitude,
            _ => 0.0,
        };
        let ugal = true_offsets[&label] + drift_per_second * t + tare + noise.sample(&mut rng);
        let tide = plan.tide_amplitude * (TAU * t / M2_PERIOD_SECONDS).sin();

        observations.push(
            Observation::new(
                plan.start + Duration::seconds(elapsed),
                label,
                BASE_READING_MGAL + ugal / MGAL_TO_UGAL,
                plan.reading_error,
            )
            .with_tide(true, tide),
        );
    }

    Ok(SyntheticSurvey {
        observations,
        true_offsets,
        drift_per_second,
    })
}
