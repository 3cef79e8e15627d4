//! Gravity survey inversion.
//!
//! Responsibilities:
//!
//! - select and correct the used readings (`corrections`)
//! - build the drift / benchmark / tare design matrix (`design`)
//! - solve the weighted normal equations (`crate::math::wls`)
//! - map parameters back to benchmarks and drift (`assemble`)
//!
//! `solve` is a pure function of its inputs: nothing is cached between calls.

use nalgebra::DVector;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{FitDiagnostics, Observation, Solution, SolveConfig, Weighting};
use crate::math::{WeightMatrix, solve_weighted};

pub mod assemble;
pub mod corrections;
pub mod design;

use corrections::Reduction;

/// Reasons a solve can fail. None of them leave a partial result behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InversionError {
    /// The requested setup cannot be solved (degree, tare index, anchor,
    /// degrees of freedom, empty selection).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The normal matrix is singular or too ill-conditioned to invert.
    #[error("singular design matrix: {0}")]
    SingularDesignMatrix(String),
    /// A used reading carries values the solver cannot consume.
    #[error("invalid observation #{index}: {reason}")]
    InvalidObservation { index: usize, reason: String },
}

/// Invert the used readings for benchmark offsets, drift and optional tare.
pub fn solve(observations: &[Observation], config: &SolveConfig) -> Result<Solution, InversionError> {
    let active = corrections::active_subset(observations);
    let Some(first) = active.first() else {
        return Err(InversionError::InvalidConfiguration(
            "no observations are selected for the solution".to_string(),
        ));
    };
    corrections::validate(&active)?;

    let n = active.len();
    let reference_time = first.observation.time;

    // Default anchor ignores `include`.
    let anchor = match &config.anchor {
        Some(anchor) => anchor.clone(),
        None => observations
            .iter()
            .min_by_key(|o| o.time)
            .map_or_else(|| first.observation.benchmark.clone(), |o| o.benchmark.clone()),
    };
    if !active.iter().any(|a| a.observation.benchmark == anchor) {
        return Err(InversionError::InvalidConfiguration(format!(
            "anchor benchmark '{anchor}' has no selected observations"
        )));
    }

    let tare = if config.tare_enabled {
        let index = design::effective_tare_index(Some(config.tare_index), n).ok_or_else(|| {
            InversionError::InvalidConfiguration(format!(
                "tare index {} must fall strictly inside the {n} selected observations",
                config.tare_index
            ))
        })?;
        Some(index)
    } else {
        None
    };

    let times = corrections::elapsed_seconds(&active, reference_time);
    let labels: Vec<&str> = active.iter().map(|a| a.observation.benchmark.as_str()).collect();

    let design = design::build_design_matrix(&times, config.degree, &labels, &anchor, tare);
    let x = design.transposed();
    debug!(
        n_observations = design.n_observations(),
        n_parameters = design.n_parameters(),
        "design matrix built"
    );

    let weights = match config.weighting {
        Weighting::InverseVariance => {
            let errors: Vec<f64> = active.iter().map(|a| a.observation.error).collect();
            WeightMatrix::inverse_variance(&errors)
        }
        Weighting::Uniform => WeightMatrix::uniform(n),
    };

    let values = corrections::solver_values(&active, config.correct_tide);
    let y = DVector::from_column_slice(&values);

    let fit = solve_weighted(&x, &weights, &y)?;
    let params = assemble::assemble(&design, &fit, &anchor);

    let reduced = corrections::reduce(
        &active,
        &times,
        &values,
        Reduction {
            drift_coefficients: &params.drift_coefficients,
            offsets: &params.benchmark_offsets,
            tare: params.tare.map(|t| (t.index, t.offset)),
            remove_drift: config.remove_drift,
        },
    );

    let diagnostics = FitDiagnostics {
        n_observations: n,
        n_parameters: design.n_parameters(),
        dof: fit.dof,
        chi_square: fit.chi_square,
        variance_factor: fit.chi_square / fit.dof as f64,
    };

    let solution = Solution {
        degree: config.degree,
        anchor,
        reference_time,
        span_seconds: times.last().copied().unwrap_or(0.0),
        drift_coefficients: params.drift_coefficients,
        drift_std_devs: params.drift_std_devs,
        benchmark_offsets: params.benchmark_offsets,
        tare: params.tare,
        diagnostics,
        reduced,
    };

    info!(
        anchor = %solution.anchor,
        benchmarks = solution.benchmark_offsets.len(),
        dof = diagnostics.dof,
        drift_per_day = solution.drift_rate_per_day(),
        "inversion complete"
    );

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BenchmarkOffset, DriftDegree};
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, Utc};

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_650_000_000 + seconds, 0).unwrap()
    }

    /// Three benchmarks visited in a loop, exact linear drift, no noise.
    fn looped_survey(drift_per_second: f64, offsets: &[(&str, f64)], loops: usize) -> Vec<Observation> {
        let mut out = Vec::new();
        let mut t = 0;
        for _ in 0..loops {
            for (label, offset) in offsets {
                let ugal = offset + drift_per_second * t as f64 + 1234.0;
                out.push(Observation::new(at(t), *label, ugal / 1000.0, 0.005));
                t += 400;
            }
        }
        out
    }

    #[test]
    fn recovers_offsets_and_drift() {
        let obs = looped_survey(10.0 / 3600.0, &[("A", 0.0), ("B", 50.0), ("C", -30.0)], 3);
        let solution = solve(&obs, &SolveConfig::default()).unwrap();

        assert_eq!(solution.anchor, "A");
        assert_eq!(solution.offset("A"), Some(BenchmarkOffset::ANCHOR));
        assert_abs_diff_eq!(solution.offset("B").unwrap().offset, 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.offset("C").unwrap().offset, -30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.drift_rate_per_second(), 10.0 / 3600.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.drift_rate_per_day(), 240.0, epsilon = 1e-4);
        assert_eq!(solution.diagnostics.n_parameters, 4);
        assert_eq!(solution.diagnostics.dof, 9 - 4 - 1);
        assert!(solution.reduced.iter().all(|r| r.residual.abs() < 1e-6));
    }

    #[test]
    fn explicit_anchor_shifts_reference() {
        let obs = looped_survey(0.0, &[("A", 0.0), ("B", 50.0), ("C", -30.0)], 3);
        let config = SolveConfig {
            anchor: Some("B".to_string()),
            ..SolveConfig::default()
        };
        let solution = solve(&obs, &config).unwrap();
        assert_eq!(solution.offset("B"), Some(BenchmarkOffset::ANCHOR));
        assert_abs_diff_eq!(solution.offset("A").unwrap().offset, -50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.offset("C").unwrap().offset, -80.0, epsilon = 1e-6);
        assert_eq!(solution.benchmark_order(), vec!["B", "A", "C"]);
    }

    #[test]
    fn default_anchor_survives_excluding_first_reading() {
        let mut obs = looped_survey(10.0 / 3600.0, &[("A", 0.0), ("B", 50.0), ("C", -30.0)], 3);
        let before = solve(&obs, &SolveConfig::default()).unwrap();

        obs[0].include = false;
        let after = solve(&obs, &SolveConfig::default()).unwrap();

        assert_eq!(after.anchor, "A");
        assert_eq!(after.anchor, before.anchor);
        assert_abs_diff_eq!(after.offset("B").unwrap().offset, 50.0, epsilon = 1e-6);
    }

    #[test]
    fn default_anchor_without_used_readings_is_rejected() {
        let obs = vec![
            Observation::new(at(0), "A", 1.0, 0.005).excluded(),
            Observation::new(at(400), "B", 1.0, 0.005),
            Observation::new(at(800), "C", 1.0, 0.005),
            Observation::new(at(1200), "B", 1.0, 0.005),
            Observation::new(at(1600), "C", 1.0, 0.005),
        ];
        assert!(matches!(solve(&obs, &SolveConfig::default()), Err(InversionError::InvalidConfiguration(_))));
    }

    #[test]
    fn unknown_anchor_is_rejected() {
        let obs = looped_survey(0.0, &[("A", 0.0), ("B", 50.0)], 3);
        let config = SolveConfig {
            anchor: Some("Z".to_string()),
            ..SolveConfig::default()
        };
        assert!(matches!(solve(&obs, &config), Err(InversionError::InvalidConfiguration(_))));
    }

    #[test]
    fn tare_index_out_of_range_is_rejected_when_enabled() {
        let obs = looped_survey(0.0, &[("A", 0.0), ("B", 50.0)], 4);
        for index in [0, 8, 100] {
            let config = SolveConfig {
                tare_enabled: true,
                tare_index: index,
                ..SolveConfig::default()
            };
            assert!(matches!(solve(&obs, &config), Err(InversionError::InvalidConfiguration(_))));
        }

        // Out-of-range index is irrelevant while tare is off.
        let config = SolveConfig {
            tare_index: 100,
            ..SolveConfig::default()
        };
        assert!(solve(&obs, &config).unwrap().tare.is_none());
    }

    #[test]
    fn nothing_selected_is_rejected() {
        let obs: Vec<Observation> = looped_survey(0.0, &[("A", 0.0), ("B", 1.0)], 2)
            .into_iter()
            .map(Observation::excluded)
            .collect();
        assert!(matches!(solve(&obs, &SolveConfig::default()), Err(InversionError::InvalidConfiguration(_))));
        assert!(matches!(solve(&[], &SolveConfig::default()), Err(InversionError::InvalidConfiguration(_))));
    }

    #[test]
    fn cubic_drift_over_an_hour_is_well_conditioned() {
        let obs = looped_survey(10.0 / 3600.0, &[("A", 0.0), ("B", 50.0), ("C", -30.0)], 4);
        let config = SolveConfig {
            degree: DriftDegree::Cubic,
            ..SolveConfig::default()
        };
        let solution = solve(&obs, &config).unwrap();
        assert_eq!(solution.drift_coefficients.len(), 4);
        assert_abs_diff_eq!(solution.offset("B").unwrap().offset, 50.0, epsilon = 1e-5);
        assert_abs_diff_eq!(solution.drift_coefficients[0], 0.0, epsilon = 1e-12);
    }
}
