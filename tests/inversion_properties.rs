// tests/inversion_properties.rs
//
// End-to-end checks of `inversion::solve` through the public API:
// anchor convention, design structure, weighting, tide toggling, degrees of
// freedom, exact recovery, exclusion, tare and display-only drift removal.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use chrono::{DateTime, Utc};

use grav_inversion::data::{SurveyPlan, generate_survey};
use grav_inversion::domain::{BenchmarkOffset, DriftDegree, Observation, SolveConfig, Weighting};
use grav_inversion::inversion::corrections::{active_subset, solver_values};
use grav_inversion::inversion::design::drift_matrix;
use grav_inversion::inversion::{InversionError, solve};

const BASE_MGAL: f64 = 3_100.250;

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_618_218_900 + seconds, 0).unwrap()
}

fn reading(t: i64, label: &str, ugal: f64) -> Observation {
    Observation::new(at(t), label, BASE_MGAL + ugal / 1000.0, 0.005)
}

/// A, B, C each read three times over one hour; 10 µGal/h drift; B = +50, C = -30.
fn hour_loop() -> Vec<Observation> {
    let drift = 10.0 / 3600.0;
    let offsets = [("A", 0.0), ("B", 50.0), ("C", -30.0)];
    (0..9)
        .map(|k| {
            let t = k * 450;
            let (label, offset) = offsets[k as usize % 3];
            reading(t, label, offset + drift * t as f64)
        })
        .collect()
}

#[test]
fn anchor_is_zero_for_every_configuration() {
    let survey = generate_survey(&SurveyPlan::default()).unwrap();
    for degree in [DriftDegree::Linear, DriftDegree::Quadratic] {
        for anchor in [None, Some("BM03".to_string())] {
            for weighting in [Weighting::InverseVariance, Weighting::Uniform] {
                let config = SolveConfig {
                    degree,
                    anchor: anchor.clone(),
                    weighting,
                    ..SolveConfig::default()
                };
                let solution = solve(&survey.observations, &config).unwrap();
                assert_eq!(solution.offset(&solution.anchor), Some(BenchmarkOffset::ANCHOR));
            }
        }
    }
}

#[test]
fn drift_block_has_degree_plus_one_rows() {
    let times = [0.0, 30.0, 60.0, 90.0, 120.0];
    for degree in [DriftDegree::Linear, DriftDegree::Quadratic, DriftDegree::Cubic] {
        let m = drift_matrix(&times, degree);
        let d = degree.order();
        assert_eq!(m.nrows(), d + 1);
        assert_eq!(m.ncols(), times.len());
        for (c, t) in times.iter().enumerate() {
            assert_eq!(m[(d, c)], 1.0);
            for r in 0..d {
                assert_eq!(m[(r, c)], t.powi((d - r) as i32));
            }
        }
    }
}

#[test]
fn ols_and_wls_agree_when_errors_are_equal() {
    let survey = generate_survey(&SurveyPlan {
        noise_ugal: 4.0,
        ..SurveyPlan::default()
    })
    .unwrap();

    let wls = solve(&survey.observations, &SolveConfig::default()).unwrap();
    let ols = solve(
        &survey.observations,
        &SolveConfig {
            weighting: Weighting::Uniform,
            ..SolveConfig::default()
        },
    )
    .unwrap();

    for (a, b) in wls.drift_coefficients.iter().zip(&ols.drift_coefficients) {
        assert_relative_eq!(*a, *b, max_relative = 1e-8, epsilon = 1e-9);
    }
    for (label, fit) in &wls.benchmark_offsets {
        let other = ols.benchmark_offsets[label];
        assert_relative_eq!(fit.offset, other.offset, max_relative = 1e-8, epsilon = 1e-9);
        assert_relative_eq!(fit.std_dev, other.std_dev, max_relative = 1e-6, epsilon = 1e-9);
    }
}

#[test]
fn toggling_tide_twice_restores_solver_input() {
    let observations: Vec<Observation> = hour_loop()
        .into_iter()
        .enumerate()
        .map(|(i, o)| o.with_tide(i % 2 == 0, 0.001 * (i as f64 + 1.0)))
        .collect();
    let active = active_subset(&observations);

    for start in [true, false] {
        let first = solver_values(&active, start);
        let flipped = solver_values(&active, !start);
        let back = solver_values(&active, start);
        assert_ne!(first, flipped);
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            back.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    let config = SolveConfig::default();
    let toggled = SolveConfig {
        correct_tide: false,
        ..config.clone()
    };
    let a = solve(&observations, &config).unwrap();
    let _ = solve(&observations, &toggled).unwrap();
    let b = solve(&observations, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn zero_degrees_of_freedom_is_invalid_configuration() {
    // Linear drift + one free benchmark = 3 parameters; 4 readings leaves dof 0.
    let observations = vec![
        reading(0, "A", 0.0),
        reading(600, "B", 20.0),
        reading(1200, "A", 1.0),
        reading(1800, "B", 21.0),
    ];
    let err = solve(&observations, &SolveConfig::default()).unwrap_err();
    assert!(matches!(err, InversionError::InvalidConfiguration(_)), "{err}");

    // One more reading makes it solvable.
    let mut more = observations.clone();
    more.push(reading(2400, "A", 2.0));
    let solution = solve(&more, &SolveConfig::default()).unwrap();
    assert_eq!(solution.diagnostics.dof, 1);
}

#[test]
fn noise_free_loop_is_recovered_exactly() {
    let solution = solve(&hour_loop(), &SolveConfig::default()).unwrap();

    assert_eq!(solution.anchor, "A");
    assert_abs_diff_eq!(solution.offset("B").unwrap().offset, 50.0, epsilon = 1e-6);
    assert_abs_diff_eq!(solution.offset("C").unwrap().offset, -30.0, epsilon = 1e-6);
    assert_abs_diff_eq!(solution.drift_rate_per_second(), 10.0 / 3600.0, epsilon = 1e-10);
    assert_abs_diff_eq!(
        *solution.drift_coefficients.last().unwrap(),
        BASE_MGAL * 1000.0,
        epsilon = 1e-4
    );
    assert_eq!(solution.span_seconds, 3600.0);
    assert_eq!(solution.benchmark_order(), vec!["A", "B", "C"]);
}

#[test]
fn excluding_a_reading_changes_the_fit() {
    let mut observations = generate_survey(&SurveyPlan::default()).unwrap().observations;
    let all = solve(&observations, &SolveConfig::default()).unwrap();

    observations[5].include = false;
    let fewer = solve(&observations, &SolveConfig::default()).unwrap();

    assert_eq!(fewer.diagnostics.n_observations, all.diagnostics.n_observations - 1);
    assert_eq!(fewer.diagnostics.dof, all.diagnostics.dof - 1);
    assert_ne!(fewer.drift_coefficients, all.drift_coefficients);
    assert!(fewer.reduced.iter().all(|r| r.index != 5));
}

#[test]
fn tare_step_is_recovered_and_removed() {
    let plan = SurveyPlan {
        benchmarks: 3,
        loops: 4,
        noise_ugal: 0.0,
        tare: Some((7, 40.0)),
        ..SurveyPlan::default()
    };
    let survey = generate_survey(&plan).unwrap();
    let config = SolveConfig {
        tare_enabled: true,
        tare_index: 7,
        ..SolveConfig::default()
    };
    let solution = solve(&survey.observations, &config).unwrap();

    let tare = solution.tare.unwrap();
    assert_eq!(tare.index, 7);
    assert_abs_diff_eq!(tare.offset, 40.0, epsilon = 1e-6);
    for (label, truth) in &survey.true_offsets {
        assert_abs_diff_eq!(solution.offset(label).unwrap().offset, *truth, epsilon = 1e-6);
    }
    assert!(!solution.benchmark_offsets.keys().any(|k| k.contains("tare")));
    for r in &solution.reduced {
        let expected = if r.index >= 7 { tare.offset } else { 0.0 };
        assert_abs_diff_eq!(r.tare, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(r.residual, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn collinear_tare_and_benchmark_is_singular() {
    // C is only read after the tare, so its indicator equals the tare column.
    let observations = vec![
        reading(0, "A", 0.0),
        reading(600, "B", 10.0),
        reading(1200, "A", 1.0),
        reading(1800, "B", 11.0),
        reading(2400, "C", 30.0),
        reading(3000, "C", 31.0),
        reading(3600, "C", 30.5),
    ];
    let config = SolveConfig {
        tare_enabled: true,
        tare_index: 4,
        ..SolveConfig::default()
    };
    let err = solve(&observations, &config).unwrap_err();
    assert!(matches!(err, InversionError::SingularDesignMatrix(_)), "{err}");
}

#[test]
fn cubic_drift_on_two_epochs_is_singular() {
    // Only two distinct times cannot pin down four drift coefficients.
    let observations = vec![
        reading(0, "A", 0.0),
        reading(0, "B", 20.0),
        reading(0, "A", 0.5),
        reading(900, "B", 23.0),
        reading(900, "A", 3.0),
        reading(900, "B", 22.5),
        reading(900, "A", 2.5),
    ];
    let config = SolveConfig {
        degree: DriftDegree::Cubic,
        ..SolveConfig::default()
    };
    let err = solve(&observations, &config).unwrap_err();
    assert!(matches!(err, InversionError::SingularDesignMatrix(_)), "{err}");

    // The same readings support a linear drift.
    assert!(solve(&observations, &SolveConfig::default()).is_ok());
}

#[test]
fn default_anchor_stays_put_when_first_reading_is_excluded() {
    let mut observations = generate_survey(&SurveyPlan::default()).unwrap().observations;
    let before = solve(&observations, &SolveConfig::default()).unwrap();

    observations[0].include = false;
    let after = solve(&observations, &SolveConfig::default()).unwrap();

    assert_eq!(after.anchor, observations[0].benchmark);
    assert_eq!(after.anchor, before.anchor);
    assert_eq!(after.offset(&after.anchor), Some(BenchmarkOffset::ANCHOR));
    for label in ["BM02", "BM03", "BM04"] {
        let a = before.offset(label).unwrap();
        let b = after.offset(label).unwrap();
        assert!((a.offset - b.offset).abs() < 3.0 * (a.std_dev + b.std_dev), "{label}");
    }
}

#[test]
fn drift_removal_only_changes_reduced_values() {
    let survey = generate_survey(&SurveyPlan::default()).unwrap();
    let kept = solve(&survey.observations, &SolveConfig::default()).unwrap();
    let removed = solve(
        &survey.observations,
        &SolveConfig {
            remove_drift: true,
            ..SolveConfig::default()
        },
    )
    .unwrap();

    assert_eq!(kept.drift_coefficients, removed.drift_coefficients);
    assert_eq!(kept.benchmark_offsets, removed.benchmark_offsets);
    for (a, b) in kept.reduced.iter().zip(&removed.reduced) {
        assert_abs_diff_eq!(a.reduced - b.reduced, a.drift, epsilon = 1e-6);
        assert_eq!(a.residual, b.residual);
    }
}

#[test]
fn bad_reading_error_is_invalid_observation() {
    let mut observations = hour_loop();
    observations[4].error = -0.01;
    match solve(&observations, &SolveConfig::default()) {
        Err(InversionError::InvalidObservation { index, .. }) => assert_eq!(index, 4),
        other => panic!("unexpected: {other:?}"),
    }

    // Excluded readings are not validated.
    observations[4].include = false;
    assert!(solve(&observations, &SolveConfig::default()).is_ok());
}
