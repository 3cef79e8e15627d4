//! Drift polynomial evaluation.
//!
//! Coefficients are ordered highest power first, constant term last, which is
//! the order the design matrix emits drift rows in.

use crate::domain::CurvePoint;

/// Upper bound on the number of sampled curve points.
pub const MAX_CURVE_POINTS: usize = 1_000_000;

/// Evaluate a polynomial at `x` using Horner's scheme.
///
/// An empty coefficient list evaluates to 0.
pub fn evaluate_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, c| acc * x + c)
}

/// Sample the polynomial every `interval` seconds on `[0, domain_end)`.
///
/// Produces `round(domain_end / interval)` points at `i · interval`, at most
/// `MAX_CURVE_POINTS`. Non-finite or non-positive arguments yield an empty curve.
pub fn interpolate_curve(coefficients: &[f64], domain_end: f64, interval: f64) -> Vec<CurvePoint> {
    if !(domain_end.is_finite() && interval.is_finite()) || domain_end <= 0.0 || interval <= 0.0 {
        return Vec::new();
    }

    let n_points = curve_point_count(domain_end, interval).min(MAX_CURVE_POINTS);
    (0..n_points)
        .map(|i| {
            let x = i as f64 * interval;
            CurvePoint {
                elapsed_seconds: x,
                value: evaluate_polynomial(coefficients, x),
            }
        })
        .collect()
}

/// Number of points `interpolate_curve` would sample before capping.
pub fn curve_point_count(domain_end: f64, interval: f64) -> usize {
    // `as` saturates for huge ratios.
    (domain_end / interval).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horner_matches_expanded_form() {
        // 2x³ - x² + 0.5x + 7
        let c = [2.0, -1.0, 0.5, 7.0];
        for &x in &[-3.0, 0.0, 1.5, 10.0] {
            let expected = 2.0 * x * x * x - x * x + 0.5 * x + 7.0;
            assert!((evaluate_polynomial(&c, x) - expected).abs() < 1e-9);
        }
        assert_eq!(evaluate_polynomial(&[], 4.0), 0.0);
    }

    #[test]
    fn curve_has_one_point_per_interval() {
        let curve = interpolate_curve(&[1.0, 0.0], 3600.0, 60.0);
        assert_eq!(curve.len(), 60);
        assert_eq!(curve[0].elapsed_seconds, 0.0);
        assert_eq!(curve[59].elapsed_seconds, 3540.0);
        assert!((curve[10].value - 600.0).abs() < 1e-12);
    }

    #[test]
    fn curve_length_is_capped() {
        assert_eq!(curve_point_count(7200.0, 1e-9), 7_200_000_000_000);
        let curve = interpolate_curve(&[1.0, 0.0], 7200.0, 1e-9);
        assert_eq!(curve.len(), MAX_CURVE_POINTS);
    }

    #[test]
    fn curve_rejects_bad_sampling() {
        assert!(interpolate_curve(&[1.0, 0.0], 3600.0, 0.0).is_empty());
        assert!(interpolate_curve(&[1.0, 0.0], -1.0, 60.0).is_empty());
        assert!(interpolate_curve(&[1.0, 0.0], f64::NAN, 60.0).is_empty());
    }
}
