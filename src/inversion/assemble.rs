//! Map the solved parameter vector back to named quantities.

use std::collections::BTreeMap;

use crate::domain::{BenchmarkOffset, TareEstimate};
use crate::inversion::design::{DesignMatrix, Parameter};
use crate::math::WlsFit;

/// Solved parameters split by role.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledParameters {
    /// Highest power first, constant last.
    pub drift_coefficients: Vec<f64>,
    pub drift_std_devs: Vec<f64>,
    /// Includes the anchor at zero.
    pub benchmark_offsets: BTreeMap<String, BenchmarkOffset>,
    pub tare: Option<TareEstimate>,
}

/// Pair every design row with its solved value and standard deviation.
///
/// Relies on the builder's row order: drift rows first, then benchmarks, then the
/// optional tare row last.
pub fn assemble(design: &DesignMatrix, fit: &WlsFit, anchor: &str) -> AssembledParameters {
    let mut drift_coefficients = Vec::new();
    let mut drift_std_devs = Vec::new();
    let mut benchmark_offsets = BTreeMap::new();
    let mut tare = None;

    benchmark_offsets.insert(anchor.to_string(), BenchmarkOffset::ANCHOR);

    for (i, parameter) in design.parameters.iter().enumerate() {
        let value = fit.coefficients[i];
        let std_dev = fit.std_devs[i];
        match parameter {
            Parameter::Drift { .. } => {
                drift_coefficients.push(value);
                drift_std_devs.push(std_dev);
            }
            Parameter::Benchmark(label) => {
                benchmark_offsets.insert(label.clone(), BenchmarkOffset { offset: value, std_dev });
            }
            Parameter::Tare { index } => {
                tare = Some(TareEstimate {
                    index: *index,
                    offset: value,
                    std_dev,
                });
            }
        }
    }

    AssembledParameters {
        drift_coefficients,
        drift_std_devs,
        benchmark_offsets,
        tare,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DriftDegree;
    use crate::inversion::design::build_design_matrix;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn splits_drift_benchmarks_and_tare() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let labels = ["A", "B", "C", "A", "B", "C"];
        let design = build_design_matrix(&times, DriftDegree::Quadratic, &labels, "A", Some(4));

        let p = design.n_parameters();
        assert_eq!(p, 3 + 2 + 1);
        let fit = WlsFit {
            coefficients: DVector::from_vec(vec![0.1, 0.2, 0.3, 50.0, -30.0, 7.0]),
            std_devs: DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            covariance: DMatrix::identity(p, p),
            residuals: DVector::zeros(6),
            chi_square: 0.0,
            dof: 1,
        };

        let out = assemble(&design, &fit, "A");
        assert_eq!(out.drift_coefficients, vec![0.1, 0.2, 0.3]);
        assert_eq!(out.drift_std_devs, vec![1.0, 2.0, 3.0]);
        assert_eq!(out.benchmark_offsets["A"], BenchmarkOffset::ANCHOR);
        assert_eq!(out.benchmark_offsets["B"], BenchmarkOffset { offset: 50.0, std_dev: 4.0 });
        assert_eq!(out.benchmark_offsets["C"], BenchmarkOffset { offset: -30.0, std_dev: 5.0 });
        assert_eq!(out.tare, Some(TareEstimate { index: 4, offset: 7.0, std_dev: 6.0 }));
    }
}
