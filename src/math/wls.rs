//! Weighted least squares solver.
//!
//! We solve the weighted normal equations
//!
//! ```text
//! N = (Xᵀ W X)⁻¹
//! β = N Xᵀ W y
//! ```
//!
//! and scale `N` by the a-posteriori variance factor `χ² / dof` to obtain the
//! parameter covariance.
//!
//! Implementation choices:
//! - `W` is diagonal, so we only store its diagonal and form `W X` by row scaling.
//! - Before inverting, the normal matrix is symmetrically equilibrated by its
//!   diagonal. Drift columns in seconds (`t³` reaches ~1e10 over an hour) would
//!   otherwise make any condition-number threshold meaningless. The scaling does
//!   not change the solution.
//! - The reciprocal condition number of the equilibrated matrix is estimated
//!   from its singular values; below `MIN_RCOND` the system is treated as singular.
//! - Degrees of freedom are `n - p - 1`.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::inversion::InversionError;

/// Smallest accepted reciprocal condition number of the equilibrated normal matrix.
const MIN_RCOND: f64 = 1e-12;

/// Diagonal weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    diagonal: DVector<f64>,
}

impl WeightMatrix {
    /// Unit weights (ordinary least squares).
    pub fn uniform(n: usize) -> Self {
        Self {
            diagonal: DVector::from_element(n, 1.0),
        }
    }

    /// `1 / σ²` per observation.
    pub fn inverse_variance(errors: &[f64]) -> Self {
        Self {
            diagonal: DVector::from_iterator(errors.len(), errors.iter().map(|e| 1.0 / (e * e))),
        }
    }

    pub fn diagonal(&self) -> &DVector<f64> {
        &self.diagonal
    }

    pub fn len(&self) -> usize {
        self.diagonal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagonal.is_empty()
    }

    /// Full `n × n` matrix. Only meant for inspection.
    pub fn to_dense(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.diagonal)
    }
}

/// Result of a weighted least squares solve.
#[derive(Debug, Clone)]
pub struct WlsFit {
    pub coefficients: DVector<f64>,
    /// Square roots of the covariance diagonal.
    pub std_devs: DVector<f64>,
    /// `(χ² / dof) · (Xᵀ W X)⁻¹`.
    pub covariance: DMatrix<f64>,
    pub residuals: DVector<f64>,
    pub chi_square: f64,
    pub dof: usize,
}

/// Solve `y ≈ X β` with diagonal weights `W`.
///
/// `x` is `n × p` (observations × parameters).
pub fn solve_weighted(
    x: &DMatrix<f64>,
    w: &WeightMatrix,
    y: &DVector<f64>,
) -> Result<WlsFit, InversionError> {
    let (n, p) = x.shape();
    if w.len() != n || y.len() != n {
        return Err(InversionError::InvalidConfiguration(format!(
            "dimension mismatch: design has {n} rows, weights {}, values {}",
            w.len(),
            y.len()
        )));
    }
    if p == 0 {
        return Err(InversionError::InvalidConfiguration(
            "design matrix has no parameters".to_string(),
        ));
    }

    let dof = n as i64 - p as i64 - 1;
    if dof <= 0 {
        return Err(InversionError::InvalidConfiguration(format!(
            "not enough observations: {n} observations for {p} parameters leaves {dof} degrees of freedom"
        )));
    }
    let dof = dof as usize;

    // W X, by scaling each row with its weight.
    let mut wx = x.clone();
    for (i, mut row) in wx.row_iter_mut().enumerate() {
        row *= w.diagonal[i];
    }

    let normal = x.tr_mul(&wx);
    let n_inv = invert_normal_matrix(&normal)?;

    let rhs = wx.tr_mul(y);
    let coefficients = &n_inv * rhs;

    let residuals = y - x * &coefficients;
    let chi_square: f64 = residuals
        .iter()
        .zip(w.diagonal.iter())
        .map(|(r, wi)| wi * r * r)
        .sum();

    let variance_factor = chi_square / dof as f64;
    let covariance = n_inv * variance_factor;
    let std_devs = DVector::from_iterator(p, covariance.diagonal().iter().map(|v| v.max(0.0).sqrt()));

    if coefficients.iter().any(|v| !v.is_finite()) {
        return Err(InversionError::SingularDesignMatrix(
            "solution contains non-finite coefficients".to_string(),
        ));
    }

    debug!(n, p, dof, chi_square, variance_factor, "weighted least squares solved");

    Ok(WlsFit {
        coefficients,
        std_devs,
        covariance,
        residuals,
        chi_square,
        dof,
    })
}

/// Invert a symmetric positive semi-definite normal matrix with a conditioning guard.
fn invert_normal_matrix(a: &DMatrix<f64>) -> Result<DMatrix<f64>, InversionError> {
    let p = a.nrows();

    let mut scale = DVector::<f64>::zeros(p);
    for j in 0..p {
        let d = a[(j, j)];
        if !d.is_finite() || d <= 0.0 {
            return Err(InversionError::SingularDesignMatrix(format!(
                "parameter {j} has no support in the weighted design"
            )));
        }
        scale[j] = 1.0 / d.sqrt();
    }

    let equilibrated = DMatrix::from_fn(p, p, |i, j| a[(i, j)] * scale[i] * scale[j]);

    let singular_values = equilibrated.clone().svd(false, false).singular_values;
    let max_sv = singular_values.max();
    let min_sv = singular_values.min();
    let rcond = if max_sv > 0.0 { min_sv / max_sv } else { 0.0 };
    debug!(p, rcond, "normal matrix conditioning");

    if !rcond.is_finite() || rcond < MIN_RCOND {
        return Err(InversionError::SingularDesignMatrix(format!(
            "normal matrix is ill-conditioned (reciprocal condition number {rcond:.3e})"
        )));
    }

    let inv = equilibrated.try_inverse().ok_or_else(|| {
        InversionError::SingularDesignMatrix("normal matrix could not be inverted".to_string())
    })?;

    Ok(DMatrix::from_fn(p, p, |i, j| inv[(i, j)] * scale[i] * scale[j]))
}
