//! # Covariance Matrix Calculations
//!
//! This module provides functions for calculating and manipulating covariance
//! matrices from the Jacobian of a residual vector.

use crate::error::{LayerFitError, Result};
use crate::utils::matrix_convert::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra};
use ndarray::{Array1, Array2, Axis};

/// Calculate the covariance matrix from a Jacobian matrix.
///
/// The covariance is the pseudo-inverse of `J^T J`, built from the thin SVD
/// `J = U S V^T` as
///   covar = Σ_k v_k v_k^T / s_k^2
/// over the singular values above `eps * max(m, n) * s_max`. Directions with
/// smaller singular values are not constrained by the data and are dropped,
/// which leaves a zero row and column for a parameter the residuals do not
/// depend on.
pub fn covariance_from_jacobian(jacobian: &Array2<f64>) -> Result<Array2<f64>> {
    let (m, n) = jacobian.dim();
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    if jacobian.iter().any(|v| !v.is_finite()) {
        return Err(LayerFitError::LinearAlgebraError(
            "Jacobian contains non-finite entries".to_string(),
        ));
    }

    let svd = ndarray_to_nalgebra(jacobian).svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        LayerFitError::LinearAlgebraError("SVD did not produce right singular vectors".to_string())
    })?;
    let singular = nalgebra_vec_to_ndarray(&svd.singular_values);

    let s_max = singular.iter().copied().fold(0.0, f64::max);
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;

    let mut covar = Array2::zeros((n, n));
    for (k, &s) in singular.iter().enumerate() {
        if s <= threshold {
            continue;
        }
        let v: Array1<f64> = (0..n).map(|j| v_t[(k, j)]).collect();
        let column = v.view().insert_axis(Axis(1));
        let row = v.view().insert_axis(Axis(0));
        covar = covar + column.dot(&row) / (s * s);
    }

    Ok(covar)
}

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
///
/// Entries involving a parameter with zero variance are set to zero.
pub fn correlation_from_covariance(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar
        .diag()
        .mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}
