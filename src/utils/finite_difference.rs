//! Finite difference methods for numerical differentiation.
//!
//! This module provides the forward-difference Jacobian used for covariance
//! estimation.

use crate::error::{LayerFitError, Result};
use ndarray::{Array1, Array2};

/// Relative step for two-point differences.
pub const RELATIVE_STEP: f64 = 1.4901161193847656e-8; // sqrt(f64::EPSILON)

/// Step used to perturb a parameter of value `x`.
///
/// The step is `RELATIVE_STEP * max(1, |x|)` and carries the sign of `x`,
/// with zero treated as positive. The step is then rounded through `x` so
/// that `(x + h) - x` is exactly representable.
pub fn forward_step(x: f64) -> f64 {
    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let h = RELATIVE_STEP * sign * x.abs().max(1.0);
    (x + h) - x
}

/// Compute the Jacobian matrix using forward finite differences.
///
/// The Jacobian is the matrix of partial derivatives of the residuals with
/// respect to the parameters: J[i,j] = ∂residual[i]/∂param[j].
///
/// # Arguments
///
/// * `f` - The residual function
/// * `params` - The parameter values at which to evaluate the Jacobian
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian matrix, one row per residual
pub fn jacobian<F>(mut f: F, params: &Array1<f64>) -> Result<Array2<f64>>
where
    F: FnMut(&Array1<f64>) -> Result<Array1<f64>>,
{
    let n_params = params.len();
    let residuals = f(params)?;
    let n_residuals = residuals.len();

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let h = forward_step(params[j]);
        let mut params_perturbed = params.clone();
        params_perturbed[j] += h;

        let residuals_perturbed = f(&params_perturbed)?;
        if residuals_perturbed.len() != n_residuals {
            return Err(LayerFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                n_residuals,
                residuals_perturbed.len()
            )));
        }

        let column = (&residuals_perturbed - &residuals) / h;
        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}
