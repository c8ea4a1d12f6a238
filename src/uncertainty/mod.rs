//! # Uncertainty Calculation
//!
//! This module provides the tools an [`Objective`](crate::objective::Objective)
//! uses to report parameter uncertainties:
//!
//! - Covariance matrix estimation from Jacobian matrices
//! - Correlation matrices and standard errors derived from a covariance
//! - Storage of externally produced posterior chains and random draws from them

mod covariance;
mod monte_carlo;

pub use covariance::{
    correlation_from_covariance, covariance_from_jacobian, standard_errors_from_covariance,
};

pub use monte_carlo::{Chain, PosteriorSamples};
