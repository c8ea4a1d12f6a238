//! Layer components and structures.
//!
//! A [`Component`] describes part of a layered sample as a table of slabs,
//! one row per layer with columns
//!
//! | 0 | 1 | 2 | 3 | 4 |
//! |---|---|---|---|---|
//! | thickness | SLD real | SLD imaginary | roughness with the layer above | solvent volume fraction |
//!
//! Components are stacked into a [`Structure`], and a [`LayeredModel`] hands
//! the stacked table to a [`LayerEvaluator`] to predict the observations.

use crate::error::Result;
use crate::parameters::{ParameterGraph, ParameterSet};
use ndarray::Array2;

mod slab;
pub mod spline;
mod structure;

pub use slab::{Sld, Slab};
pub use spline::{SplineProfile, SplineProfileBuilder};
pub use structure::{LayerEvaluator, LayeredModel, Structure};

/// Part of a layered sample.
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    /// This component's parameters, including those of any sub-components.
    fn parameters(&self) -> ParameterGraph;

    /// Slab table of shape `(n_layers, 5)`.
    fn slabs(&self, params: &ParameterSet) -> Result<Array2<f64>>;

    /// Log-probability term of the component itself, beyond its parameters' priors.
    fn logp(&self, _params: &ParameterSet) -> Result<f64> {
        Ok(0.0)
    }
}
