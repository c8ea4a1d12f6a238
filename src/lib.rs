//! # layerfit-rs
//!
//! `layerfit-rs` fits layered-sample models to ellipsometry and reflectivity
//! style data, with a Bayesian view of the fit.
//!
//! The library provides:
//! - A parameter graph with shared parameters, priors and expression constraints
//! - An objective giving residuals, chi-squared, log-prior, log-likelihood and
//!   log-posterior for any model and dataset
//! - Covariance and standard errors from a finite-difference Jacobian
//! - Draws from an externally produced posterior chain
//! - Layer components, including a freeform spline volume-fraction profile
//!
//! ## Basic Usage
//!
//! ```
//! use layerfit_rs::dataset::Data1D;
//! use layerfit_rs::model::BaseModel;
//! use layerfit_rs::objective::Objective;
//! use layerfit_rs::parameters::{ParameterGraph, ParameterSet};
//! use ndarray::{array, Axis};
//!
//! let mut params = ParameterSet::new();
//! let slope = params.add_param("slope", 1.0);
//! let offset = params.add_param("offset", 0.0);
//!
//! let model = BaseModel::new(
//!     ParameterGraph::from_params("line", &[slope, offset]),
//!     move |p, x, _| {
//!         let (m, c) = (p.value(slope)?, p.value(offset)?);
//!         Ok(x.mapv(|v| m * v + c).insert_axis(Axis(0)))
//!     },
//! );
//! let data = Data1D::new(array![0.0, 1.0, 2.0], array![1.0, 3.0, 5.0])
//!     .unwrap()
//!     .with_y_err(array![1.0, 1.0, 1.0])
//!     .unwrap();
//!
//! let mut objective = Objective::new(&model, &data, params);
//! assert_eq!(objective.chisqr(Some(&[2.0, 1.0][..])).unwrap(), 0.0);
//! ```

pub mod components;
pub mod dataset;
pub mod error;
pub mod model;
pub mod objective;
pub mod parameters;
pub mod uncertainty;
pub mod utils;

// Re-exports for convenience
pub use error::{LayerFitError, Result};

pub use components::{Component, LayeredModel, Sld, Slab, SplineProfile, Structure};
pub use dataset::{Data1D, Dataset, EllipsometryData};
pub use model::{BaseModel, Model};
pub use objective::{ChannelCombination, Objective};
pub use parameters::{Bounds, ParamId, Parameter, ParameterGraph, ParameterSet};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
