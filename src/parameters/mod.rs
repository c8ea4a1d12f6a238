//! # Parameter System
//!
//! Parameters live in a [`ParameterSet`] arena and are referred to everywhere
//! else by [`ParamId`] handles. Models expose their parameters as a
//! [`ParameterGraph`], a nested tree of handles in which the same parameter may
//! appear more than once.
//!
//! ## Key Features
//!
//! - **Shared Parameters**: One handle in several places is one quantity
//! - **Priors**: Hard intervals, normal and soft-truncated normal priors, or your own
//! - **Constraints**: Derive a parameter from others with a mathematical expression
//! - **Vector Views**: Read and write the varying parameters as a flat vector
//!
//! ## Example Usage
//!
//! ```rust
//! use layerfit_rs::parameters::{ParameterGraph, ParameterSet};
//!
//! let mut params = ParameterSet::new();
//! let thick = params.add_param_with_bounds("thick", 10.0, 0.0, 50.0).unwrap();
//! let rough = params.add_param("rough", 3.0);
//!
//! // the same roughness on both interfaces
//! let mut graph = ParameterGraph::named("film");
//! graph.extend([rough, thick, rough]);
//!
//! assert_eq!(graph.flatten().len(), 3);
//! assert_eq!(graph.unique_varying(&params), vec![rough, thick]);
//!
//! graph.set_values(&mut params, &[4.0, 12.0]).unwrap();
//! assert_eq!(params.value(rough).unwrap(), 4.0);
//! ```

pub mod bounds;
pub mod constraints;
pub mod expression;
pub mod graph;
pub mod parameter;
pub mod parameters;


pub use bounds::{Bounds, Interval, NormalPrior, PriorDistribution, PriorError, SoftTruncNormal};
pub use constraints::Constraint;
pub use expression::{EvaluationContext, Expression, ExpressionError};
pub use graph::{ParamNode, ParameterGraph};
pub use parameter::{Parameter, ParameterError};
pub use parameters::{ParamId, ParameterSet};
