use thiserror::Error;

use crate::parameters::bounds::PriorError;
use crate::parameters::expression::ExpressionError;
use crate::parameters::parameter::ParameterError;

/// Error types for the layerfit-rs library.
#[derive(Error, Debug)]
pub enum LayerFitError {
    /// A vector or matrix had a length/shape that matches no accepted contract.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Parameters with no measurable effect on the residuals.
    #[error(
        "The following parameters have no effect on the residuals, consider fixing them: {}",
        .names.join(", ")
    )]
    SingularParameters { names: Vec<String> },

    /// Functionality that cannot be provided for the given inputs.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Error for invalid parameter values.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// `pgen` was called before any chain was installed.
    #[error("No posterior chain available: {0}")]
    MissingChain(String),

    /// Error raised by the parameter system.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Error raised by a prior distribution.
    #[error("Prior error: {0}")]
    Prior(#[from] PriorError),

    /// Error raised while parsing or evaluating a constraint expression.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
}

/// Result type alias for layerfit-rs operations.
pub type Result<T> = std::result::Result<T, LayerFitError>;
