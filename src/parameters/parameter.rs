//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the leaf of every parameter
//! graph. A parameter either stores its value directly or derives it from a
//! [`Constraint`] over other parameters held by the same
//! [`ParameterSet`](crate::parameters::ParameterSet).

use crate::parameters::bounds::{Bounds, PriorDistribution, PriorError};
use crate::parameters::constraints::Constraint;
use crate::parameters::expression::ExpressionError;
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' is constrained; its value is derived and cannot be set or varied")]
    Constrained { name: String },

    #[error("Constraint on '{name}' uses variable '{variable}' which is not bound to a parameter")]
    UnboundVariable { name: String, variable: String },

    #[error("Circular dependency in constraint for parameter '{name}'")]
    CircularDependency { name: String },

    #[error("Cannot evaluate constraint for parameter '{name}': {source}")]
    Evaluation {
        name: String,
        source: ExpressionError,
    },

    #[error("Unknown parameter handle {index}")]
    UnknownHandle { index: usize },

    #[error("Bounds error: {0}")]
    Bounds(#[from] PriorError),
}

/// How a parameter obtains its value.
#[derive(Debug, Clone)]
pub(crate) enum ParamValue {
    Stored(f64),
    Derived(Constraint),
}

/// A named scalar with a vary flag and a prior distribution.
///
/// Parameters are normally created through
/// [`ParameterSet::add`](crate::parameters::ParameterSet::add), which hands
/// back a [`ParamId`](crate::parameters::ParamId) handle. The handle, not the
/// name, defines the identity of a parameter: two parameters may share a name.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    pub(crate) value: ParamValue,
    vary: bool,
    bounds: Bounds,
    stderr: Option<f64>,
}

impl Parameter {
    /// Create a new varying, unbounded parameter
    ///
    /// # Examples
    ///
    /// ```
    /// use layerfit_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::new("thickness", 10.0);
    /// assert_eq!(param.name(), "thickness");
    /// assert_eq!(param.stored_value(), Some(10.0));
    /// assert!(param.vary());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value: ParamValue::Stored(value),
            vary: true,
            bounds: Bounds::default(),
            stderr: None,
        }
    }

    /// Create a parameter that is held fixed during a fit
    pub fn fixed(name: &str, value: f64) -> Self {
        Self {
            vary: false,
            ..Self::new(name, value)
        }
    }

    /// Create a varying parameter with the given prior
    pub fn with_bounds(name: &str, value: f64, bounds: Bounds) -> Self {
        Self {
            bounds,
            ..Self::new(name, value)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// The stored value, or `None` for a constrained parameter.
    pub fn stored_value(&self) -> Option<f64> {
        match &self.value {
            ParamValue::Stored(value) => Some(*value),
            ParamValue::Derived(_) => None,
        }
    }

    /// Set the stored value.
    ///
    /// Values outside the prior's support are accepted: the log-prior, not the
    /// setter, rules them out.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        match &mut self.value {
            ParamValue::Stored(stored) => {
                *stored = value;
                Ok(())
            }
            ParamValue::Derived(_) => Err(ParameterError::Constrained {
                name: self.name.clone(),
            }),
        }
    }

    pub fn is_constrained(&self) -> bool {
        matches!(self.value, ParamValue::Derived(_))
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        match &self.value {
            ParamValue::Derived(constraint) => Some(constraint),
            ParamValue::Stored(_) => None,
        }
    }

    /// Whether the parameter may be adjusted by an optimizer or sampler.
    ///
    /// Always `false` for a constrained parameter.
    pub fn vary(&self) -> bool {
        self.vary && !self.is_constrained()
    }

    pub fn set_vary(&mut self, vary: bool) -> Result<(), ParameterError> {
        if vary && self.is_constrained() {
            return Err(ParameterError::Constrained {
                name: self.name.clone(),
            });
        }
        self.vary = vary;
        Ok(())
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Give the parameter a hard `[lb, ub]` interval and let it vary.
    pub fn range(&mut self, lb: f64, ub: f64) -> Result<(), ParameterError> {
        self.bounds = Bounds::interval(lb, ub)?;
        self.set_vary(true)
    }

    /// Log-prior density of `value` under this parameter's bounds.
    pub fn logp(&self, value: f64) -> f64 {
        self.bounds.logpdf(value)
    }

    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }
}
