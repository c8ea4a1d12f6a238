//! Model trait and a closure-based model implementation.
//!
//! A Model maps the independent variable of a dataset to a prediction of every
//! observed channel, reading its parameter values from a
//! [`ParameterSet`]. Models do not own their parameters; they hold handles and
//! expose them as a [`ParameterGraph`].

use crate::error::Result;
use crate::parameters::{ParameterGraph, ParameterSet};
use ndarray::{Array2, ArrayView1};

/// A generative model that can be fit to data.
pub trait Model {
    /// The parameters this model reads, possibly with repeats.
    fn parameters(&self) -> ParameterGraph;

    /// Evaluates the model at the given x values using the current parameter values.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values to use
    /// * `x` - The independent variable values
    /// * `x_err` - Uncertainty in `x`, for models that smear over it
    ///
    /// # Returns
    ///
    /// * The prediction, shape `(n_channels, x.len())`
    fn evaluate(
        &self,
        params: &ParameterSet,
        x: ArrayView1<f64>,
        x_err: Option<ArrayView1<f64>>,
    ) -> Result<Array2<f64>>;

    /// Extra log-probability contributed by the model itself.
    ///
    /// Parameter priors are accounted for elsewhere and must not be repeated
    /// here.
    fn logp(&self, _params: &ParameterSet) -> Result<f64> {
        Ok(0.0)
    }
}

type EvalFn =
    dyn Fn(&ParameterSet, ArrayView1<f64>, Option<ArrayView1<f64>>) -> Result<Array2<f64>> + Send + Sync;
type LogpFn = dyn Fn(&ParameterSet) -> Result<f64> + Send + Sync;

/// A model built from a parameter graph and an evaluation closure.
pub struct BaseModel {
    parameters: ParameterGraph,
    eval_func: Box<EvalFn>,
    logp_func: Option<Box<LogpFn>>,
}

impl BaseModel {
    /// Create a new BaseModel with the given parameters and evaluation function
    pub fn new<F>(parameters: ParameterGraph, eval_func: F) -> Self
    where
        F: Fn(&ParameterSet, ArrayView1<f64>, Option<ArrayView1<f64>>) -> Result<Array2<f64>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            parameters,
            eval_func: Box::new(eval_func),
            logp_func: None,
        }
    }

    /// Add a model-level log-probability term
    pub fn with_logp<F>(mut self, logp_func: F) -> Self
    where
        F: Fn(&ParameterSet) -> Result<f64> + Send + Sync + 'static,
    {
        self.logp_func = Some(Box::new(logp_func));
        self
    }
}

impl std::fmt::Debug for BaseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseModel")
            .field("parameters", &self.parameters)
            .field("has_logp", &self.logp_func.is_some())
            .finish()
    }
}

impl Model for BaseModel {
    fn parameters(&self) -> ParameterGraph {
        self.parameters.clone()
    }

    fn evaluate(
        &self,
        params: &ParameterSet,
        x: ArrayView1<f64>,
        x_err: Option<ArrayView1<f64>>,
    ) -> Result<Array2<f64>> {
        (self.eval_func)(params, x, x_err)
    }

    fn logp(&self, params: &ParameterSet) -> Result<f64> {
        match &self.logp_func {
            Some(func) => func(params),
            None => Ok(0.0),
        }
    }
}
