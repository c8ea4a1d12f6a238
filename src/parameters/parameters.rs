//! Parameter arena implementation
//!
//! This module provides the ParameterSet struct, which owns every Parameter of
//! a fit and hands out [`ParamId`] handles. Graphs, components and the
//! objective all refer to parameters by handle, so one parameter can appear in
//! several places while remaining a single quantity.

use crate::parameters::bounds::{Bounds, PriorDistribution};
use crate::parameters::constraints::Constraint;
use crate::parameters::expression::ExpressionError;
use crate::parameters::parameter::{ParamValue, Parameter, ParameterError};
use ndarray::Array1;
use std::ops::{Index, IndexMut};

/// Handle to a parameter stored in a [`ParameterSet`].
///
/// Equality of handles is identity of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

impl ParamId {
    /// Position of the parameter in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owner of all parameters of a model.
///
/// # Examples
///
/// ```
/// use layerfit_rs::parameters::ParameterSet;
///
/// let mut params = ParameterSet::new();
/// let a = params.add_param("a", 2.0);
/// let b = params.add_param("b", 0.0);
/// params.constrain(b, "2 * a", &[("a", a)]).unwrap();
///
/// assert_eq!(params.value(b).unwrap(), 4.0);
/// params.set_value(a, 3.0).unwrap();
/// assert_eq!(params.value(b).unwrap(), 6.0);
/// assert!(!params[b].vary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Take ownership of `param` and return its handle
    pub fn add(&mut self, param: Parameter) -> ParamId {
        self.params.push(param);
        ParamId(self.params.len() - 1)
    }

    /// Add a varying, unbounded parameter
    pub fn add_param(&mut self, name: &str, value: f64) -> ParamId {
        self.add(Parameter::new(name, value))
    }

    /// Add a parameter that is fixed during a fit
    pub fn add_fixed(&mut self, name: &str, value: f64) -> ParamId {
        self.add(Parameter::fixed(name, value))
    }

    /// Add a varying parameter with a hard `[lb, ub]` prior
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        lb: f64,
        ub: f64,
    ) -> Result<ParamId, ParameterError> {
        let bounds = Bounds::interval(lb, ub)?;
        Ok(self.add(Parameter::with_bounds(name, value, bounds)))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, id: ParamId) -> Option<&Parameter> {
        self.params.get(id.0)
    }

    pub fn get_mut(&mut self, id: ParamId) -> Option<&mut Parameter> {
        self.params.get_mut(id.0)
    }

    /// Handles of every parameter, in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ParamId> {
        (0..self.params.len()).map(ParamId)
    }

    /// Handle of the first parameter called `name`
    pub fn find(&self, name: &str) -> Option<ParamId> {
        self.params
            .iter()
            .position(|p| p.name() == name)
            .map(ParamId)
    }

    /// Current value of a parameter.
    ///
    /// A constrained parameter is evaluated from its dependencies, and any
    /// failure along the way is returned as [`ParameterError::Evaluation`].
    pub fn value(&self, id: ParamId) -> Result<f64, ParameterError> {
        let param = self.checked(id)?;
        match &param.value {
            ParamValue::Stored(value) => Ok(*value),
            ParamValue::Derived(constraint) => constraint
                .evaluate(|dep| {
                    self.value(dep)
                        .map_err(|err| ExpressionError::InvalidOperation {
                            message: err.to_string(),
                        })
                })
                .map_err(|source| ParameterError::Evaluation {
                    name: param.name().to_string(),
                    source,
                }),
        }
    }

    /// Set the stored value of a parameter. Fails for a constrained parameter.
    pub fn set_value(&mut self, id: ParamId, value: f64) -> Result<(), ParameterError> {
        self.checked_mut(id)?.set_value(value)
    }

    pub fn set_vary(&mut self, id: ParamId, vary: bool) -> Result<(), ParameterError> {
        self.checked_mut(id)?.set_vary(vary)
    }

    pub fn set_bounds(&mut self, id: ParamId, bounds: Bounds) -> Result<(), ParameterError> {
        self.checked_mut(id)?.set_bounds(bounds);
        Ok(())
    }

    /// Derive the value of `id` from `expr`.
    ///
    /// Every variable in `expr` must be bound to a handle in `bindings`. The
    /// parameter stops varying. Constraints that would make a parameter depend
    /// on itself are rejected and leave the set unchanged.
    pub fn constrain(
        &mut self,
        id: ParamId,
        expr: &str,
        bindings: &[(&str, ParamId)],
    ) -> Result<(), ParameterError> {
        let name = self.checked(id)?.name().to_string();
        let constraint = Constraint::new(&name, expr, bindings)?;

        for dep in constraint.dependencies() {
            self.checked(dep)?;
            if dep == id || self.depends_on(dep, id) {
                return Err(ParameterError::CircularDependency { name });
            }
        }

        let param = &mut self.params[id.0];
        param.value = ParamValue::Derived(constraint);
        param.set_vary(false)?;
        Ok(())
    }

    /// Drop the constraint on `id`, freezing its current value.
    pub fn unconstrain(&mut self, id: ParamId) -> Result<(), ParameterError> {
        let value = self.value(id)?;
        self.checked_mut(id)?.value = ParamValue::Stored(value);
        Ok(())
    }

    /// Log-prior of one parameter at its current value.
    ///
    /// An unknown handle or a constraint that cannot be evaluated has zero
    /// prior probability.
    pub fn logp(&self, id: ParamId) -> f64 {
        match (self.get(id), self.value(id)) {
            (Some(param), Ok(value)) => param.bounds().logpdf(value),
            _ => f64::NEG_INFINITY,
        }
    }

    /// Values of the given parameters, in order
    pub fn values(&self, ids: &[ParamId]) -> Result<Array1<f64>, ParameterError> {
        ids.iter().map(|&id| self.value(id)).collect()
    }

    /// Stored values of the given parameters, in order.
    ///
    /// Constrained or unknown handles are skipped.
    pub(crate) fn varying_values(&self, ids: &[ParamId]) -> Array1<f64> {
        ids.iter()
            .filter_map(|&id| self.get(id).and_then(Parameter::stored_value))
            .collect()
    }

    /// Names of the given parameters, in order
    pub fn names(&self, ids: &[ParamId]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.get(id).map(|p| p.name().to_string()).unwrap_or_default())
            .collect()
    }

    /// Whether `start` reads `target`, directly or through other constraints.
    fn depends_on(&self, start: ParamId, target: ParamId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![false; self.params.len()];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if current.0 >= seen.len() || seen[current.0] {
                continue;
            }
            seen[current.0] = true;
            if let Some(constraint) = self.params[current.0].constraint() {
                stack.extend(constraint.dependencies());
            }
        }
        false
    }

    fn checked(&self, id: ParamId) -> Result<&Parameter, ParameterError> {
        self.get(id)
            .ok_or(ParameterError::UnknownHandle { index: id.0 })
    }

    fn checked_mut(&mut self, id: ParamId) -> Result<&mut Parameter, ParameterError> {
        self.get_mut(id)
            .ok_or(ParameterError::UnknownHandle { index: id.0 })
    }
}

impl Index<ParamId> for ParameterSet {
    type Output = Parameter;

    fn index(&self, id: ParamId) -> &Parameter {
        &self.params[id.0]
    }
}

impl IndexMut<ParamId> for ParameterSet {
    fn index_mut(&mut self, id: ParamId) -> &mut Parameter {
        &mut self.params[id.0]
    }
}
