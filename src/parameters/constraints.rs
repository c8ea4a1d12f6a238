//! Constraints for derived parameters
//!
//! A [`Constraint`] is an [`Expression`] whose variable names are bound to
//! parameter handles. It is attached to a parameter with
//! [`ParameterSet::constrain`](crate::parameters::ParameterSet::constrain), after
//! which the parameter's value is recomputed from its dependencies on every read.

use crate::parameters::expression::{EvaluationContext, Expression, ExpressionError};
use crate::parameters::parameter::ParameterError;
use crate::parameters::parameters::ParamId;

/// An expression over other parameters, referenced by handle.
#[derive(Debug, Clone)]
pub struct Constraint {
    source: String,
    expr: Expression,
    bindings: Vec<(String, ParamId)>,
}

impl Constraint {
    /// Parse `expr` and bind each of its variables to a parameter handle.
    ///
    /// `name` is only used for error messages. Every variable in the expression
    /// must appear in `bindings`; unused bindings are dropped.
    pub fn new(
        name: &str,
        expr: &str,
        bindings: &[(&str, ParamId)],
    ) -> Result<Self, ParameterError> {
        let parsed = Expression::parse(expr).map_err(|source| ParameterError::Evaluation {
            name: name.to_string(),
            source,
        })?;

        let mut bound = Vec::new();
        for variable in parsed.variables() {
            let id = bindings
                .iter()
                .find(|(var, _)| *var == variable)
                .map(|(_, id)| *id)
                .ok_or_else(|| ParameterError::UnboundVariable {
                    name: name.to_string(),
                    variable: variable.clone(),
                })?;
            bound.push((variable, id));
        }

        Ok(Self {
            source: expr.to_string(),
            expr: parsed,
            bindings: bound,
        })
    }

    /// The expression text as supplied.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Handles of the parameters this constraint reads.
    pub fn dependencies(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.bindings.iter().map(|(_, id)| *id)
    }

    /// Evaluate the expression, resolving each bound handle through `lookup`.
    pub fn evaluate<F>(&self, lookup: F) -> Result<f64, ExpressionError>
    where
        F: Fn(ParamId) -> Result<f64, ExpressionError>,
    {
        let resolver = Resolver {
            bindings: &self.bindings,
            lookup,
        };
        self.expr.evaluate(&resolver)
    }
}

struct Resolver<'a, F> {
    bindings: &'a [(String, ParamId)],
    lookup: F,
}

impl<F> EvaluationContext for Resolver<'_, F>
where
    F: Fn(ParamId) -> Result<f64, ExpressionError>,
{
    fn get_variable(&self, name: &str) -> Result<f64, ExpressionError> {
        let id = self
            .bindings
            .iter()
            .find(|(var, _)| var == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })?;
        (self.lookup)(id)
    }
}
