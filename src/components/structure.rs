//! Stacks of components and the model that evaluates them.

use crate::components::Component;
use crate::error::{LayerFitError, Result};
use crate::model::Model;
use crate::parameters::{ParameterGraph, ParameterSet};
use ndarray::{concatenate, Array2, ArrayView1, ArrayView2, Axis};
use std::sync::Arc;

/// An ordered stack of components, from the fronting medium to the backing.
#[derive(Clone, Default)]
pub struct Structure {
    name: String,
    components: Vec<Arc<dyn Component>>,
}

impl Structure {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            components: Vec::new(),
        }
    }

    pub fn push(&mut self, component: Arc<dyn Component>) {
        self.components.push(component);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, component: Arc<dyn Component>) -> Self {
        self.push(component);
        self
    }

    pub fn components(&self) -> &[Arc<dyn Component>] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> ParameterGraph {
        let mut graph = ParameterGraph::named(&format!("Structure - {}", self.name));
        for component in &self.components {
            graph.push_group(component.parameters());
        }
        graph
    }

    /// Slabs of every component, stacked in order.
    pub fn slabs(&self, params: &ParameterSet) -> Result<Array2<f64>> {
        let tables = self
            .components
            .iter()
            .map(|c| c.slabs(params))
            .collect::<Result<Vec<_>>>()?;
        if tables.is_empty() {
            return Ok(Array2::zeros((0, 5)));
        }
        let views: Vec<_> = tables.iter().map(|t| t.view()).collect();
        concatenate(Axis(0), &views).map_err(|e| {
            LayerFitError::DimensionMismatch(format!("component slabs do not stack: {}", e))
        })
    }

    /// Sum of the components' own log-probability terms.
    pub fn logp(&self, params: &ParameterSet) -> Result<f64> {
        self.components.iter().map(|c| c.logp(params)).sum()
    }
}

impl std::fmt::Debug for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.components.iter().map(|c| c.name()).collect();
        f.debug_struct("Structure")
            .field("name", &self.name)
            .field("components", &names)
            .finish()
    }
}

/// Turns a slab table into a prediction of the observed channels.
///
/// The physics of the layered calculation lives behind this trait.
pub trait LayerEvaluator: Send + Sync {
    /// Parameters of the calculation itself (wavelength, scale, ...).
    fn parameters(&self) -> ParameterGraph {
        ParameterGraph::new()
    }

    /// Prediction of shape `(n_channels, x.len())`.
    fn evaluate(
        &self,
        params: &ParameterSet,
        x: ArrayView1<f64>,
        x_err: Option<ArrayView1<f64>>,
        slabs: ArrayView2<f64>,
    ) -> Result<Array2<f64>>;
}

/// A [`Model`] made of a [`Structure`] and a [`LayerEvaluator`].
#[derive(Debug)]
pub struct LayeredModel<E> {
    structure: Structure,
    evaluator: E,
}

impl<E: LayerEvaluator> LayeredModel<E> {
    pub fn new(structure: Structure, evaluator: E) -> Self {
        Self {
            structure,
            evaluator,
        }
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }
}

impl<E: LayerEvaluator> Model for LayeredModel<E> {
    fn parameters(&self) -> ParameterGraph {
        let mut graph = ParameterGraph::named("layered model");
        graph.push_group(self.evaluator.parameters());
        graph.push_group(self.structure.parameters());
        graph
    }

    fn evaluate(
        &self,
        params: &ParameterSet,
        x: ArrayView1<f64>,
        x_err: Option<ArrayView1<f64>>,
    ) -> Result<Array2<f64>> {
        let slabs = self.structure.slabs(params)?;
        self.evaluator.evaluate(params, x, x_err, slabs.view())
    }

    fn logp(&self, params: &ParameterSet) -> Result<f64> {
        self.structure.logp(params)
    }
}
