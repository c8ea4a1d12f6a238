//! Nested parameter groups
//!
//! A [`ParameterGraph`] is an ordered tree whose leaves are [`ParamId`]
//! handles. The same handle may appear at several leaves (a roughness shared
//! between two interfaces, say); flattening keeps every occurrence while the
//! varying view keeps only the first.

use crate::error::{LayerFitError, Result};
use crate::parameters::parameters::{ParamId, ParameterSet};
use ndarray::Array1;
use std::collections::HashSet;

/// One entry of a [`ParameterGraph`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamNode {
    Param(ParamId),
    Group(ParameterGraph),
}

impl From<ParamId> for ParamNode {
    fn from(id: ParamId) -> Self {
        ParamNode::Param(id)
    }
}

impl From<ParameterGraph> for ParamNode {
    fn from(graph: ParameterGraph) -> Self {
        ParamNode::Group(graph)
    }
}

/// An ordered, optionally named tree of parameter handles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGraph {
    name: Option<String>,
    nodes: Vec<ParamNode>,
}

impl ParameterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            nodes: Vec::new(),
        }
    }

    /// Build a group from a list of handles
    pub fn from_params(name: &str, ids: &[ParamId]) -> Self {
        let mut graph = Self::named(name);
        graph.extend(ids.iter().copied());
        graph
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nodes(&self) -> &[ParamNode] {
        &self.nodes
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: impl Into<ParamNode>) {
        self.nodes.push(node.into());
    }

    pub fn push_param(&mut self, id: ParamId) {
        self.nodes.push(ParamNode::Param(id));
    }

    pub fn push_group(&mut self, group: ParameterGraph) {
        self.nodes.push(ParamNode::Group(group));
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = ParamId>) {
        self.nodes.extend(ids.into_iter().map(ParamNode::Param));
    }

    /// A new unnamed graph holding `self` and `other` as its two children.
    pub fn join(self, other: ParameterGraph) -> ParameterGraph {
        ParameterGraph {
            name: None,
            nodes: vec![ParamNode::Group(self), ParamNode::Group(other)],
        }
    }

    /// Every leaf handle in depth-first order, duplicates included.
    pub fn flatten(&self) -> Vec<ParamId> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<ParamId>) {
        for node in &self.nodes {
            match node {
                ParamNode::Param(id) => out.push(*id),
                ParamNode::Group(group) => group.collect(out),
            }
        }
    }

    /// Varying leaves, each handle once, at the position of its first occurrence.
    pub fn unique_varying(&self, params: &ParameterSet) -> Vec<ParamId> {
        let mut seen = HashSet::new();
        self.flatten()
            .into_iter()
            .filter(|&id| params.get(id).is_some_and(|p| p.vary()))
            .filter(|&id| seen.insert(id))
            .collect()
    }

    /// Assign a vector of values to the parameters of this graph.
    ///
    /// Two lengths are accepted:
    ///
    /// * `unique_varying().len()`: values go, in order, to the varying parameters.
    /// * `flatten().len()`: values go to every leaf in order; constrained leaves
    ///   are skipped. When a handle appears twice, the later leaf wins.
    ///
    /// When both lengths coincide the first reading is used. Any other length is
    /// rejected before a single value is written.
    pub fn set_values(&self, params: &mut ParameterSet, values: &[f64]) -> Result<()> {
        let varying = self.unique_varying(params);
        if values.len() == varying.len() {
            for (&id, &value) in varying.iter().zip(values) {
                params.set_value(id, value)?;
            }
            return Ok(());
        }

        let leaves = self.flatten();
        if values.len() == leaves.len() {
            for (&id, &value) in leaves.iter().zip(values) {
                if params.get(id).is_some_and(|p| !p.is_constrained()) {
                    params.set_value(id, value)?;
                }
            }
            return Ok(());
        }

        Err(LayerFitError::DimensionMismatch(format!(
            "got {} values, expected {} (varying parameters) or {} (all parameters)",
            values.len(),
            varying.len(),
            leaves.len()
        )))
    }

    /// Current values of the varying parameters.
    ///
    /// Varying parameters are never constrained, so this cannot fail.
    pub fn varying_values(&self, params: &ParameterSet) -> Array1<f64> {
        params.varying_values(&self.unique_varying(params))
    }

    /// Current values of every leaf
    pub fn values(&self, params: &ParameterSet) -> Result<Array1<f64>> {
        Ok(params.values(&self.flatten())?)
    }

    /// Names of every leaf
    pub fn names(&self, params: &ParameterSet) -> Vec<String> {
        params.names(&self.flatten())
    }

    /// Sum of the log-priors of the varying parameters.
    pub fn logp(&self, params: &ParameterSet) -> f64 {
        self.unique_varying(params)
            .into_iter()
            .map(|id| params.logp(id))
            .sum()
    }
}
