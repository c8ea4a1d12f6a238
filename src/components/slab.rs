//! Uniform layers.

use crate::components::Component;
use crate::error::Result;
use crate::parameters::{ParamId, Parameter, ParameterGraph, ParameterSet};
use ndarray::{array, Array2};

/// A complex scattering length density, `real + i imag`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sld {
    real: ParamId,
    imag: ParamId,
}

impl Sld {
    /// Create fixed real and imaginary parameters called `"{name} - sld"` and
    /// `"{name} - isld"`.
    pub fn new(params: &mut ParameterSet, name: &str, real: f64, imag: f64) -> Self {
        Self {
            real: params.add(Parameter::fixed(&format!("{} - sld", name), real)),
            imag: params.add(Parameter::fixed(&format!("{} - isld", name), imag)),
        }
    }

    /// Use existing parameters.
    pub fn from_params(real: ParamId, imag: ParamId) -> Self {
        Self { real, imag }
    }

    pub fn real(&self) -> ParamId {
        self.real
    }

    pub fn imag(&self) -> ParamId {
        self.imag
    }

    pub fn parameters(&self) -> ParameterGraph {
        ParameterGraph::from_params("sld", &[self.real, self.imag])
    }
}

/// A layer of uniform composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Slab {
    name: String,
    thick: ParamId,
    sld: Sld,
    rough: ParamId,
    vfsolv: ParamId,
}

impl Slab {
    /// Create a slab with fixed thickness and roughness and no solvent.
    pub fn new(params: &mut ParameterSet, name: &str, thick: f64, sld: Sld, rough: f64) -> Self {
        Self {
            name: name.to_string(),
            thick: params.add(Parameter::fixed(&format!("{} - thick", name), thick)),
            sld,
            rough: params.add(Parameter::fixed(&format!("{} - rough", name), rough)),
            vfsolv: params.add(Parameter::fixed(&format!("{} - volfrac solvent", name), 0.0)),
        }
    }

    pub fn thick(&self) -> ParamId {
        self.thick
    }

    pub fn sld(&self) -> Sld {
        self.sld
    }

    pub fn rough(&self) -> ParamId {
        self.rough
    }

    /// Volume fraction of solvent in the layer.
    pub fn vfsolv(&self) -> ParamId {
        self.vfsolv
    }
}

impl Component for Slab {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> ParameterGraph {
        let mut graph = ParameterGraph::named(&self.name);
        graph.push_param(self.thick);
        graph.push_group(self.sld.parameters());
        graph.push_param(self.rough);
        graph.push_param(self.vfsolv);
        graph
    }

    fn slabs(&self, params: &ParameterSet) -> Result<Array2<f64>> {
        Ok(array![[
            params.value(self.thick)?,
            params.value(self.sld.real)?,
            params.value(self.sld.imag)?,
            params.value(self.rough)?,
            params.value(self.vfsolv)?,
        ]])
    }
}
