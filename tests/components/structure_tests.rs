use approx::assert_relative_eq;
use layerfit_rs::components::{Component, LayerEvaluator, LayeredModel, Sld, Slab, SplineProfile, Structure};
use layerfit_rs::dataset::Data1D;
use layerfit_rs::error::{LayerFitError, Result};
use layerfit_rs::model::Model;
use layerfit_rs::objective::Objective;
use layerfit_rs::parameters::{Bounds, ParamId, ParameterError, ParameterGraph, ParameterSet};
use ndarray::{array, Array2, ArrayView1, ArrayView2};
use std::sync::Arc;

/// Polymer thickness scaled by a gain, the same at every x.
struct DryThickness {
    gain: ParamId,
}

impl LayerEvaluator for DryThickness {
    fn parameters(&self) -> ParameterGraph {
        ParameterGraph::from_params("evaluator", &[self.gain])
    }

    fn evaluate(
        &self,
        params: &ParameterSet,
        x: ArrayView1<f64>,
        _x_err: Option<ArrayView1<f64>>,
        slabs: ArrayView2<f64>,
    ) -> Result<Array2<f64>> {
        let dry: f64 = slabs.rows().into_iter().map(|r| r[0] * (1.0 - r[4])).sum();
        Ok(Array2::from_elem((1, x.len()), params.value(self.gain)? * dry))
    }
}

#[test]
fn test_layered_model_with_spline() {
    let mut params = ParameterSet::new();
    let air = Sld::new(&mut params, "air", 0.0, 0.0);
    let polymer = Sld::new(&mut params, "polymer", 0.46, 0.0);
    let solvent = Sld::new(&mut params, "d2o", 6.36, 0.0);
    let si = Sld::new(&mut params, "si", 2.07, 0.0);
    let gain = params.add_fixed("gain", 1.0);

    let spline = SplineProfile::builder("brush", 100.0, &[0.5, 0.5], &[0.3, 0.7], polymer, solvent)
        .zgrad(false)
        .build(&mut params)
        .unwrap();
    let spline = Arc::new(spline);

    let structure = Structure::new("sample")
        .with(Arc::new(Slab::new(&mut params, "air", 0.0, air, 0.0)))
        .with(spline.clone())
        .with(Arc::new(Slab::new(&mut params, "si", 0.0, si, 3.0)));
    assert_eq!(structure.slabs(&params).unwrap().nrows(), 102);

    let model = LayeredModel::new(structure, DryThickness { gain });
    let y = model.evaluate(&params, array![1.0, 2.0].view(), None).unwrap();
    // midpoint sums of the profile approximate its area
    assert_relative_eq!(y[[0, 0]], 40.0, epsilon = 0.05);

    let graph = model.parameters();
    assert!(graph.flatten().contains(&gain));
    assert_eq!(graph.unique_varying(&params).len(), 4);
}

#[test]
fn test_component_logp_reaches_objective() {
    let mut params = ParameterSet::new();
    let polymer = Sld::new(&mut params, "polymer", 0.46, 0.0);
    let solvent = Sld::new(&mut params, "d2o", 6.36, 0.0);
    let gain = params.add_fixed("gain", 1.0);

    let gamma = layerfit_rs::parameters::Parameter::with_bounds(
        "adsorbed amount",
        40.0,
        Bounds::interval(0.0, 30.0).unwrap(),
    );
    let spline = SplineProfile::builder("brush", 100.0, &[0.5, 0.5], &[0.3, 0.7], polymer, solvent)
        .zgrad(false)
        .gamma(gamma)
        .build(&mut params)
        .unwrap();
    let spline = Arc::new(spline);
    params.set_vary(spline.gamma(), false).unwrap();

    // area 40 lies outside the allowed adsorbed amount
    assert_eq!(spline.logp(&params).unwrap(), f64::NEG_INFINITY);

    let model = LayeredModel::new(Structure::new("s").with(spline), DryThickness { gain });
    assert_eq!(model.logp(&params).unwrap(), f64::NEG_INFINITY);

    let data = Data1D::new(array![1.0], array![40.0])
        .unwrap()
        .with_y_err(array![1.0])
        .unwrap();
    let mut objective = Objective::new(&model, &data, params);
    assert_eq!(objective.logl(None).unwrap(), f64::NEG_INFINITY);
}

#[test]
fn test_failed_constraint_surfaces_through_objective() {
    let mut params = ParameterSet::new();
    let a = params.add_param("a", 0.0);
    let film = Sld::new(&mut params, "film", 2.0, 0.0);
    let gain = params.add_fixed("gain", 1.0);
    let slab = Slab::new(&mut params, "film", 10.0, film, 3.0);
    params.constrain(slab.thick(), "1 / a", &[("a", a)]).unwrap();

    let model = LayeredModel::new(Structure::new("s").with(Arc::new(slab)), DryThickness { gain });
    let data = Data1D::new(array![1.0, 2.0], array![10.0, 10.0])
        .unwrap()
        .with_y_err(array![1.0, 1.0])
        .unwrap();
    let mut objective = Objective::new(&model, &data, params);

    assert!(matches!(
        objective.residuals(None),
        Err(LayerFitError::Parameter(ParameterError::Evaluation { .. }))
    ));
    assert!(objective.chisqr(None).is_err());
    assert!(objective.logpost(None).is_err());

    // a valid value for `a` makes the same objective usable again
    objective.params_mut().set_value(a, 0.1).unwrap();
    assert_relative_eq!(objective.chisqr(None).unwrap(), 0.0, epsilon = 1e-12);
}
