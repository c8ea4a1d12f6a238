use crate::test_helpers::{line_data, Line};
use approx::assert_relative_eq;
use layerfit_rs::dataset::{Data1D, EllipsometryData};
use layerfit_rs::error::LayerFitError;
use layerfit_rs::model::BaseModel;
use layerfit_rs::objective::{ChannelCombination, Objective};
use layerfit_rs::parameters::{Bounds, Parameter, ParameterGraph, ParameterSet};
use ndarray::{array, Array2};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_setp_round_trip_varying() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = line_data(5);
    let mut objective = Objective::new(&line.model, &data, params);

    objective.setp(&[3.0, -1.0]).unwrap();
    assert_eq!(objective.varying_values().to_vec(), vec![3.0, -1.0]);
    assert_eq!(objective.params().value(line.slope).unwrap(), 3.0);
    assert_eq!(objective.params().value(line.offset).unwrap(), -1.0);
}

#[test]
fn test_setp_round_trip_all_parameters() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let scale = params.add_fixed("scale", 1.0);
    let doubled = params.add_fixed("doubled", 0.0);
    params
        .constrain(doubled, "2 * slope", &[("slope", line.slope)])
        .unwrap();

    let (slope, offset) = (line.slope, line.offset);
    let graph = ParameterGraph::from_params("line", &[slope, offset, scale, doubled]);
    let model = BaseModel::new(graph, move |p, x, _| {
        let (k, m, c) = (p.value(scale)?, p.value(slope)?, p.value(offset)?);
        Ok(x.mapv(|v| k * (m * v + c)).insert_axis(ndarray::Axis(0)))
    });
    let data = line_data(5);
    let mut objective = Objective::new(&model, &data, params);

    // one value per leaf; the constrained leaf is skipped
    objective.setp(&[4.0, 0.5, 2.0, 99.0]).unwrap();
    assert_eq!(objective.params().value(slope).unwrap(), 4.0);
    assert_eq!(objective.params().value(offset).unwrap(), 0.5);
    assert_eq!(objective.params().value(scale).unwrap(), 2.0);
    assert_eq!(objective.params().value(doubled).unwrap(), 8.0);
    assert_eq!(objective.varying_values().to_vec(), vec![4.0, 0.5]);
}

#[test]
fn test_setp_wrong_length_is_rejected() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = line_data(5);
    let mut objective = Objective::new(&line.model, &data, params);

    let err = objective.setp(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, LayerFitError::DimensionMismatch(_)));
    assert!(objective.chisqr(Some(&[1.0][..])).is_err());
    assert_eq!(objective.varying_values().to_vec(), vec![2.0, 1.0]);
}

#[test]
fn test_shared_parameter_is_one_entry() {
    let mut params = ParameterSet::new();
    let rough = params.add_param("rough", 3.0);
    let thick = params.add_param("thick", 10.0);
    let mut graph = ParameterGraph::named("film");
    graph.extend([rough, thick, rough]);

    let model = BaseModel::new(graph, move |p, x, _| {
        let shift = p.value(rough)? + p.value(thick)?;
        Ok(x.mapv(|v| v + shift).insert_axis(ndarray::Axis(0)))
    });
    let data = line_data(3);
    let mut objective = Objective::new(&model, &data, params);

    assert_eq!(objective.varying_parameters(), vec![rough, thick]);
    // full-length vector: the later leaf wins for the repeated handle
    objective.setp(&[1.0, 20.0, 4.0]).unwrap();
    assert_eq!(objective.params().value(rough).unwrap(), 4.0);
    assert_eq!(objective.params().value(thick).unwrap(), 20.0);
}

#[test]
fn test_logp_is_neg_infinity_outside_bounds() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    params.set_bounds(line.slope, Bounds::interval(0.0, 5.0).unwrap()).unwrap();
    let data = line_data(5);
    let mut objective = Objective::new(&line.model, &data, params);

    assert_relative_eq!(objective.logp(None).unwrap(), -(5.0f64).ln());
    assert_eq!(objective.logp(Some(&[6.0, 1.0][..])).unwrap(), f64::NEG_INFINITY);
}

#[test]
fn test_logpost_skips_likelihood_for_impossible_prior() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    params.set_bounds(line.slope, Bounds::interval(0.0, 5.0).unwrap()).unwrap();
    let data = line_data(5);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut objective = Objective::new(&line.model, &data, params).with_logp_extra(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(0.0)
    });

    let logpost = objective.logpost(Some(&[2.0, 1.0][..])).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let expected = -(5.0f64).ln() - 0.5 * 5.0 * (2.0 * std::f64::consts::PI).ln();
    assert_relative_eq!(logpost, expected, epsilon = 1e-12);

    let logpost = objective.logpost(Some(&[7.0, 1.0][..])).unwrap();
    assert_eq!(logpost, f64::NEG_INFINITY);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_logl_and_nll() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = Data1D::new(array![0.0, 1.0], array![2.0, 3.0])
        .unwrap()
        .with_y_err(array![1.0, 2.0])
        .unwrap();
    let mut objective = Objective::new(&line.model, &data, params);

    // residuals 1 and 0
    let ln2pi = (2.0 * std::f64::consts::PI).ln();
    let expected = -0.5 * (1.0 + ln2pi + (ln2pi + 4.0f64.ln()));
    assert_relative_eq!(objective.logl(None).unwrap(), expected, epsilon = 1e-12);
    assert_relative_eq!(objective.nll(None).unwrap(), -expected, epsilon = 1e-12);
    assert_relative_eq!(objective.chisqr(None).unwrap(), 1.0);
}

#[test]
fn test_lnsigma_inflates_variance() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 1.0, 0.0);
    let data = Data1D::new(array![1.0], array![2.0])
        .unwrap()
        .with_y_err(array![1.0])
        .unwrap();
    let mut objective =
        Objective::new(&line.model, &data, params).with_lnsigma(Parameter::new("lnsigma", 0.0));

    assert_eq!(objective.varying_parameters()[0], objective.lnsigma().unwrap());
    // variance 1 + exp(0) * 1^2 = 2
    let expected = -0.5 * (1.0 / 2.0 + (2.0 * std::f64::consts::PI * 2.0).ln());
    assert_relative_eq!(objective.logl(None).unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn test_unweighted_logl_not_implemented() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = line_data(4);
    let mut objective = Objective::new(&line.model, &data, params).with_use_weights(false);

    assert!(!objective.weighted());
    assert!(matches!(objective.logl(None), Err(LayerFitError::NotImplemented(_))));
    assert!(objective.logpost(None).is_err());
    // chi2 still available
    assert_eq!(objective.chisqr(None).unwrap(), 0.0);
}

#[test]
fn test_ellipsometry_channels() {
    let mut params = ParameterSet::new();
    let thick = params.add_param("thick", 10.0);
    let model = BaseModel::new(ParameterGraph::from_params("film", &[thick]), move |p, x, _| {
        let mut out = Array2::zeros((2, x.len()));
        out.row_mut(0).assign(&x.mapv(|aoi| aoi / 10.0));
        out.row_mut(1).fill(p.value(thick)?);
        Ok(out)
    });
    let data = EllipsometryData::new(
        array![658.0, 658.0],
        array![60.0, 70.0],
        array![7.0, 7.0],
        array![12.0, 12.0],
    )
    .unwrap();

    let mut summed = Objective::new(&model, &data, params.clone());
    // psi residuals [1, 0], delta residuals [2, 2]
    assert_eq!(summed.residuals(None).unwrap().to_vec(), vec![3.0, 2.0]);
    assert_eq!(summed.npoints(), 2);

    let mut stacked =
        Objective::new(&model, &data, params).with_channel_combination(ChannelCombination::Stack);
    assert_eq!(stacked.residuals(None).unwrap().to_vec(), vec![1.0, 0.0, 2.0, 2.0]);
    assert_eq!(stacked.npoints(), 4);
}

#[test]
fn test_prior_transform() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    params.set_bounds(line.slope, Bounds::interval(0.0, 4.0).unwrap()).unwrap();
    params.set_bounds(line.offset, Bounds::normal(1.0, 0.5).unwrap()).unwrap();
    let data = line_data(5);
    let objective = Objective::new(&line.model, &data, params);

    let x = objective.prior_transform(&[0.25, 0.5]).unwrap();
    assert_relative_eq!(x[0], 1.0);
    assert_relative_eq!(x[1], 1.0, epsilon = 1e-9);
    assert!(objective.prior_transform(&[0.5]).is_err());
}

#[test]
fn test_display_lists_parameters() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = line_data(5).with_name("calibration");
    let objective = Objective::new(&line.model, &data, params).with_name("line fit");

    let text = objective.to_string();
    assert!(text.contains("Objective - line fit"));
    assert!(text.contains("calibration"));
    assert!(text.contains("'slope'"));
    assert!(text.contains("'offset'"));
}
