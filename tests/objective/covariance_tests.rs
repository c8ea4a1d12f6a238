use crate::test_helpers::{line_data, matrix_approx_eq, Line};
use approx::assert_relative_eq;
use layerfit_rs::dataset::Data1D;
use layerfit_rs::error::LayerFitError;
use layerfit_rs::model::BaseModel;
use layerfit_rs::objective::Objective;
use layerfit_rs::parameters::{ParameterGraph, ParameterSet};
use ndarray::{array, Axis};

#[test]
fn test_weighted_covariance_is_inverse_curvature() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = Data1D::new(array![0.0, 1.0, 2.0, 3.0], array![1.0, 3.0, 5.0, 7.0])
        .unwrap()
        .with_y_err(array![1.0, 1.0, 1.0, 1.0])
        .unwrap();
    let mut objective = Objective::new(&line.model, &data, params);

    // (J^T J)^-1 for J = [x, 1]
    let expected = array![[0.2, -0.3], [-0.3, 0.7]];
    let covar = objective.covar().unwrap();
    assert!(matrix_approx_eq(&covar, &expected, 1e-6));
}

#[test]
fn test_unweighted_covariance_scaled_by_reduced_chi2() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = Data1D::new(array![0.0, 1.0, 2.0, 3.0], array![1.0, 3.1, 4.9, 7.0]).unwrap();
    let mut objective = Objective::new(&line.model, &data, params);

    // chi2 = 0.02 over 2 degrees of freedom
    let expected = array![[0.2, -0.3], [-0.3, 0.7]] * 0.01;
    let covar = objective.covar().unwrap();
    assert!(matrix_approx_eq(&covar, &expected, 1e-8));
}

#[test]
fn test_covariance_restores_parameters() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 1.5, 0.5);
    let data = line_data(6);
    let mut objective = Objective::new(&line.model, &data, params);

    objective.covar().unwrap();
    assert_eq!(objective.varying_values().to_vec(), vec![1.5, 0.5]);
}

#[test]
fn test_covariance_with_zero_parameter_value() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 0.0);
    let data = line_data(6);
    let mut objective = Objective::new(&line.model, &data, params);

    let covar = objective.covar().unwrap();
    assert_eq!(covar.shape(), &[2, 2]);
    assert!(covar.iter().all(|v| v.is_finite()));
    assert!(covar[[0, 0]] > 0.0 && covar[[1, 1]] > 0.0);
    assert_eq!(objective.varying_values().to_vec(), vec![2.0, 0.0]);
}

#[test]
fn test_ineffective_parameter_is_named() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut params = ParameterSet::new();
    let slope = params.add_param("slope", 2.0);
    let unused = params.add_param("unused", 3.0);
    let model = BaseModel::new(
        ParameterGraph::from_params("line", &[slope, unused]),
        move |p, x, _| {
            let m = p.value(slope)?;
            Ok(x.mapv(|v| m * v).insert_axis(Axis(0)))
        },
    );
    let data = line_data(6);
    let mut objective = Objective::new(&model, &data, params);

    match objective.covar() {
        Err(LayerFitError::SingularParameters { names }) => assert_eq!(names, vec!["unused"]),
        other => panic!("expected singular parameters, got {:?}", other),
    }
}

#[test]
fn test_unweighted_needs_more_points_than_parameters() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = Data1D::new(array![0.0, 1.0], array![1.0, 3.0]).unwrap();
    let mut objective = Objective::new(&line.model, &data, params);

    assert!(matches!(objective.covar(), Err(LayerFitError::InvalidInput(_))));
}

#[test]
fn test_update_stderr() {
    let mut params = ParameterSet::new();
    let line = Line::new(&mut params, 2.0, 1.0);
    let data = Data1D::new(array![0.0, 1.0, 2.0, 3.0], array![1.0, 3.0, 5.0, 7.0])
        .unwrap()
        .with_y_err(array![1.0, 1.0, 1.0, 1.0])
        .unwrap();
    let mut objective = Objective::new(&line.model, &data, params);

    objective.update_stderr().unwrap();
    let slope_err = objective.params()[line.slope].stderr().unwrap();
    let offset_err = objective.params()[line.offset].stderr().unwrap();
    assert_relative_eq!(slope_err, 0.2f64.sqrt(), epsilon = 1e-6);
    assert_relative_eq!(offset_err, 0.7f64.sqrt(), epsilon = 1e-6);
}
