use approx::assert_relative_eq;
use layerfit_rs::components::spline::LAST_SLAB_ROUGHNESS;
use layerfit_rs::components::{Component, Sld, Slab, SplineProfile};
use layerfit_rs::parameters::ParameterSet;
use std::sync::Arc;

fn brush(params: &mut ParameterSet, extent: f64, dz: &[f64], vf: &[f64]) -> SplineProfile {
    let polymer = Sld::new(params, "polymer", 0.46, 0.0);
    let solvent = Sld::new(params, "d2o", 6.36, 0.0);
    SplineProfile::builder("brush", extent, dz, vf, polymer, solvent)
        .zgrad(false)
        .build(params)
        .unwrap()
}

#[test]
fn test_profile_through_knots() {
    let mut params = ParameterSet::new();
    let spline = brush(&mut params, 100.0, &[0.5, 0.5], &[0.3, 0.7]);

    assert_relative_eq!(spline.value_at(&params, 0.0).unwrap(), 0.3, epsilon = 1e-12);
    assert_relative_eq!(spline.value_at(&params, 100.0).unwrap(), 0.7, epsilon = 1e-12);

    let z = ndarray::Array1::linspace(0.0, 100.0, 201);
    let values = spline.values_at(&params, &z).unwrap();
    for pair in values.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-12);
    }
}

#[test]
fn test_interpolator_rebuilt_only_on_change() {
    let mut params = ParameterSet::new();
    let spline = brush(&mut params, 100.0, &[0.5, 0.5], &[0.3, 0.7]);

    let first = spline.interpolator(&params).unwrap();
    spline.slabs(&params).unwrap();
    let second = spline.interpolator(&params).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    params.set_value(spline.dz()[1], 0.3).unwrap();
    let third = spline.interpolator(&params).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn test_ten_microslabs() {
    let mut params = ParameterSet::new();
    let spline = brush(&mut params, 10.0, &[0.5, 0.5], &[0.3, 0.7]);

    let slabs = spline.slabs(&params).unwrap();
    assert_eq!(slabs.nrows(), 10);
    let total: f64 = slabs.column(0).sum();
    assert_relative_eq!(total, 10.0, epsilon = 1e-12);
    assert_eq!(slabs[[9, 3]], LAST_SLAB_ROUGHNESS);
    assert_eq!(slabs[[9, 3]], 0.5);

    // solvent fraction in the middle of the first slab
    let expected = 1.0 - spline.value_at(&params, 0.5).unwrap();
    assert_relative_eq!(slabs[[0, 4]], expected, epsilon = 1e-12);
}

#[test]
fn test_end_values_follow_neighbouring_slabs() {
    let mut params = ParameterSet::new();
    let polymer = Sld::new(&mut params, "polymer", 0.46, 0.0);
    let solvent = Sld::new(&mut params, "d2o", 6.36, 0.0);
    let sio2 = Sld::new(&mut params, "sio2", 3.47, 0.0);
    let anchor = Arc::new(Slab::new(&mut params, "anchor", 20.0, polymer, 3.0));
    params.set_value(anchor.vfsolv(), 0.1).unwrap();
    let cap = Arc::new(Slab::new(&mut params, "cap", 5.0, sio2, 3.0));
    params.set_value(cap.vfsolv(), 0.8).unwrap();

    let spline = SplineProfile::builder("brush", 100.0, &[0.5], &[0.5], polymer, solvent)
        .left_slabs(vec![Arc::clone(&anchor)])
        .right_slabs(vec![Arc::clone(&cap)])
        .build(&mut params)
        .unwrap();

    let interpolant = spline.interpolator(&params).unwrap();
    assert_relative_eq!(interpolant.evaluate(-f64::EPSILON), 0.9, epsilon = 1e-12);
    assert_relative_eq!(interpolant.evaluate(-1.1), 0.9, epsilon = 1e-12);
    assert_relative_eq!(interpolant.evaluate(2.1), 0.2, epsilon = 1e-12);

    // the shared slab is the same quantity everywhere
    params.set_value(anchor.vfsolv(), 0.4).unwrap();
    let interpolant = spline.interpolator(&params).unwrap();
    assert_relative_eq!(interpolant.evaluate(-1.1), 0.6, epsilon = 1e-12);

    let (z, _) = spline.knots(&params).unwrap();
    assert_relative_eq!(z[0], 20.0 + 50.0, epsilon = 1e-9);

    let (depth, vf) = spline.profile(&params, None).unwrap();
    assert_relative_eq!(depth[depth.len() - 1], 125.0);
    assert_relative_eq!(vf[0], 0.6);
    assert_relative_eq!(vf[vf.len() - 1], 0.2);
}

#[test]
fn test_area_prior() {
    let mut params = ParameterSet::new();
    let spline = brush(&mut params, 100.0, &[0.5, 0.5], &[0.3, 0.7]);
    assert_relative_eq!(spline.profile_area(&params).unwrap(), 40.0, epsilon = 1e-9);
    // default gamma carries no prior
    assert_eq!(spline.logp(&params).unwrap(), 0.0);

    let first = spline.moment(&params, 1).unwrap();
    assert!(first > 50.0 && first < 100.0);
}
