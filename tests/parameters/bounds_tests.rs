use approx::assert_relative_eq;
use layerfit_rs::parameters::{
    Bounds, Parameter, ParameterSet, PriorDistribution, SoftTruncNormal,
};

#[test]
fn test_interval_logp_outside_is_neg_infinity() {
    let mut params = ParameterSet::new();
    let thick = params.add_param_with_bounds("thick", 10.0, 0.0, 50.0).unwrap();

    assert_relative_eq!(params.logp(thick), -(50.0f64).ln());

    params.set_value(thick, 60.0).unwrap();
    assert_eq!(params.logp(thick), f64::NEG_INFINITY);

    params.set_value(thick, -1.0).unwrap();
    assert_eq!(params.logp(thick), f64::NEG_INFINITY);
}

#[test]
fn test_infinite_interval_is_flat() {
    let bounds = Bounds::interval(0.0, f64::INFINITY).unwrap();
    assert_eq!(bounds.logpdf(1.0e6), 0.0);
    assert_eq!(bounds.logpdf(-1.0), f64::NEG_INFINITY);
}

#[test]
fn test_invalid_interval() {
    assert!(Bounds::interval(2.0, 1.0).is_err());
    assert!(Bounds::normal(0.0, 0.0).is_err());
}

#[test]
fn test_soft_truncation_is_continuous() {
    let prior = SoftTruncNormal::new(100.0, 10.0, Some(80.0), Some(120.0)).unwrap();

    for edge in [80.0, 120.0] {
        let inside = if edge < 100.0 { edge + 1e-12 } else { edge - 1e-12 };
        let outside = if edge < 100.0 { edge - 1e-12 } else { edge + 1e-12 };
        assert_relative_eq!(prior.logpdf(inside), prior.logpdf(outside), epsilon = 1e-6);
    }

    // finite but strongly penalised beyond the boundary
    let far = prior.logpdf(140.0);
    assert!(far.is_finite());
    assert!(far < prior.logpdf(120.0));
    assert!(prior.logpdf(100.0) > prior.logpdf(90.0));
}

#[test]
fn test_invcdf_maps_quantiles_into_support() {
    let bounds = Bounds::interval(2.0, 6.0).unwrap();
    assert_relative_eq!(bounds.invcdf(0.0).unwrap(), 2.0);
    assert_relative_eq!(bounds.invcdf(0.25).unwrap(), 3.0);
    assert_relative_eq!(bounds.invcdf(1.0).unwrap(), 6.0);
    assert!(bounds.invcdf(1.5).is_err());

    let normal = Bounds::normal(5.0, 2.0).unwrap();
    assert_relative_eq!(normal.invcdf(0.5).unwrap(), 5.0, epsilon = 1e-9);

    assert!(Bounds::Unbounded.invcdf(0.5).is_err());
}

#[test]
fn test_parameter_with_prior() {
    let param = Parameter::with_bounds("sld", 2.07, Bounds::normal(2.07, 0.1).unwrap());
    assert!(param.vary());
    assert_relative_eq!(
        param.logp(2.07),
        -(0.1 * (2.0 * std::f64::consts::PI).sqrt()).ln(),
        epsilon = 1e-12
    );
}
