use layerfit_rs::error::LayerFitError;
use layerfit_rs::parameters::{ParamNode, ParameterGraph, ParameterSet};

#[test]
fn test_unique_varying_keeps_first_position() {
    let mut params = ParameterSet::new();
    let a = params.add_param("a", 1.0);
    let b = params.add_param("b", 2.0);
    let c = params.add_fixed("c", 3.0);

    let mut inner = ParameterGraph::named("inner");
    inner.extend([b, a]);

    let mut graph = ParameterGraph::named("outer");
    graph.push_param(a);
    graph.push_param(c);
    graph.push_group(inner);
    graph.push_param(b);

    assert_eq!(graph.flatten(), vec![a, c, b, a, b]);
    assert_eq!(graph.unique_varying(&params), vec![a, b]);
    assert_eq!(graph.varying_values(&params).to_vec(), vec![1.0, 2.0]);
    assert!(matches!(graph.nodes()[2], ParamNode::Group(_)));
}

#[test]
fn test_set_values_varying_contract() {
    let mut params = ParameterSet::new();
    let a = params.add_param("a", 1.0);
    let b = params.add_fixed("b", 2.0);
    let c = params.add_param("c", 3.0);

    let mut graph = ParameterGraph::new();
    graph.extend([a, b, c, a]);

    graph.set_values(&mut params, &[10.0, 30.0]).unwrap();
    assert_eq!(params.value(a).unwrap(), 10.0);
    assert_eq!(params.value(b).unwrap(), 2.0);
    assert_eq!(params.value(c).unwrap(), 30.0);
    assert_eq!(graph.varying_values(&params).to_vec(), vec![10.0, 30.0]);
}

#[test]
fn test_set_values_full_contract_skips_constrained() {
    let mut params = ParameterSet::new();
    let a = params.add_param("a", 1.0);
    let b = params.add_param("b", 2.0);
    let c = params.add_fixed("c", 0.0);
    params.constrain(c, "2 * a", &[("a", a)]).unwrap();

    let mut graph = ParameterGraph::new();
    graph.extend([a, b, c]);

    graph.set_values(&mut params, &[5.0, 6.0, 100.0]).unwrap();
    assert_eq!(params.value(a).unwrap(), 5.0);
    assert_eq!(params.value(b).unwrap(), 6.0);
    assert_eq!(params.value(c).unwrap(), 10.0);
    assert_eq!(graph.values(&params).unwrap().to_vec(), vec![5.0, 6.0, 10.0]);
}

#[test]
fn test_set_values_wrong_length_changes_nothing() {
    let mut params = ParameterSet::new();
    let a = params.add_param("a", 1.0);
    let b = params.add_fixed("b", 2.0);
    let c = params.add_param("c", 3.0);

    let mut graph = ParameterGraph::new();
    graph.extend([a, b, c]);

    let err = graph.set_values(&mut params, &[9.0, 9.0, 9.0, 9.0]).unwrap_err();
    match err {
        LayerFitError::DimensionMismatch(msg) => {
            assert!(msg.contains('2'));
            assert!(msg.contains('3'));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(graph.values(&params).unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_logp_counts_shared_parameter_once() {
    let mut params = ParameterSet::new();
    let a = params.add_param_with_bounds("a", 1.0, 0.0, 2.0).unwrap();
    let b = params.add_param_with_bounds("b", 1.0, 0.0, 4.0).unwrap();

    let mut graph = ParameterGraph::new();
    graph.extend([a, b, a, a]);

    let expected = -(2.0f64).ln() - (4.0f64).ln();
    assert!((graph.logp(&params) - expected).abs() < 1e-12);

    params.set_value(a, 3.0).unwrap();
    assert_eq!(graph.logp(&params), f64::NEG_INFINITY);
}

#[test]
fn test_names_follow_leaves() {
    let mut params = ParameterSet::new();
    let a = params.add_param("thick", 1.0);
    let b = params.add_param("rough", 2.0);

    let graph = ParameterGraph::from_params("layer", &[a, b]).join(ParameterGraph::from_params("again", &[a]));
    assert_eq!(graph.names(&params), vec!["thick", "rough", "thick"]);
    assert_eq!(graph.unique_varying(&params).len(), 2);
}
