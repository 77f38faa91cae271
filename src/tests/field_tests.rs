use super::linear;
use crate::{
    FieldToPointRef, Function, FunctionError, FunctionKind, Mesh, ModalLifting, ModalProjection,
    Point, PointToFieldConnection, PointToFieldFunction, PointToFieldRef, Sample,
};
use std::sync::Arc;

fn mesh() -> Mesh {
    Mesh::regular(0.0, 2.0, 3)
}

fn lifting() -> Arc<ModalLifting> {
    let modes = vec![
        Sample::from_rows(1, vec![1.0, 1.0, 1.0]),
        Sample::from_rows(1, vec![0.0, 1.0, 2.0]),
    ];
    Arc::new(ModalLifting::new(mesh(), modes).unwrap())
}

#[test]
fn test_point_then_field_flattens_vertices() {
    // ξ(x) = (x0, 2 x0), field(v) = ξ0 + ξ1 * v
    let xi = linear(&[vec![1.0], vec![2.0]], &[0.0, 0.0]);
    let lift = lifting();
    let connection = Arc::new(PointToFieldConnection::new(lift.clone(), xi.clone()).unwrap());

    let field = connection.evaluate_field(&Point::from([1.0])).unwrap();
    assert_eq!(field.size(), 3);
    assert_eq!(field.as_slice(), &[1.0, 3.0, 5.0]);

    let f = connection.clone().into_function();
    assert!(matches!(f.kind(), FunctionKind::PointToFieldConnection));
    assert_eq!(f.output_dimension(), 3);
    assert_eq!(f.output_description()[2], "v0_2");
    assert_eq!(f.evaluate(&Point::from([1.0])).unwrap(), Point::from([1.0, 3.0, 5.0]));

    // the connection is linear, so finite differences are exact up to rounding
    let g = f.gradient(&Point::from([0.3])).unwrap();
    for (j, expected) in [1.0, 3.0, 5.0].iter().enumerate() {
        assert!((g[(0, j)] - expected).abs() < 1e-8);
    }
}

#[test]
fn test_point_then_field_counts_and_parameters() {
    let xi = linear(&[vec![1.0], vec![2.0]], &[0.5, 0.0]);
    let lift = lifting();
    let f = Arc::new(PointToFieldConnection::new(lift.clone(), xi.clone()).unwrap()).into_function();

    f.evaluate_sample(&Sample::from_rows(1, vec![0.0, 1.0, 2.0, 3.0])).unwrap();
    assert_eq!(f.calls_number(), 4);
    assert_eq!(lift.calls_number(), 4);
    assert_eq!(xi.calls_number(), 4);

    assert_eq!(f.parameter(), Point::from([0.5, 0.0]));
    f.set_parameter(&Point::from([0.0, 1.0])).unwrap();
    assert_eq!(xi.parameter(), Point::from([0.0, 1.0]));
    assert!(matches!(
        f.parameter_gradient(&Point::from([1.0])),
        Err(FunctionError::NotDifferentiable(_))
    ));
}

#[test]
fn test_point_then_field_boundary() {
    let xi = linear(&[vec![1.0]], &[0.0]);
    assert!(matches!(
        PointToFieldConnection::new(lifting(), xi),
        Err(FunctionError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_field_then_point_round_trip() {
    // orthonormal modes with unit weights: projection undoes lifting
    let modes = vec![
        Sample::from_rows(1, vec![1.0, 0.0, 0.0]),
        Sample::from_rows(1, vec![0.0, 0.6, 0.8]),
    ];
    let lift: PointToFieldRef = Arc::new(ModalLifting::new(mesh(), modes.clone()).unwrap());
    let project: FieldToPointRef = Arc::new(ModalProjection::with_unit_weights(mesh(), modes).unwrap());
    let f = Arc::new(PointToFieldConnection::through_field(project, lift).unwrap()).into_function();

    assert_eq!(f.input_dimension(), 2);
    assert_eq!(f.output_dimension(), 2);
    assert_eq!(f.parameter().dimension(), 0);
    let y = f.evaluate(&Point::from([2.0, -1.0])).unwrap();
    assert!((y[0] - 2.0).abs() < 1e-12 && (y[1] + 1.0).abs() < 1e-12);
    assert!(f.hessian(&Point::from([2.0, -1.0])).unwrap().max_abs_diff(&crate::SymmetricTensor::zeros(2, 2)) < 1e-4);
}

#[test]
fn test_connection_composes_like_any_function() {
    let xi = linear(&[vec![1.0], vec![2.0]], &[0.0, 0.0]);
    let field = Arc::new(PointToFieldConnection::new(lifting(), xi).unwrap()).into_function();
    let last = field.marginal(2).unwrap();
    assert!(matches!(last.kind(), FunctionKind::Marginal(_)));
    let sum = Function::linear_combination(vec![last.clone(), last], Point::from([1.0, 1.0])).unwrap();
    assert_eq!(sum.evaluate(&Point::from([1.0])).unwrap(), Point::from([10.0]));
}

#[test]
fn test_lifting_dimensions() {
    let lift = lifting();
    assert_eq!(lift.input_dimension(), 2);
    assert_eq!(lift.output_dimension(), 1);
    assert_eq!(lift.output_mesh().vertices_number(), 3);
    assert!(lift.evaluate(&Point::from([1.0])).is_err());
}
