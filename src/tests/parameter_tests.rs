use super::{assert_close, linear, random_point, random_quadratic, square};
use crate::{Function, FunctionError, Matrix, Point};
use quickcheck::Gen;

/// Centered differences of `f(x)` with respect to the flat parameter vector
fn numeric_parameter_gradient(f: &Function, x: &Point) -> Matrix {
    let base = f.parameter();
    let eps = 1e-5;
    let mut g = Matrix::zeros(base.dimension(), f.output_dimension());
    for k in 0..base.dimension() {
        let mut shifted = base.clone();
        shifted[k] += eps;
        f.set_parameter(&shifted).unwrap();
        let plus = f.evaluate(x).unwrap();
        shifted[k] -= 2.0 * eps;
        f.set_parameter(&shifted).unwrap();
        let minus = f.evaluate(x).unwrap();
        for j in 0..f.output_dimension() {
            g[(k, j)] = (plus[j] - minus[j]) / (2.0 * eps);
        }
    }
    f.set_parameter(&base).unwrap();
    g
}

#[test]
fn test_product_parameter_order() {
    let a = linear(&[vec![1.0]], &[10.0]);
    let b = linear(&[vec![1.0], vec![2.0]], &[20.0, 21.0]);
    let p = Function::product(&a, &b).unwrap();
    assert_eq!(p.parameter(), Point::from([20.0, 21.0, 10.0]));
    assert_eq!(p.parameter_description().len(), 3);

    p.set_parameter(&Point::from([1.0, 2.0, 3.0])).unwrap();
    assert_eq!(b.parameter(), Point::from([1.0, 2.0]));
    assert_eq!(a.parameter(), Point::from([3.0]));

    assert!(matches!(
        p.set_parameter(&Point::from([1.0, 2.0])),
        Err(FunctionError::DimensionMismatch { .. })
    ));
    // a rejected vector leaves the children alone
    assert_eq!(p.parameter(), Point::from([1.0, 2.0, 3.0]));
}

#[test]
fn test_linear_combination_parameter_order() {
    let a = linear(&[vec![1.0]], &[1.0]);
    let b = square();
    let c = linear(&[vec![1.0]], &[3.0]);
    let lc = Function::linear_combination(vec![a.clone(), b, c.clone()], Point::from([1.0, 1.0, 1.0]))
        .unwrap();
    assert_eq!(lc.parameter(), Point::from([1.0, 0.0, 3.0]));
    lc.set_parameter(&Point::from([4.0, 5.0, 6.0])).unwrap();
    assert_eq!(a.parameter(), Point::from([4.0]));
    assert_eq!(c.parameter(), Point::from([6.0]));
    assert!(lc.set_parameter(&Point::from([1.0])).is_err());
}

#[test]
fn test_composition_parameter_order() {
    let inner = linear(&[vec![1.0]], &[1.0]);
    let outer = linear(&[vec![1.0]], &[2.0]);
    let f = Function::compose(&outer, &inner).unwrap();
    assert_eq!(f.parameter(), Point::from([1.0, 2.0]));
    f.set_parameter(&Point::from([5.0, 7.0])).unwrap();
    assert_eq!(inner.parameter(), Point::from([5.0]));
    assert_eq!(outer.parameter(), Point::from([7.0]));
}

#[test]
fn test_parameter_round_trip_is_a_no_op() {
    let mut g = Gen::new(64);
    let inner = random_quadratic(&mut g, 2, 2);
    let functions = vec![
        Function::product(&random_quadratic(&mut g, 2, 1), &random_quadratic(&mut g, 2, 3)).unwrap(),
        Function::compose(&random_quadratic(&mut g, 2, 3), &inner).unwrap(),
    ];
    let f = Function::linear_combination(functions, Point::from([0.5, -2.0])).unwrap();
    let x = random_point(&mut g, 2);

    let before = f.evaluate(&x).unwrap();
    f.set_parameter(&f.parameter()).unwrap();
    assert_eq!(f.evaluate(&x).unwrap(), before);
    assert_eq!(f.parameter().dimension(), f.parameter_description().len());
}

#[test]
fn test_parameter_gradients_match_finite_differences() {
    let mut g = Gen::new(64);
    let x = random_point(&mut g, 2);
    let composites = vec![
        Function::product(&random_quadratic(&mut g, 2, 1), &random_quadratic(&mut g, 2, 2)).unwrap(),
        Function::compose(&random_quadratic(&mut g, 3, 2), &random_quadratic(&mut g, 2, 3)).unwrap(),
        Function::linear_combination(
            vec![random_quadratic(&mut g, 2, 2), random_quadratic(&mut g, 2, 2)],
            Point::from([2.0, -1.0]),
        )
        .unwrap(),
    ];
    for f in &composites {
        let analytic = f.parameter_gradient(&x).unwrap();
        let numeric = numeric_parameter_gradient(f, &x);
        assert_eq!(analytic.nb_rows(), f.parameter().dimension());
        assert!(
            analytic.max_abs_diff(&numeric) < 1e-6,
            "{}: {:?} vs {:?}",
            f,
            analytic,
            numeric
        );
    }
}

#[test]
fn test_marginal_parameters_are_shared() {
    let f = linear(&[vec![1.0], vec![2.0]], &[1.0, 2.0]);
    let m = f.marginal(1).unwrap();
    assert_eq!(m.parameter(), Point::from([1.0, 2.0]));
    m.set_parameter(&Point::from([0.0, 10.0])).unwrap();
    assert_close(&f.evaluate(&Point::from([1.0])).unwrap(), &Point::from([1.0, 12.0]), 1e-12);
    assert_eq!(m.evaluate(&Point::from([1.0])).unwrap(), Point::from([12.0]));
}
