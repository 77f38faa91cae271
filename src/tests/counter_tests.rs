use super::{identity, linear, square};
use crate::{Function, Point, Sample};

fn sample(n: usize) -> Sample {
    Sample::from_rows(1, (0..n).map(|i| i as f64).collect())
}

#[test]
fn test_product_counts_once_per_point() {
    let (a, b) = (identity(), square());
    let p = Function::product(&a, &b).unwrap();
    p.evaluate(&Point::from([1.0])).unwrap();
    p.evaluate(&Point::from([2.0])).unwrap();
    assert_eq!(p.calls_number(), 2);
    assert_eq!(a.calls_number(), 2);
    assert_eq!(b.calls_number(), 2);
}

#[test]
fn test_linear_combination_sample_counts() {
    let (a, b) = (identity(), square());
    let lc = Function::linear_combination(vec![a.clone(), b.clone()], Point::from([1.0, 2.0])).unwrap();
    lc.evaluate_sample(&sample(5)).unwrap();
    assert_eq!(lc.calls_number(), 5);
    assert_eq!(a.calls_number(), 5);
    assert_eq!(b.calls_number(), 5);
}

#[test]
fn test_zero_combination_leaves_children_untouched() {
    let (a, b) = (identity(), square());
    let lc = Function::linear_combination(vec![a.clone(), b.clone()], Point::from([0.0, 0.0])).unwrap();
    let ys = lc.evaluate_sample(&sample(7)).unwrap();
    assert_eq!(ys.size(), 7);
    assert!(ys.as_slice().iter().all(|v| *v == 0.0));
    assert_eq!(lc.evaluate(&Point::from([3.0])).unwrap(), Point::from([0.0]));
    assert_eq!(lc.calls_number(), 8);
    assert_eq!(a.calls_number(), 0);
    assert_eq!(b.calls_number(), 0);
}

#[test]
fn test_composition_counts() {
    let (outer, inner) = (square(), linear(&[vec![2.0]], &[0.0]));
    let f = Function::compose(&outer, &inner).unwrap();
    f.evaluate_sample(&sample(3)).unwrap();
    f.evaluate(&Point::from([1.0])).unwrap();
    assert_eq!(f.calls_number(), 4);
    assert_eq!(outer.calls_number(), 4);
    assert_eq!(inner.calls_number(), 4);
}

#[test]
fn test_derivative_counters() {
    let (a, b) = (identity(), square());
    let p = Function::product(&a, &b).unwrap();
    let x = Point::from([1.5]);
    p.gradient(&x).unwrap();
    p.gradient(&x).unwrap();
    p.hessian(&x).unwrap();
    assert_eq!(p.gradient_calls_number(), 2);
    assert_eq!(p.hessian_calls_number(), 1);
    assert_eq!(b.gradient_calls_number(), 3);
    assert_eq!(p.calls_number(), 0);
}

#[test]
fn test_failed_call_changes_nothing() {
    let p = Function::product(&identity(), &square()).unwrap();
    p.enable_history();
    assert!(p.evaluate(&Point::from([1.0, 1.0])).is_err());
    assert!(p.evaluate_sample(&Sample::zeros(2, 3)).is_err());
    assert_eq!(p.calls_number(), 0);
    assert_eq!(p.input_history().size(), 0);
}

#[test]
fn test_history_records_outer_calls_only() {
    let (a, b) = (identity(), square());
    let p = Function::product(&a, &b).unwrap();
    assert!(!p.is_history_enabled());
    p.evaluate(&Point::from([1.0])).unwrap();
    assert_eq!(p.input_history().size(), 0);

    p.enable_history();
    p.evaluate(&Point::from([2.0])).unwrap();
    p.evaluate_sample(&sample(2)).unwrap();
    assert_eq!(p.input_history().size(), 3);
    assert_eq!(p.input_history().point(0), Point::from([2.0]));
    assert_eq!(p.output_history().point(0), Point::from([8.0]));
    assert_eq!(p.output_history().point(2), Point::from([1.0]));
    // children keep their own, still disabled, history
    assert_eq!(b.input_history().size(), 0);

    p.clear_history();
    assert_eq!(p.output_history().size(), 0);
    assert_eq!(p.calls_number(), 4);

    p.disable_history();
    p.evaluate(&Point::from([2.0])).unwrap();
    assert_eq!(p.input_history().size(), 0);
}

#[test]
fn test_product_sample_is_recorded() {
    let p = Function::product(&identity(), &square()).unwrap();
    p.enable_history();
    p.evaluate_sample(&sample(4)).unwrap();
    assert_eq!(p.output_history().size(), 4);
    assert_eq!(p.output_history().point(3), Point::from([27.0]));
}
