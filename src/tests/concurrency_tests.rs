use super::{identity, square};
use crate::{Function, Point};
use std::thread;

#[test]
fn test_concurrent_evaluation_shares_counters() {
    let (a, b) = (identity(), square());
    let lc = Function::linear_combination(vec![a.clone(), b.clone()], Point::from([1.0, 1.0])).unwrap();
    lc.enable_history();

    thread::scope(|s| {
        for t in 0..8 {
            let lc = lc.clone();
            s.spawn(move || {
                for i in 0..100 {
                    let x = Point::from([(t * 100 + i) as f64 / 100.0]);
                    lc.evaluate(&x).unwrap();
                }
            });
        }
    });

    assert_eq!(lc.calls_number(), 800);
    assert_eq!(a.calls_number(), 800);
    assert_eq!(b.calls_number(), 800);

    // every logged output belongs to the input logged next to it
    let (inputs, outputs) = (lc.input_history(), lc.output_history());
    assert_eq!(inputs.size(), 800);
    for i in 0..inputs.size() {
        let x = inputs.row(i)[0];
        assert!((outputs.row(i)[0] - (x + x * x)).abs() < 1e-12);
    }
}

#[test]
fn test_concurrent_parameter_updates_stay_consistent() {
    let a = identity();
    let f = Function::product(&a, &square()).unwrap();
    thread::scope(|s| {
        for t in 0..4 {
            let f = f.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    f.set_parameter(&Point::from([0.0, t as f64])).unwrap();
                    assert_eq!(f.parameter().dimension(), 2);
                }
            });
        }
    });
    assert!(f.parameter()[1] < 4.0);
}
