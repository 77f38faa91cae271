mod concurrency_tests;
mod counter_tests;
mod field_tests;
mod parameter_tests;

use crate::{Function, LinearFunction, Matrix, Point, QuadraticFunction, SymmetricTensor};
use quickcheck::{Arbitrary, Gen};

/// `f(x) = constant + A x` with `A` given row by row (one row per output)
pub(crate) fn linear(rows: &[Vec<f64>], constant: &[f64]) -> Function {
    let n = rows.first().map_or(0, Vec::len);
    Function::from_primitive(
        LinearFunction::new(Point::zeros(n), Point::from(constant), Matrix::from_rows(rows))
            .unwrap(),
    )
}

/// `f(x) = x0` on R^1
pub(crate) fn identity() -> Function {
    linear(&[vec![1.0]], &[0.0])
}

/// `f(x) = x0²` on R^1
pub(crate) fn square() -> Function {
    Function::from_primitive(
        QuadraticFunction::new(
            Point::zeros(1),
            Point::zeros(1),
            Matrix::zeros(1, 1),
            SymmetricTensor::from_sheets(1, vec![Matrix::from_rows(&[vec![2.0]])]),
        )
        .unwrap(),
    )
}

/// Value in [-1, 1] on a 1/64 grid
pub(crate) fn small(g: &mut Gen) -> f64 {
    (u8::arbitrary(g) % 129) as f64 / 64.0 - 1.0
}

pub(crate) fn random_point(g: &mut Gen, dimension: usize) -> Point {
    (0..dimension).map(|_| small(g)).collect()
}

/// Quadratic R^n -> R^p with random coefficients in [-1, 1]
pub(crate) fn random_quadratic(g: &mut Gen, n: usize, p: usize) -> Function {
    let linear_rows: Vec<Vec<f64>> = (0..p).map(|_| random_point(g, n).into_vec()).collect();
    let sheets = (0..p)
        .map(|_| {
            let mut sheet = Matrix::zeros(n, n);
            for i in 0..n {
                for j in 0..=i {
                    let v = small(g);
                    sheet[(i, j)] = v;
                    sheet[(j, i)] = v;
                }
            }
            sheet
        })
        .collect();
    Function::from_primitive(
        QuadraticFunction::new(
            random_point(g, n),
            random_point(g, p),
            Matrix::from_rows(&linear_rows),
            SymmetricTensor::from_sheets(n, sheets),
        )
        .unwrap(),
    )
}

pub(crate) fn assert_close(a: &Point, b: &Point, tolerance: f64) {
    assert_eq!(a.dimension(), b.dimension());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() <= tolerance, "{} != {} (tolerance {})", a, b, tolerance);
    }
}
