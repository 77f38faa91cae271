//! Combinator Benchmarks
//!
//! Value, gradient and Hessian of nested composites, plus batched sample
//! evaluation (run with `--features parallel` to compare the rayon path).

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use function_algebra::{Function, Matrix, Point, QuadraticFunction, Sample, SymmetricTensor};
use std::hint::black_box;

/// Quadratic R^n -> R^p with deterministic, well-scaled coefficients
fn quadratic(n: usize, p: usize, seed: usize) -> Function {
    let value = |i: usize| ((i * 7919 + seed * 104_729) % 201) as f64 / 100.0 - 1.0;
    let linear: Vec<Vec<f64>> = (0..p)
        .map(|k| (0..n).map(|i| value(k * n + i)).collect())
        .collect();
    let sheets = (0..p)
        .map(|k| {
            let mut sheet = Matrix::zeros(n, n);
            for i in 0..n {
                for j in 0..=i {
                    let v = value(k * n * n + i * n + j + 13);
                    sheet[(i, j)] = v;
                    sheet[(j, i)] = v;
                }
            }
            sheet
        })
        .collect();
    let function = QuadraticFunction::new(
        Point::zeros(n),
        Point::zeros(p),
        Matrix::from_rows(&linear),
        SymmetricTensor::from_sheets(n, sheets),
    )
    .unwrap_or_else(|e| panic!("benchmark quadratic: {}", e));
    Function::from_primitive(function)
}

/// `(q * q) ∘ (q + q + ...)` with `width` terms in the inner combination
fn nested(n: usize, width: usize) -> Function {
    let terms = (0..width).map(|s| quadratic(n, n, s)).collect();
    let inner = Function::linear_combination(terms, Point::new(width, 1.0 / width as f64)).unwrap();
    let outer = Function::product(&quadratic(n, 1, 100), &quadratic(n, 3, 101)).unwrap();
    Function::compose(&outer, &inner).unwrap()
}

fn bench_derivatives(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested composite");
    for n in [2usize, 8, 32] {
        let f = nested(n, 4);
        let x = Point::new(n, 0.25);
        group.bench_with_input(BenchmarkId::new("evaluate", n), &x, |b, x| {
            b.iter(|| f.evaluate(black_box(x)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("gradient", n), &x, |b, x| {
            b.iter(|| f.gradient(black_box(x)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("hessian", n), &x, |b, x| {
            b.iter(|| f.hessian(black_box(x)).unwrap())
        });
    }
    group.finish();
}

fn bench_sample(c: &mut Criterion) {
    let f = nested(4, 8);
    let mut group = c.benchmark_group("sample evaluation");
    for size in [100usize, 10_000] {
        let data = (0..size * 4).map(|i| (i % 17) as f64 / 17.0).collect();
        let xs = Sample::from_rows(4, data);
        group.bench_with_input(BenchmarkId::from_parameter(size), &xs, |b, xs| {
            b.iter(|| f.evaluate_sample(black_box(xs)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_derivatives, bench_sample);
criterion_main!(benches);
