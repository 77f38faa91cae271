//! Centered finite-difference gradient and Hessian
//!
//! Used for evaluation-only functions and as a numerical reference for the
//! analytic derivatives of composites.

use crate::error::{FunctionError, Result, check_dimension};
use crate::evaluation::{EvaluationRef, check_input};
use crate::gradient::Gradient;
use crate::hessian::Hessian;
use crate::instrument::CallCounter;
use crate::linalg::{Matrix, Point, Sample, SymmetricTensor};

/// Per-component finite-difference step
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteDifferenceStep {
    epsilon: Point,
}

impl FiniteDifferenceStep {
    /// Steps must all be strictly positive
    pub fn new(epsilon: Point) -> Result<Self> {
        if let Some(e) = epsilon.iter().find(|e| e.is_nan() || **e <= 0.0) {
            return Err(FunctionError::configuration(format!(
                "finite difference step must be positive, got {}",
                e
            )));
        }
        Ok(FiniteDifferenceStep { epsilon })
    }

    /// Same step `epsilon` for every one of `dimension` components
    pub fn uniform(dimension: usize, epsilon: f64) -> Self {
        FiniteDifferenceStep {
            epsilon: Point::new(dimension, epsilon.abs().max(f64::MIN_POSITIVE)),
        }
    }

    pub fn epsilon(&self) -> &Point {
        &self.epsilon
    }

    pub fn dimension(&self) -> usize {
        self.epsilon.dimension()
    }
}

/// Gradient `(f(x + εᵢeᵢ) − f(x − εᵢeᵢ)) / 2εᵢ`
#[derive(Debug)]
pub struct CenteredFiniteDifferenceGradient {
    evaluation: EvaluationRef,
    step: FiniteDifferenceStep,
    calls: CallCounter,
}

impl CenteredFiniteDifferenceGradient {
    pub fn new(evaluation: EvaluationRef, step: FiniteDifferenceStep) -> Self {
        debug_assert_eq!(step.dimension(), evaluation.input_dimension());
        CenteredFiniteDifferenceGradient {
            evaluation,
            step,
            calls: CallCounter::new(),
        }
    }

    pub fn step(&self) -> &FiniteDifferenceStep {
        &self.step
    }
}

impl Gradient for CenteredFiniteDifferenceGradient {
    fn input_dimension(&self) -> usize {
        self.evaluation.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.evaluation.output_dimension()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        let n = self.evaluation.input_dimension();
        check_input(n, x)?;
        check_dimension("finite difference step", n, self.step.dimension())?;
        let eps = self.step.epsilon();

        // rows 2i / 2i+1 hold x + εᵢeᵢ / x − εᵢeᵢ
        let mut shifted = Sample::empty(n);
        for i in 0..n {
            let mut plus = x.clone();
            plus[i] += eps[i];
            shifted.push(&plus);
            let mut minus = x.clone();
            minus[i] -= eps[i];
            shifted.push(&minus);
        }
        let values = self.evaluation.evaluate_sample(&shifted)?;

        let p = self.evaluation.output_dimension();
        let mut g = Matrix::zeros(n, p);
        for i in 0..n {
            let (plus, minus) = (values.row(2 * i), values.row(2 * i + 1));
            for j in 0..p {
                g[(i, j)] = (plus[j] - minus[j]) / (2.0 * eps[i]);
            }
        }
        self.calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

/// Hessian from centered second differences
#[derive(Debug)]
pub struct CenteredFiniteDifferenceHessian {
    evaluation: EvaluationRef,
    step: FiniteDifferenceStep,
    calls: CallCounter,
}

impl CenteredFiniteDifferenceHessian {
    pub fn new(evaluation: EvaluationRef, step: FiniteDifferenceStep) -> Self {
        debug_assert_eq!(step.dimension(), evaluation.input_dimension());
        CenteredFiniteDifferenceHessian {
            evaluation,
            step,
            calls: CallCounter::new(),
        }
    }

    pub fn step(&self) -> &FiniteDifferenceStep {
        &self.step
    }
}

impl Hessian for CenteredFiniteDifferenceHessian {
    fn input_dimension(&self) -> usize {
        self.evaluation.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.evaluation.output_dimension()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        let n = self.evaluation.input_dimension();
        check_input(n, x)?;
        check_dimension("finite difference step", n, self.step.dimension())?;
        let eps = self.step.epsilon();
        let p = self.evaluation.output_dimension();

        let shift = |di: (usize, f64), dj: Option<(usize, f64)>| {
            let mut y = x.clone();
            y[di.0] += di.1;
            if let Some((j, d)) = dj {
                y[j] += d;
            }
            y
        };

        // center, then for each i: ±εᵢ, then for each i < j: the four corners
        let mut points = Sample::empty(n);
        points.push(x);
        for i in 0..n {
            points.push(&shift((i, eps[i]), None));
            points.push(&shift((i, -eps[i]), None));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                points.push(&shift((i, eps[i]), Some((j, eps[j]))));
                points.push(&shift((i, eps[i]), Some((j, -eps[j]))));
                points.push(&shift((i, -eps[i]), Some((j, eps[j]))));
                points.push(&shift((i, -eps[i]), Some((j, -eps[j]))));
            }
        }
        let values = self.evaluation.evaluate_sample(&points)?;

        let center = values.row(0);
        let mut h = SymmetricTensor::zeros(n, p);
        for i in 0..n {
            let (plus, minus) = (values.row(1 + 2 * i), values.row(2 + 2 * i));
            for k in 0..p {
                h[(i, i, k)] = (plus[k] - 2.0 * center[k] + minus[k]) / (eps[i] * eps[i]);
            }
        }
        let mut row = 1 + 2 * n;
        for i in 0..n {
            for j in (i + 1)..n {
                let (pp, pm, mp, mm) = (
                    values.row(row),
                    values.row(row + 1),
                    values.row(row + 2),
                    values.row(row + 3),
                );
                for k in 0..p {
                    let v = (pp[k] - pm[k] - mp[k] + mm[k]) / (4.0 * eps[i] * eps[j]);
                    h[(i, j, k)] = v;
                    h[(j, i, k)] = v;
                }
                row += 4;
            }
        }
        self.calls.increment();
        Ok(h)
    }

    fn hessian_calls_number(&self) -> u64 {
        self.calls.get()
    }
}
