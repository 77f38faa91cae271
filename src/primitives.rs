//! Leaf functions
//!
//! `LinearFunction` and `QuadraticFunction` carry analytic derivatives and
//! expose their constant term as the tunable parameter vector.
//! `AnalyticalFunction` wraps user closures.

use crate::error::{FunctionError, Result, check_dimension};
use crate::evaluation::{Evaluation, EvaluationRef, EvaluationState, check_input, check_sample, map_rows};
use crate::finite_difference::{
    CenteredFiniteDifferenceGradient, CenteredFiniteDifferenceHessian, FiniteDifferenceStep,
};
use crate::function::{Function, FunctionKind};
use crate::gradient::{Gradient, GradientRef};
use crate::hessian::{Hessian, HessianRef};
use crate::instrument::CallCounter;
use crate::linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
use crate::persistence::Advocate;
use crate::{DEFAULT_GRADIENT_EPSILON, DEFAULT_HESSIAN_EPSILON};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

fn constant_description(state: &EvaluationState, input_dimension: usize) -> Description {
    state
        .description()
        .iter()
        .skip(input_dimension)
        .map(|name| format!("{}_constant", name))
        .collect()
}

// ===== LinearFunction =====

/// `f(x) = c + A (x − center)` with `A` of shape `output × input`
#[derive(Debug)]
pub struct LinearFunction {
    center: Point,
    constant: RwLock<Point>,
    linear: Matrix,
    state: EvaluationState,
    gradient_calls: CallCounter,
    hessian_calls: CallCounter,
}

impl LinearFunction {
    pub fn new(center: Point, constant: Point, linear: Matrix) -> Result<Self> {
        check_dimension("linear term rows", constant.dimension(), linear.nb_rows())?;
        check_dimension("linear term columns", center.dimension(), linear.nb_columns())?;
        let state =
            EvaluationState::with_default_description(center.dimension(), constant.dimension());
        Ok(LinearFunction {
            center,
            constant: RwLock::new(constant),
            linear,
            state,
            gradient_calls: CallCounter::new(),
            hessian_calls: CallCounter::new(),
        })
    }

    pub fn center(&self) -> &Point {
        &self.center
    }

    pub fn constant(&self) -> Point {
        self.constant.read().clone()
    }

    pub fn linear(&self) -> &Matrix {
        &self.linear
    }

    fn compute(&self, x: &[f64]) -> Point {
        let d: Vec<f64> = x.iter().zip(self.center.iter()).map(|(a, b)| a - b).collect();
        let mut y = self.linear.mul_vec(&d);
        y += &*self.constant.read();
        y
    }

    pub(crate) fn load(adv: &mut Advocate<'_>) -> Result<Self> {
        Self::new(
            adv.load_attribute("center")?,
            adv.load_attribute("constant")?,
            adv.load_attribute("linear")?,
        )
    }
}

impl Evaluation for LinearFunction {
    fn class_name(&self) -> &'static str {
        "LinearFunction"
    }

    fn input_dimension(&self) -> usize {
        self.center.dimension()
    }

    fn output_dimension(&self) -> usize {
        self.linear.nb_rows()
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.center.dimension(), x)?;
        let y = self.compute(x);
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.center.dimension(), xs)?;
        let mut ys = map_rows(xs, self.linear.nb_rows(), |x| Ok(self.compute(x)))?;
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(Evaluation::output_description(self));
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    fn parameter(&self) -> Point {
        self.constant()
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        let mut constant = self.constant.write();
        check_dimension("parameter", constant.dimension(), parameter.dimension())?;
        *constant = parameter.clone();
        Ok(())
    }

    fn parameter_description(&self) -> Description {
        constant_description(&self.state, self.center.dimension())
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.center.dimension(), x)?;
        Ok(Matrix::identity(self.linear.nb_rows()))
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_attribute("center", &self.center)?;
        adv.save_attribute("constant", &self.constant())?;
        adv.save_attribute("linear", &self.linear)
    }
}

impl Gradient for LinearFunction {
    fn input_dimension(&self) -> usize {
        self.center.dimension()
    }

    fn output_dimension(&self) -> usize {
        self.linear.nb_rows()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.center.dimension(), x)?;
        self.gradient_calls.increment();
        Ok(self.linear.transpose())
    }

    fn gradient_calls_number(&self) -> u64 {
        self.gradient_calls.get()
    }
}

impl Hessian for LinearFunction {
    fn input_dimension(&self) -> usize {
        self.center.dimension()
    }

    fn output_dimension(&self) -> usize {
        self.linear.nb_rows()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        check_input(self.center.dimension(), x)?;
        self.hessian_calls.increment();
        Ok(SymmetricTensor::zeros(self.center.dimension(), self.linear.nb_rows()))
    }

    fn hessian_calls_number(&self) -> u64 {
        self.hessian_calls.get()
    }
}

impl fmt::Display for LinearFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} * (x - {})",
            self.constant.read(),
            self.linear,
            self.center
        )
    }
}

// ===== QuadraticFunction =====

/// `f_k(x) = c_k + (A d)_k + ½ dᵀ Q_k d` with `d = x − center`
#[derive(Debug)]
pub struct QuadraticFunction {
    center: Point,
    constant: RwLock<Point>,
    linear: Matrix,
    quadratic: SymmetricTensor,
    state: EvaluationState,
    gradient_calls: CallCounter,
    hessian_calls: CallCounter,
}

impl QuadraticFunction {
    /// `linear` is `output × input`; `quadratic` has one symmetric
    /// `input × input` sheet per output
    pub fn new(
        center: Point,
        constant: Point,
        linear: Matrix,
        quadratic: SymmetricTensor,
    ) -> Result<Self> {
        let (n, p) = (center.dimension(), constant.dimension());
        check_dimension("linear term rows", p, linear.nb_rows())?;
        check_dimension("linear term columns", n, linear.nb_columns())?;
        check_dimension("quadratic term size", n, quadratic.size())?;
        check_dimension("quadratic term sheets", p, quadratic.nb_sheets())?;
        if let Some(k) = (0..p).find(|&k| !quadratic.sheet(k).is_symmetric(1e-12)) {
            return Err(FunctionError::configuration(format!(
                "quadratic term sheet {} is not symmetric",
                k
            )));
        }
        Ok(QuadraticFunction {
            center,
            constant: RwLock::new(constant),
            linear,
            quadratic,
            state: EvaluationState::with_default_description(n, p),
            gradient_calls: CallCounter::new(),
            hessian_calls: CallCounter::new(),
        })
    }

    pub fn constant(&self) -> Point {
        self.constant.read().clone()
    }

    fn shift(&self, x: &[f64]) -> Vec<f64> {
        x.iter().zip(self.center.iter()).map(|(a, b)| a - b).collect()
    }

    fn compute(&self, x: &[f64]) -> Point {
        let d = self.shift(x);
        let mut y = self.linear.mul_vec(&d);
        y += &*self.constant.read();
        for (k, yk) in y.iter_mut().enumerate() {
            let qd = self.quadratic.sheet(k).mul_vec(&d);
            *yk += 0.5 * d.iter().zip(qd.iter()).map(|(a, b)| a * b).sum::<f64>();
        }
        y
    }

    pub(crate) fn load(adv: &mut Advocate<'_>) -> Result<Self> {
        Self::new(
            adv.load_attribute("center")?,
            adv.load_attribute("constant")?,
            adv.load_attribute("linear")?,
            adv.load_attribute("quadratic")?,
        )
    }
}

impl Evaluation for QuadraticFunction {
    fn class_name(&self) -> &'static str {
        "QuadraticFunction"
    }

    fn input_dimension(&self) -> usize {
        self.center.dimension()
    }

    fn output_dimension(&self) -> usize {
        self.linear.nb_rows()
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.center.dimension(), x)?;
        let y = self.compute(x);
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.center.dimension(), xs)?;
        let mut ys = map_rows(xs, self.linear.nb_rows(), |x| Ok(self.compute(x)))?;
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(Evaluation::output_description(self));
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    fn parameter(&self) -> Point {
        self.constant()
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        let mut constant = self.constant.write();
        check_dimension("parameter", constant.dimension(), parameter.dimension())?;
        *constant = parameter.clone();
        Ok(())
    }

    fn parameter_description(&self) -> Description {
        constant_description(&self.state, self.center.dimension())
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.center.dimension(), x)?;
        Ok(Matrix::identity(self.linear.nb_rows()))
    }

    fn is_linear(&self) -> bool {
        self.quadratic.is_zero()
    }

    fn is_linearly_dependent(&self, index: usize) -> Result<bool> {
        crate::error::check_indices(&[index], self.center.dimension())?;
        // no quadratic coupling involving variable `index`
        Ok((0..self.quadratic.nb_sheets()).all(|k| {
            let q = self.quadratic.sheet(k);
            (0..self.quadratic.size()).all(|j| q[(index, j)] == 0.0)
        }))
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_attribute("center", &self.center)?;
        adv.save_attribute("constant", &self.constant())?;
        adv.save_attribute("linear", &self.linear)?;
        adv.save_attribute("quadratic", &self.quadratic)
    }
}

impl Gradient for QuadraticFunction {
    fn input_dimension(&self) -> usize {
        self.center.dimension()
    }

    fn output_dimension(&self) -> usize {
        self.linear.nb_rows()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.center.dimension(), x)?;
        let d = self.shift(x);
        let mut g = self.linear.transpose();
        for k in 0..self.quadratic.nb_sheets() {
            let qd = self.quadratic.sheet(k).mul_vec(&d);
            for (i, v) in qd.iter().enumerate() {
                g[(i, k)] += v;
            }
        }
        self.gradient_calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.gradient_calls.get()
    }
}

impl Hessian for QuadraticFunction {
    fn input_dimension(&self) -> usize {
        self.center.dimension()
    }

    fn output_dimension(&self) -> usize {
        self.linear.nb_rows()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        check_input(self.center.dimension(), x)?;
        self.hessian_calls.increment();
        Ok(self.quadratic.clone())
    }

    fn hessian_calls_number(&self) -> u64 {
        self.hessian_calls.get()
    }
}

impl fmt::Display for QuadraticFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} * (x - {}) + 0.5 * (x - {})' * {} * (x - {})",
            self.constant.read(),
            self.linear,
            self.center,
            self.center,
            self.quadratic,
            self.center
        )
    }
}

// ===== AnalyticalFunction =====

/// Closure computing the value
pub type EvalFn = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

/// Closure computing the `input × output` Jacobian
pub type GradientFn = Arc<dyn Fn(&[f64]) -> Matrix + Send + Sync>;

/// Closure computing one `input × input` sheet per output
pub type HessianFn = Arc<dyn Fn(&[f64]) -> SymmetricTensor + Send + Sync>;

/// Function defined by user closures.
///
/// Missing derivatives fall back to centered finite differences.
///
/// # Example
/// ```
/// use function_algebra::{AnalyticalFunction, Matrix, Point};
///
/// let f = AnalyticalFunction::new(1, 1)
///     .eval(|x| vec![x[0].sin()])
///     .gradient(|x| Matrix::from_rows(&[vec![x[0].cos()]]))
///     .build()?;
/// assert_eq!(f.evaluate(&Point::from([0.0]))?, Point::from([0.0]));
/// # Ok::<(), function_algebra::FunctionError>(())
/// ```
#[derive(Clone)]
pub struct AnalyticalFunction {
    input_dimension: usize,
    output_dimension: usize,
    eval_fn: Option<EvalFn>,
    gradient_fn: Option<GradientFn>,
    hessian_fn: Option<HessianFn>,
    description: Option<Description>,
}

impl AnalyticalFunction {
    pub fn new(input_dimension: usize, output_dimension: usize) -> Self {
        AnalyticalFunction {
            input_dimension,
            output_dimension,
            eval_fn: None,
            gradient_fn: None,
            hessian_fn: None,
            description: None,
        }
    }

    /// Set the value closure
    pub fn eval<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.eval_fn = Some(Arc::new(f));
        self
    }

    /// Set the Jacobian closure
    pub fn gradient<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64]) -> Matrix + Send + Sync + 'static,
    {
        self.gradient_fn = Some(Arc::new(f));
        self
    }

    /// Set the Hessian closure
    pub fn hessian<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64]) -> SymmetricTensor + Send + Sync + 'static,
    {
        self.hessian_fn = Some(Arc::new(f));
        self
    }

    /// Input names followed by output names
    pub fn description(mut self, description: Description) -> Self {
        self.description = Some(description);
        self
    }

    /// Build the function; fails without a value closure
    pub fn build(self) -> Result<Function> {
        let eval_fn = self
            .eval_fn
            .ok_or_else(|| FunctionError::configuration("analytical function needs a value closure"))?;
        let (n, p) = (self.input_dimension, self.output_dimension);
        let state = match self.description {
            Some(d) => {
                check_dimension("description", n + p, d.len())?;
                EvaluationState::new(n, p, d)
            }
            None => EvaluationState::with_default_description(n, p),
        };
        let evaluation: EvaluationRef = Arc::new(AnalyticalEvaluation {
            input_dimension: n,
            output_dimension: p,
            eval_fn,
            state,
        });
        let gradient: GradientRef = match self.gradient_fn {
            Some(f) => Arc::new(AnalyticalGradient {
                input_dimension: n,
                output_dimension: p,
                gradient_fn: f,
                calls: CallCounter::new(),
            }),
            None => Arc::new(CenteredFiniteDifferenceGradient::new(
                evaluation.clone(),
                FiniteDifferenceStep::uniform(n, DEFAULT_GRADIENT_EPSILON),
            )),
        };
        let hessian: HessianRef = match self.hessian_fn {
            Some(f) => Arc::new(AnalyticalHessian {
                input_dimension: n,
                output_dimension: p,
                hessian_fn: f,
                calls: CallCounter::new(),
            }),
            None => Arc::new(CenteredFiniteDifferenceHessian::new(
                evaluation.clone(),
                FiniteDifferenceStep::uniform(n, DEFAULT_HESSIAN_EPSILON),
            )),
        };
        Ok(Function::from_parts(evaluation, gradient, hessian, FunctionKind::Primitive))
    }
}

struct AnalyticalEvaluation {
    input_dimension: usize,
    output_dimension: usize,
    eval_fn: EvalFn,
    state: EvaluationState,
}

impl AnalyticalEvaluation {
    fn compute(&self, x: &[f64]) -> Result<Point> {
        let y = (self.eval_fn)(x);
        check_dimension("analytical function output", self.output_dimension, y.len())?;
        Ok(Point::from(y))
    }
}

impl fmt::Debug for AnalyticalEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticalEvaluation")
            .field("input_dimension", &self.input_dimension)
            .field("output_dimension", &self.output_dimension)
            .finish()
    }
}

impl fmt::Display for AnalyticalEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "analytical{}", self.state.description())
    }
}

impl Evaluation for AnalyticalEvaluation {
    fn class_name(&self) -> &'static str {
        "AnalyticalFunction"
    }

    fn input_dimension(&self) -> usize {
        self.input_dimension
    }

    fn output_dimension(&self) -> usize {
        self.output_dimension
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.input_dimension, x)?;
        let y = self.compute(x)?;
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.input_dimension, xs)?;
        let mut ys = map_rows(xs, self.output_dimension, |x| self.compute(x))?;
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(self.output_description());
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }
}

struct AnalyticalGradient {
    input_dimension: usize,
    output_dimension: usize,
    gradient_fn: GradientFn,
    calls: CallCounter,
}

impl fmt::Debug for AnalyticalGradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticalGradient").finish_non_exhaustive()
    }
}

impl Gradient for AnalyticalGradient {
    fn input_dimension(&self) -> usize {
        self.input_dimension
    }

    fn output_dimension(&self) -> usize {
        self.output_dimension
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.input_dimension, x)?;
        let g = (self.gradient_fn)(x);
        check_dimension("analytical gradient rows", self.input_dimension, g.nb_rows())?;
        check_dimension("analytical gradient columns", self.output_dimension, g.nb_columns())?;
        self.calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

struct AnalyticalHessian {
    input_dimension: usize,
    output_dimension: usize,
    hessian_fn: HessianFn,
    calls: CallCounter,
}

impl fmt::Debug for AnalyticalHessian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticalHessian").finish_non_exhaustive()
    }
}

impl Hessian for AnalyticalHessian {
    fn input_dimension(&self) -> usize {
        self.input_dimension
    }

    fn output_dimension(&self) -> usize {
        self.output_dimension
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        check_input(self.input_dimension, x)?;
        let h = (self.hessian_fn)(x);
        check_dimension("analytical hessian size", self.input_dimension, h.size())?;
        check_dimension("analytical hessian sheets", self.output_dimension, h.nb_sheets())?;
        self.calls.increment();
        Ok(h)
    }

    fn hessian_calls_number(&self) -> u64 {
        self.calls.get()
    }
}
