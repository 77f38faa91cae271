//! Functional composition `f(x) = outer(inner(x))`
//!
//! Derivatives follow the chain rule in the `input × output` Jacobian layout:
//! `∇f(x) = ∇inner(x) · ∇outer(inner(x))`.

use crate::error::{Result, check_dimension, check_indices};
use crate::evaluation::{Evaluation, EvaluationState, check_input, check_sample};
use crate::function::Function;
use crate::gradient::Gradient;
use crate::hessian::Hessian;
use crate::instrument::CallCounter;
use crate::linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
use crate::persistence::Advocate;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Outer and inner functions, validated once and shared by the three nodes
#[derive(Debug)]
pub struct CompositionTerms {
    outer: Function,
    inner: Function,
}

impl CompositionTerms {
    pub fn new(outer: Function, inner: Function) -> Result<Self> {
        check_dimension(
            "composition boundary",
            outer.input_dimension(),
            inner.output_dimension(),
        )?;
        debug!(
            "composition R^{} -> R^{} -> R^{}",
            inner.input_dimension(),
            inner.output_dimension(),
            outer.output_dimension()
        );
        Ok(CompositionTerms { outer, inner })
    }

    pub fn outer(&self) -> &Function {
        &self.outer
    }

    pub fn inner(&self) -> &Function {
        &self.inner
    }

    /// `outer.marginal(indices) ∘ inner`
    pub fn marginal(&self, indices: &[usize]) -> Result<Function> {
        check_indices(indices, self.outer.output_dimension())?;
        Function::compose(&self.outer.marginal_indices(indices)?, &self.inner)
    }

    fn input_dimension(&self) -> usize {
        self.inner.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.outer.output_dimension()
    }
}

impl PartialEq for CompositionTerms {
    fn eq(&self, other: &Self) -> bool {
        self.outer.ptr_eq(&other.outer) && self.inner.ptr_eq(&other.inner)
    }
}

#[derive(Debug)]
pub struct CompositionEvaluation {
    terms: Arc<CompositionTerms>,
    state: EvaluationState,
}

impl CompositionEvaluation {
    pub fn new(terms: Arc<CompositionTerms>) -> Self {
        let description = terms
            .inner
            .input_description()
            .concat(&terms.outer.output_description());
        let state =
            EvaluationState::new(terms.input_dimension(), terms.output_dimension(), description);
        CompositionEvaluation { terms, state }
    }

    pub fn terms(&self) -> &Arc<CompositionTerms> {
        &self.terms
    }
}

impl PartialEq for CompositionEvaluation {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Evaluation for CompositionEvaluation {
    fn class_name(&self) -> &'static str {
        "CompositionEvaluation"
    }

    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.input_dimension(), x)?;
        let y = self.terms.inner.evaluate(x)?;
        let z = self.terms.outer.evaluate(&y)?;
        self.state.instrumentation().record(x, &z);
        Ok(z)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.input_dimension(), xs)?;
        let ys = self.terms.inner.evaluate_sample(xs)?;
        let mut zs = self.terms.outer.evaluate_sample(&ys)?;
        self.state.instrumentation().record_sample(xs, &zs);
        zs.set_description(self.output_description());
        Ok(zs)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    /// Inner function's parameters, then the outer function's
    fn parameter(&self) -> Point {
        let mut parameter = self.terms.inner.parameter();
        parameter.extend(&self.terms.outer.parameter());
        parameter
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        let inner_dimension = self.terms.inner.parameter().dimension();
        let outer_dimension = self.terms.outer.parameter().dimension();
        check_dimension(
            "composition parameter",
            inner_dimension + outer_dimension,
            parameter.dimension(),
        )?;
        self.terms
            .inner
            .set_parameter(&Point::from(&parameter[..inner_dimension]))?;
        self.terms
            .outer
            .set_parameter(&Point::from(&parameter[inner_dimension..]))
    }

    fn parameter_description(&self) -> Description {
        self.terms
            .inner
            .parameter_description()
            .concat(&self.terms.outer.parameter_description())
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.input_dimension(), x)?;
        let y = self.terms.inner.evaluate(x)?;
        let inner_rows = &self.terms.inner.parameter_gradient(x)? * &self.terms.outer.gradient(&y)?;
        let outer_rows = self.terms.outer.parameter_gradient(&y)?;
        Ok(inner_rows.stack_rows(&outer_rows))
    }

    fn is_linear(&self) -> bool {
        self.terms.outer.is_linear() && self.terms.inner.is_linear()
    }

    fn is_linearly_dependent(&self, index: usize) -> Result<bool> {
        check_indices(&[index], self.input_dimension())?;
        Ok(self.terms.outer.is_linear() && self.terms.inner.is_linearly_dependent(index)?)
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_function("outer", &self.terms.outer)?;
        adv.save_function("inner", &self.terms.inner)
    }
}

impl fmt::Display for CompositionEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})o({})", self.terms.outer, self.terms.inner)
    }
}

/// `∇f(x) = ∇inner(x) · ∇outer(inner(x))`
#[derive(Debug)]
pub struct CompositionGradient {
    terms: Arc<CompositionTerms>,
    calls: CallCounter,
}

impl CompositionGradient {
    pub fn new(terms: Arc<CompositionTerms>) -> Self {
        CompositionGradient {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Gradient for CompositionGradient {
    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.terms.input_dimension(), x)?;
        let y = self.terms.inner.evaluate(x)?;
        let g = &self.terms.inner.gradient(x)? * &self.terms.outer.gradient(&y)?;
        self.calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

/// Second-order chain rule, per output component `k` of the outer function:
/// `H_k = ∇h · Hg_k · ∇hᵀ + Σ_l ∂g_k/∂y_l · Hh_l`
#[derive(Debug)]
pub struct CompositionHessian {
    terms: Arc<CompositionTerms>,
    calls: CallCounter,
}

impl CompositionHessian {
    pub fn new(terms: Arc<CompositionTerms>) -> Self {
        CompositionHessian {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Hessian for CompositionHessian {
    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        let n = self.terms.input_dimension();
        check_input(n, x)?;
        let y = self.terms.inner.evaluate(x)?;
        let inner_gradient = self.terms.inner.gradient(x)?;
        let inner_hessian = self.terms.inner.hessian(x)?;
        let outer_gradient = self.terms.outer.gradient(&y)?;
        let outer_hessian = self.terms.outer.hessian(&y)?;

        let inner_gradient_t = inner_gradient.transpose();
        let p = self.terms.output_dimension();
        let mut sheets = Vec::with_capacity(p);
        for k in 0..p {
            let mut sheet = &(&inner_gradient * outer_hessian.sheet(k)) * &inner_gradient_t;
            for l in 0..inner_hessian.nb_sheets() {
                sheet.axpy(outer_gradient[(l, k)], inner_hessian.sheet(l));
            }
            sheets.push(sheet);
        }
        self.calls.increment();
        Ok(SymmetricTensor::from_sheets(n, sheets))
    }

    fn hessian_calls_number(&self) -> u64 {
        self.calls.get()
    }
}
