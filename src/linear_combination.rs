//! Linear combination `f(x) = Σ cᵢ fᵢ(x)` of functions sharing input and
//! output dimensions
//!
//! When every coefficient is exactly zero the nodes short-circuit: the result
//! is a zero value (or derivative) and no child is invoked, so child call
//! counters do not move while the combination's own counter still does.

use crate::error::{FunctionError, Result, check_dimension, check_indices};
use crate::evaluation::{Evaluation, EvaluationState, check_input, check_sample, update_rows};
use crate::function::Function;
use crate::gradient::Gradient;
use crate::hessian::Hessian;
use crate::instrument::CallCounter;
use crate::linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
use crate::persistence::Advocate;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Children and coefficients, validated once and shared by the three nodes
#[derive(Debug)]
pub struct LinearCombinationTerms {
    functions: Vec<Function>,
    coefficients: Point,
    is_zero: bool,
}

impl LinearCombinationTerms {
    pub fn new(functions: Vec<Function>, coefficients: Point) -> Result<Self> {
        let Some(first) = functions.first() else {
            return Err(FunctionError::configuration(
                "cannot build a linear combination from an empty collection",
            ));
        };
        check_dimension(
            "linear combination coefficients",
            functions.len(),
            coefficients.dimension(),
        )?;
        let (n, p) = (first.input_dimension(), first.output_dimension());
        for f in &functions[1..] {
            check_dimension("linear combination input", n, f.input_dimension())?;
            check_dimension("linear combination output", p, f.output_dimension())?;
        }
        let is_zero = coefficients.iter().all(|c| *c == 0.0);
        debug!(
            "linear combination of {} functions R^{} -> R^{}{}",
            functions.len(),
            n,
            p,
            if is_zero { " (all coefficients zero)" } else { "" }
        );
        Ok(LinearCombinationTerms {
            functions,
            coefficients,
            is_zero,
        })
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn coefficients(&self) -> &Point {
        &self.coefficients
    }

    /// Whether every coefficient is exactly zero
    pub fn is_zero(&self) -> bool {
        self.is_zero
    }

    /// New combination over the output components `indices` of every child,
    /// with the same coefficients
    pub fn marginal(&self, indices: &[usize]) -> Result<Function> {
        check_indices(indices, self.output_dimension())?;
        let marginals = self
            .functions
            .iter()
            .map(|f| f.marginal_indices(indices))
            .collect::<Result<Vec<_>>>()?;
        Function::linear_combination(marginals, self.coefficients.clone())
    }

    fn input_dimension(&self) -> usize {
        self.functions[0].input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.functions[0].output_dimension()
    }

    fn iter_terms(&self) -> impl Iterator<Item = (&Function, f64)> {
        self.functions.iter().zip(self.coefficients.iter().copied())
    }
}

impl PartialEq for LinearCombinationTerms {
    fn eq(&self, other: &Self) -> bool {
        self.coefficients == other.coefficients
            && self.functions.len() == other.functions.len()
            && self
                .functions
                .iter()
                .zip(&other.functions)
                .all(|(a, b)| a.ptr_eq(b))
    }
}

#[derive(Debug)]
pub struct LinearCombinationEvaluation {
    terms: Arc<LinearCombinationTerms>,
    state: EvaluationState,
}

impl LinearCombinationEvaluation {
    pub fn new(terms: Arc<LinearCombinationTerms>) -> Self {
        let state = EvaluationState::new(
            terms.input_dimension(),
            terms.output_dimension(),
            terms.functions[0].description(),
        );
        LinearCombinationEvaluation { terms, state }
    }

    pub fn terms(&self) -> &Arc<LinearCombinationTerms> {
        &self.terms
    }
}

impl PartialEq for LinearCombinationEvaluation {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Evaluation for LinearCombinationEvaluation {
    fn class_name(&self) -> &'static str {
        "LinearCombinationEvaluation"
    }

    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.input_dimension(), x)?;
        let mut y = Point::zeros(self.output_dimension());
        if !self.terms.is_zero {
            for (f, c) in self.terms.iter_terms() {
                y.axpy(c, &f.evaluate(x)?);
            }
        }
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.input_dimension(), xs)?;
        let mut ys = Sample::zeros(xs.size(), self.output_dimension());
        if !self.terms.is_zero {
            for (f, c) in self.terms.iter_terms() {
                let fs = f.evaluate_sample(xs)?;
                update_rows(&mut ys, |i, row| {
                    for (acc, v) in row.iter_mut().zip(fs.row(i)) {
                        *acc += c * v;
                    }
                });
            }
        }
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(self.output_description());
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    /// Children's parameters concatenated in declaration order
    fn parameter(&self) -> Point {
        let mut parameter = Point::default();
        for f in &self.terms.functions {
            parameter.extend(&f.parameter());
        }
        parameter
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        let sizes: Vec<usize> = self
            .terms
            .functions
            .iter()
            .map(|f| f.parameter().dimension())
            .collect();
        check_dimension(
            "linear combination parameter",
            sizes.iter().sum(),
            parameter.dimension(),
        )?;
        let mut offset = 0;
        for (f, size) in self.terms.functions.iter().zip(sizes) {
            f.set_parameter(&Point::from(&parameter[offset..offset + size]))?;
            offset += size;
        }
        Ok(())
    }

    fn parameter_description(&self) -> Description {
        let mut description = Description::default();
        for f in &self.terms.functions {
            description.extend(&f.parameter_description());
        }
        description
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.input_dimension(), x)?;
        let p = self.output_dimension();
        if self.terms.is_zero {
            return Ok(Matrix::zeros(self.parameter().dimension(), p));
        }
        let mut g = Matrix::zeros(0, p);
        for (f, c) in self.terms.iter_terms() {
            g = g.stack_rows(&f.parameter_gradient(x)?.scaled(c));
        }
        Ok(g)
    }

    fn is_linear(&self) -> bool {
        self.terms.functions.iter().all(Function::is_linear)
    }

    /// Terms with a zero coefficient do not contribute and are skipped
    fn is_linearly_dependent(&self, index: usize) -> Result<bool> {
        check_indices(&[index], self.input_dimension())?;
        for (f, c) in self.terms.iter_terms() {
            if c != 0.0 && !f.is_linearly_dependent(index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_functions("functions", &self.terms.functions)?;
        adv.save_attribute("coefficients", &self.terms.coefficients)
    }
}

impl fmt::Display for LinearCombinationEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (func, c)) in self.terms.iter_terms().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{} * ({})", c, func)?;
        }
        Ok(())
    }
}

/// `∇f = Σ cᵢ ∇fᵢ`
#[derive(Debug)]
pub struct LinearCombinationGradient {
    terms: Arc<LinearCombinationTerms>,
    calls: CallCounter,
}

impl LinearCombinationGradient {
    pub fn new(terms: Arc<LinearCombinationTerms>) -> Self {
        LinearCombinationGradient {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Gradient for LinearCombinationGradient {
    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        let n = self.terms.input_dimension();
        check_input(n, x)?;
        let mut g = Matrix::zeros(n, self.terms.output_dimension());
        if !self.terms.is_zero {
            for (f, c) in self.terms.iter_terms() {
                g.axpy(c, &f.gradient(x)?);
            }
        }
        self.calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

/// `H_k = Σ cᵢ H_{i,k}`
#[derive(Debug)]
pub struct LinearCombinationHessian {
    terms: Arc<LinearCombinationTerms>,
    calls: CallCounter,
}

impl LinearCombinationHessian {
    pub fn new(terms: Arc<LinearCombinationTerms>) -> Self {
        LinearCombinationHessian {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Hessian for LinearCombinationHessian {
    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        let n = self.terms.input_dimension();
        check_input(n, x)?;
        let mut h = SymmetricTensor::zeros(n, self.terms.output_dimension());
        if !self.terms.is_zero {
            for (f, c) in self.terms.iter_terms() {
                h.axpy(c, &f.hessian(x)?);
            }
        }
        self.calls.increment();
        Ok(h)
    }

    fn hessian_calls_number(&self) -> u64 {
        self.calls.get()
    }
}
