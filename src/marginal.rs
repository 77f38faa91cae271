//! Restriction of a function to a subset of its output components

use crate::error::{FunctionError, Result, check_indices};
use crate::evaluation::{Evaluation, EvaluationState, check_input, check_sample};
use crate::function::Function;
use crate::gradient::Gradient;
use crate::hessian::Hessian;
use crate::instrument::CallCounter;
use crate::linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
use crate::persistence::Advocate;
use std::fmt;
use std::sync::Arc;

/// The wrapped function and the kept output components
#[derive(Debug)]
pub struct MarginalTerms {
    function: Function,
    indices: Vec<usize>,
}

impl MarginalTerms {
    pub fn new(function: Function, indices: Vec<usize>) -> Result<Self> {
        if indices.is_empty() {
            return Err(FunctionError::configuration(
                "a marginal needs at least one output component",
            ));
        }
        check_indices(&indices, function.output_dimension())?;
        Ok(MarginalTerms { function, indices })
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

#[derive(Debug)]
pub struct MarginalEvaluation {
    terms: Arc<MarginalTerms>,
    state: EvaluationState,
}

impl MarginalEvaluation {
    pub fn new(terms: Arc<MarginalTerms>) -> Self {
        let description = terms
            .function
            .input_description()
            .concat(&terms.function.output_description().select(&terms.indices));
        let state = EvaluationState::new(
            terms.function.input_dimension(),
            terms.indices.len(),
            description,
        );
        MarginalEvaluation { terms, state }
    }
}

impl Evaluation for MarginalEvaluation {
    fn class_name(&self) -> &'static str {
        "MarginalEvaluation"
    }

    fn input_dimension(&self) -> usize {
        self.terms.function.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.indices.len()
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.input_dimension(), x)?;
        let y = self.terms.function.evaluate(x)?.select(&self.terms.indices);
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.input_dimension(), xs)?;
        let mut ys = self
            .terms
            .function
            .evaluate_sample(xs)?
            .select_columns(&self.terms.indices);
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(self.output_description());
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    fn parameter(&self) -> Point {
        self.terms.function.parameter()
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        self.terms.function.set_parameter(parameter)
    }

    fn parameter_description(&self) -> Description {
        self.terms.function.parameter_description()
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        Ok(self
            .terms
            .function
            .parameter_gradient(x)?
            .select_columns(&self.terms.indices))
    }

    fn is_linear(&self) -> bool {
        self.terms.function.is_linear()
    }

    fn is_linearly_dependent(&self, index: usize) -> Result<bool> {
        self.terms.function.is_linearly_dependent(index)
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_function("function", &self.terms.function)?;
        adv.save_attribute("indices", &self.terms.indices)
    }
}

impl fmt::Display for MarginalEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){:?}", self.terms.function, self.terms.indices)
    }
}

#[derive(Debug)]
pub struct MarginalGradient {
    terms: Arc<MarginalTerms>,
    calls: CallCounter,
}

impl MarginalGradient {
    pub fn new(terms: Arc<MarginalTerms>) -> Self {
        MarginalGradient {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Gradient for MarginalGradient {
    fn input_dimension(&self) -> usize {
        self.terms.function.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.indices.len()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        let g = self
            .terms
            .function
            .gradient(x)?
            .select_columns(&self.terms.indices);
        self.calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

#[derive(Debug)]
pub struct MarginalHessian {
    terms: Arc<MarginalTerms>,
    calls: CallCounter,
}

impl MarginalHessian {
    pub fn new(terms: Arc<MarginalTerms>) -> Self {
        MarginalHessian {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Hessian for MarginalHessian {
    fn input_dimension(&self) -> usize {
        self.terms.function.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.indices.len()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        let h = self
            .terms
            .function
            .hessian(x)?
            .select_sheets(&self.terms.indices);
        self.calls.increment();
        Ok(h)
    }

    fn hessian_calls_number(&self) -> u64 {
        self.calls.get()
    }
}
