//! The `Function` handle: one evaluation, gradient and Hessian node kept
//! together, plus the combinator constructors
//!
//! # Example
//! ```
//! use function_algebra::{Function, LinearFunction, Matrix, Point};
//!
//! let a = Function::from_primitive(LinearFunction::new(
//!     Point::zeros(1), Point::zeros(1), Matrix::identity(1))?);
//! let twice = Function::linear_combination(vec![a.clone(), a], Point::from([1.0, 1.0]))?;
//! assert_eq!(twice.evaluate(&Point::from([3.0]))?, Point::from([6.0]));
//! # Ok::<(), function_algebra::FunctionError>(())
//! ```

use crate::composition::{CompositionEvaluation, CompositionGradient, CompositionHessian, CompositionTerms};
use crate::error::{Result, check_indices};
use crate::evaluation::{Evaluation, EvaluationRef};
use crate::finite_difference::{
    CenteredFiniteDifferenceGradient, CenteredFiniteDifferenceHessian, FiniteDifferenceStep,
};
use crate::gradient::{Gradient, GradientRef};
use crate::hessian::{Hessian, HessianRef};
use crate::linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
use crate::linear_combination::{
    LinearCombinationEvaluation, LinearCombinationGradient, LinearCombinationHessian,
    LinearCombinationTerms,
};
use crate::marginal::{MarginalEvaluation, MarginalGradient, MarginalHessian, MarginalTerms};
use crate::product::{ProductEvaluation, ProductGradient, ProductHessian, ProductTerms};
use crate::{DEFAULT_GRADIENT_EPSILON, DEFAULT_HESSIAN_EPSILON};
use std::fmt;
use std::sync::Arc;

/// Which construction produced a [`Function`]
#[derive(Debug, Clone)]
pub enum FunctionKind {
    Primitive,
    Product(Arc<ProductTerms>),
    LinearCombination(Arc<LinearCombinationTerms>),
    Composition(Arc<CompositionTerms>),
    Marginal(Arc<MarginalTerms>),
    PointToFieldConnection,
}

/// A multivariate function with consistent value, gradient and Hessian.
///
/// Cloning is cheap and shares the underlying nodes, so call counters and
/// parameters are visible through every clone and every parent combinator.
#[derive(Clone)]
pub struct Function {
    evaluation: EvaluationRef,
    gradient: GradientRef,
    hessian: HessianRef,
    kind: FunctionKind,
}

impl Function {
    pub(crate) fn from_parts(
        evaluation: EvaluationRef,
        gradient: GradientRef,
        hessian: HessianRef,
        kind: FunctionKind,
    ) -> Self {
        Function {
            evaluation,
            gradient,
            hessian,
            kind,
        }
    }

    /// Wrap a leaf implementing all three contracts in a single node
    pub fn from_primitive<P>(primitive: P) -> Self
    where
        P: Evaluation + Gradient + Hessian + 'static,
    {
        let node = Arc::new(primitive);
        Self::from_parts(node.clone(), node.clone(), node, FunctionKind::Primitive)
    }

    /// Wrap an evaluation-only node; derivatives use centered finite
    /// differences with the default steps
    pub fn from_evaluation(evaluation: EvaluationRef) -> Self {
        Self::with_finite_differences(evaluation, FunctionKind::Primitive)
    }

    pub(crate) fn with_finite_differences(evaluation: EvaluationRef, kind: FunctionKind) -> Self {
        let n = evaluation.input_dimension();
        let gradient = Arc::new(CenteredFiniteDifferenceGradient::new(
            evaluation.clone(),
            FiniteDifferenceStep::uniform(n, DEFAULT_GRADIENT_EPSILON),
        ));
        let hessian = Arc::new(CenteredFiniteDifferenceHessian::new(
            evaluation.clone(),
            FiniteDifferenceStep::uniform(n, DEFAULT_HESSIAN_EPSILON),
        ));
        Self::from_parts(evaluation, gradient, hessian, kind)
    }

    /// `f(x) = l(x)[0] * r(x)`; one of the two must have output dimension 1
    pub fn product(left: &Function, right: &Function) -> Result<Function> {
        let terms = Arc::new(ProductTerms::new(left.clone(), right.clone())?);
        Ok(Self::from_parts(
            Arc::new(ProductEvaluation::new(terms.clone())),
            Arc::new(ProductGradient::new(terms.clone())),
            Arc::new(ProductHessian::new(terms.clone())),
            FunctionKind::Product(terms),
        ))
    }

    /// `f(x) = Σ cᵢ fᵢ(x)`
    pub fn linear_combination(functions: Vec<Function>, coefficients: Point) -> Result<Function> {
        let terms = Arc::new(LinearCombinationTerms::new(functions, coefficients)?);
        Ok(Self::from_parts(
            Arc::new(LinearCombinationEvaluation::new(terms.clone())),
            Arc::new(LinearCombinationGradient::new(terms.clone())),
            Arc::new(LinearCombinationHessian::new(terms.clone())),
            FunctionKind::LinearCombination(terms),
        ))
    }

    /// `f(x) = outer(inner(x))`
    pub fn compose(outer: &Function, inner: &Function) -> Result<Function> {
        let terms = Arc::new(CompositionTerms::new(outer.clone(), inner.clone())?);
        Ok(Self::from_parts(
            Arc::new(CompositionEvaluation::new(terms.clone())),
            Arc::new(CompositionGradient::new(terms.clone())),
            Arc::new(CompositionHessian::new(terms.clone())),
            FunctionKind::Composition(terms),
        ))
    }

    /// Restriction to the output components `indices`, without inspecting
    /// how the function was built
    pub(crate) fn marginal_wrapper(&self, indices: &[usize]) -> Result<Function> {
        let terms = Arc::new(MarginalTerms::new(self.clone(), indices.to_vec())?);
        Ok(Self::from_parts(
            Arc::new(MarginalEvaluation::new(terms.clone())),
            Arc::new(MarginalGradient::new(terms.clone())),
            Arc::new(MarginalHessian::new(terms.clone())),
            FunctionKind::Marginal(terms),
        ))
    }

    /// The `i`-th output component as a function
    pub fn marginal(&self, i: usize) -> Result<Function> {
        self.marginal_indices(&[i])
    }

    /// The output components `indices` as a function.
    ///
    /// Combinators push the restriction down to their children; the original
    /// function is left untouched.
    pub fn marginal_indices(&self, indices: &[usize]) -> Result<Function> {
        check_indices(indices, self.output_dimension())?;
        match &self.kind {
            FunctionKind::Product(terms) => terms.marginal(indices),
            FunctionKind::LinearCombination(terms) => terms.marginal(indices),
            FunctionKind::Composition(terms) => terms.marginal(indices),
            FunctionKind::Marginal(terms) => {
                let composed: Vec<usize> = indices.iter().map(|&i| terms.indices()[i]).collect();
                terms.function().marginal_indices(&composed)
            }
            FunctionKind::Primitive | FunctionKind::PointToFieldConnection => {
                self.marginal_wrapper(indices)
            }
        }
    }

    pub fn evaluation(&self) -> &EvaluationRef {
        &self.evaluation
    }

    pub fn gradient_node(&self) -> &GradientRef {
        &self.gradient
    }

    pub fn hessian_node(&self) -> &HessianRef {
        &self.hessian
    }

    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    /// Whether both handles share the same evaluation node
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.evaluation, &other.evaluation)
    }

    pub fn input_dimension(&self) -> usize {
        self.evaluation.input_dimension()
    }

    pub fn output_dimension(&self) -> usize {
        self.evaluation.output_dimension()
    }

    pub fn evaluate(&self, x: &Point) -> Result<Point> {
        self.evaluation.evaluate(x)
    }

    pub fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        self.evaluation.evaluate_sample(xs)
    }

    pub fn gradient(&self, x: &Point) -> Result<Matrix> {
        self.gradient.gradient(x)
    }

    pub fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        self.hessian.hessian(x)
    }

    pub fn parameter(&self) -> Point {
        self.evaluation.parameter()
    }

    pub fn set_parameter(&self, parameter: &Point) -> Result<()> {
        self.evaluation.set_parameter(parameter)
    }

    pub fn parameter_description(&self) -> Description {
        self.evaluation.parameter_description()
    }

    pub fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        self.evaluation.parameter_gradient(x)
    }

    pub fn description(&self) -> Description {
        self.evaluation.description()
    }

    pub fn set_description(&self, description: Description) -> Result<()> {
        self.evaluation.set_description(description)
    }

    pub fn input_description(&self) -> Description {
        self.evaluation.input_description()
    }

    pub fn output_description(&self) -> Description {
        self.evaluation.output_description()
    }

    pub fn calls_number(&self) -> u64 {
        self.evaluation.calls_number()
    }

    pub fn gradient_calls_number(&self) -> u64 {
        self.gradient.gradient_calls_number()
    }

    pub fn hessian_calls_number(&self) -> u64 {
        self.hessian.hessian_calls_number()
    }

    pub fn enable_history(&self) {
        self.evaluation.enable_history();
    }

    pub fn disable_history(&self) {
        self.evaluation.disable_history();
    }

    pub fn is_history_enabled(&self) -> bool {
        self.evaluation.is_history_enabled()
    }

    pub fn clear_history(&self) {
        self.evaluation.clear_history();
    }

    pub fn input_history(&self) -> Sample {
        self.evaluation.input_history()
    }

    pub fn output_history(&self) -> Sample {
        self.evaluation.output_history()
    }

    pub fn is_linear(&self) -> bool {
        self.evaluation.is_linear()
    }

    pub fn is_linearly_dependent(&self, index: usize) -> Result<bool> {
        self.evaluation.is_linearly_dependent(index)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("evaluation", &self.evaluation)
            .field("input_dimension", &self.input_dimension())
            .field("output_dimension", &self.output_dimension())
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.evaluation)
    }
}
