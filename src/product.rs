//! Product of a scalar-valued function and a vector-valued function
//!
//! `f(x) = l(x)[0] * r(x)`. The evaluation, gradient and Hessian nodes share
//! one `ProductTerms`, whose left operand always has output dimension 1.

use crate::error::{FunctionError, Result, check_dimension, check_indices};
use crate::evaluation::{Evaluation, EvaluationState, check_input, check_sample, update_rows};
use crate::function::Function;
use crate::gradient::Gradient;
use crate::hessian::Hessian;
use crate::instrument::CallCounter;
use crate::linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
use crate::persistence::Advocate;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// Operands of a product, validated once and shared by the three nodes
#[derive(Debug)]
pub struct ProductTerms {
    left: Function,
    right: Function,
}

impl ProductTerms {
    /// Operands are exchanged when only the second one is scalar-valued
    pub fn new(left: Function, right: Function) -> Result<Self> {
        let (left, right) = if left.output_dimension() != 1 {
            if right.output_dimension() != 1 {
                return Err(FunctionError::configuration(format!(
                    "the output dimension of at least one of the functions must be 1 in a product, got {} and {}",
                    left.output_dimension(),
                    right.output_dimension()
                )));
            }
            warn!("exchanged the product operands so that the left one has output dimension 1");
            (right, left)
        } else {
            (left, right)
        };
        check_dimension(
            "product operand input",
            left.input_dimension(),
            right.input_dimension(),
        )?;
        debug!(
            "product of R^{} -> R^1 and R^{} -> R^{}",
            left.input_dimension(),
            right.input_dimension(),
            right.output_dimension()
        );
        Ok(ProductTerms { left, right })
    }

    /// The scalar-valued operand
    pub fn left(&self) -> &Function {
        &self.left
    }

    pub fn right(&self) -> &Function {
        &self.right
    }

    /// `left * right.marginal(indices)`
    pub fn marginal(&self, indices: &[usize]) -> Result<Function> {
        check_indices(indices, self.output_dimension())?;
        Function::product(&self.left, &self.right.marginal_indices(indices)?)
    }

    fn input_dimension(&self) -> usize {
        self.right.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.right.output_dimension()
    }
}

/// Children are compared by identity, in order
impl PartialEq for ProductTerms {
    fn eq(&self, other: &Self) -> bool {
        self.left.ptr_eq(&other.left) && self.right.ptr_eq(&other.right)
    }
}

#[derive(Debug)]
pub struct ProductEvaluation {
    terms: Arc<ProductTerms>,
    state: EvaluationState,
}

impl ProductEvaluation {
    pub fn new(terms: Arc<ProductTerms>) -> Self {
        let state = EvaluationState::new(
            terms.input_dimension(),
            terms.output_dimension(),
            terms.right.description(),
        );
        ProductEvaluation { terms, state }
    }

    pub fn terms(&self) -> &Arc<ProductTerms> {
        &self.terms
    }
}

impl PartialEq for ProductEvaluation {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Evaluation for ProductEvaluation {
    fn class_name(&self) -> &'static str {
        "ProductEvaluation"
    }

    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        check_input(self.input_dimension(), x)?;
        let left = self.terms.left.evaluate(x)?;
        let right = self.terms.right.evaluate(x)?;
        let y = right * left[0];
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.input_dimension(), xs)?;
        let left = self.terms.left.evaluate_sample(xs)?;
        let mut ys = self.terms.right.evaluate_sample(xs)?;
        update_rows(&mut ys, |i, row| {
            let l = left.row(i)[0];
            row.iter_mut().for_each(|v| *v *= l);
        });
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(self.output_description());
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    /// Right operand's parameters, then the left operand's
    fn parameter(&self) -> Point {
        let mut parameter = self.terms.right.parameter();
        parameter.extend(&self.terms.left.parameter());
        parameter
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        let right_dimension = self.terms.right.parameter().dimension();
        let left_dimension = self.terms.left.parameter().dimension();
        check_dimension(
            "product parameter",
            right_dimension + left_dimension,
            parameter.dimension(),
        )?;
        self.terms
            .right
            .set_parameter(&Point::from(&parameter[..right_dimension]))?;
        self.terms
            .left
            .set_parameter(&Point::from(&parameter[right_dimension..]))
    }

    fn parameter_description(&self) -> Description {
        self.terms
            .right
            .parameter_description()
            .concat(&self.terms.left.parameter_description())
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.input_dimension(), x)?;
        let left = self.terms.left.evaluate(x)?;
        let right = self.terms.right.evaluate(x)?;
        // ∂(l r)/∂p_r = l ∂r/∂p_r ; ∂(l r)/∂p_l = ∂l/∂p_l rᵀ
        let right_rows = self.terms.right.parameter_gradient(x)?.scaled(left[0]);
        let left_column = self.terms.left.parameter_gradient(x)?.column_values(0);
        let left_rows = Matrix::outer(&left_column, &right);
        Ok(right_rows.stack_rows(&left_rows))
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_function("left", &self.terms.left)?;
        adv.save_function("right", &self.terms.right)
    }
}

impl fmt::Display for ProductEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) * ({})", self.terms.left, self.terms.right)
    }
}

/// Product rule: `∇f = ∇l rᵀ + l ∇r`
#[derive(Debug)]
pub struct ProductGradient {
    terms: Arc<ProductTerms>,
    calls: CallCounter,
}

impl ProductGradient {
    pub fn new(terms: Arc<ProductTerms>) -> Self {
        ProductGradient {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Gradient for ProductGradient {
    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.terms.input_dimension(), x)?;
        let left = self.terms.left.evaluate(x)?;
        let left_gradient = self.terms.left.gradient(x)?;
        let right = self.terms.right.evaluate(x)?;
        let right_gradient = self.terms.right.gradient(x)?;

        let mut g = right_gradient.scaled(left[0]);
        g += &Matrix::outer(&left_gradient.column_values(0), &right);
        self.calls.increment();
        Ok(g)
    }

    fn gradient_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

/// Second-order product rule, per output component `j`:
/// `H_j = r_j H_l + l H_{r_j} + ∇l ∇r_jᵀ + ∇r_j ∇lᵀ`
#[derive(Debug)]
pub struct ProductHessian {
    terms: Arc<ProductTerms>,
    calls: CallCounter,
}

impl ProductHessian {
    pub fn new(terms: Arc<ProductTerms>) -> Self {
        ProductHessian {
            terms,
            calls: CallCounter::new(),
        }
    }
}

impl Hessian for ProductHessian {
    fn input_dimension(&self) -> usize {
        self.terms.input_dimension()
    }

    fn output_dimension(&self) -> usize {
        self.terms.output_dimension()
    }

    fn hessian(&self, x: &Point) -> Result<SymmetricTensor> {
        let n = self.terms.input_dimension();
        check_input(n, x)?;
        let left = self.terms.left.evaluate(x)?;
        let left_gradient = self.terms.left.gradient(x)?.column_values(0);
        let left_hessian = self.terms.left.hessian(x)?;
        let right = self.terms.right.evaluate(x)?;
        let right_gradient = self.terms.right.gradient(x)?;
        let right_hessian = self.terms.right.hessian(x)?;

        let p = self.terms.output_dimension();
        let mut h = SymmetricTensor::zeros(n, p);
        for j in 0..p {
            let gr = right_gradient.column_values(j);
            let sheet = h.sheet_mut(j);
            sheet.axpy(right[j], left_hessian.sheet(0));
            sheet.axpy(left[0], right_hessian.sheet(j));
            *sheet += &Matrix::outer(&left_gradient, &gr);
            *sheet += &Matrix::outer(&gr, &left_gradient);
        }
        self.calls.increment();
        Ok(h)
    }

    fn hessian_calls_number(&self) -> u64 {
        self.calls.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{LinearFunction, QuadraticFunction};

    fn scalar_linear(slope: f64) -> Function {
        Function::from_primitive(
            LinearFunction::new(
                Point::zeros(1),
                Point::zeros(1),
                Matrix::from_rows(&[vec![slope]]),
            )
            .unwrap(),
        )
    }

    fn vector_linear() -> Function {
        // x -> (x, 3x)
        Function::from_primitive(
            LinearFunction::new(
                Point::zeros(1),
                Point::zeros(2),
                Matrix::from_rows(&[vec![1.0], vec![3.0]]),
            )
            .unwrap(),
        )
    }

    #[test_log::test]
    fn test_operands_swapped_when_only_right_is_scalar() {
        let scalar = scalar_linear(2.0);
        let vector = vector_linear();
        let p = Function::product(&vector, &scalar).unwrap();
        assert_eq!(p.output_dimension(), 2);
        // (2x) * (x, 3x) at x = 2
        assert_eq!(p.evaluate(&Point::from([2.0])).unwrap(), Point::from([8.0, 24.0]));
        match p.kind() {
            crate::FunctionKind::Product(terms) => assert!(terms.left().ptr_eq(&scalar)),
            _ => panic!("expected a product"),
        }
    }

    #[test]
    fn test_no_scalar_operand_is_rejected() {
        let res = Function::product(&vector_linear(), &vector_linear());
        assert!(matches!(res, Err(FunctionError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_input_dimensions_must_agree() {
        let two_inputs = Function::from_primitive(
            LinearFunction::new(Point::zeros(2), Point::zeros(1), Matrix::zeros(1, 2)).unwrap(),
        );
        let res = Function::product(&scalar_linear(1.0), &two_inputs);
        assert!(matches!(res, Err(FunctionError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_product_gradient_and_hessian() {
        // (2x) * (x^2) = 2x^3 ; f' = 6x^2 ; f'' = 12x
        let square = Function::from_primitive(
            QuadraticFunction::new(
                Point::zeros(1),
                Point::zeros(1),
                Matrix::zeros(1, 1),
                SymmetricTensor::from_sheets(1, vec![Matrix::from_rows(&[vec![2.0]])]),
            )
            .unwrap(),
        );
        let p = Function::product(&scalar_linear(2.0), &square).unwrap();
        let x = Point::from([1.5]);
        assert!((p.evaluate(&x).unwrap()[0] - 6.75).abs() < 1e-12);
        assert!((p.gradient(&x).unwrap()[(0, 0)] - 13.5).abs() < 1e-12);
        assert!((p.hessian(&x).unwrap()[(0, 0, 0)] - 18.0).abs() < 1e-12);
        assert_eq!(p.gradient_calls_number(), 1);
        assert_eq!(p.hessian_calls_number(), 1);
    }

    #[test]
    fn test_structural_equality() {
        let a = scalar_linear(1.0);
        let b = vector_linear();
        let p1 = ProductEvaluation::new(Arc::new(ProductTerms::new(a.clone(), b.clone()).unwrap()));
        let p2 = ProductEvaluation::new(Arc::new(ProductTerms::new(a.clone(), b).unwrap()));
        let p3 = ProductEvaluation::new(Arc::new(
            ProductTerms::new(a, vector_linear()).unwrap(),
        ));
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
    }

    #[test]
    fn test_sample_output_description() {
        let p = Function::product(&scalar_linear(1.0), &vector_linear()).unwrap();
        p.evaluation()
            .set_output_description(Description::from(vec!["u", "v"]))
            .unwrap();
        let ys = p
            .evaluate_sample(&Sample::from_rows(1, vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(ys.description(), &Description::from(vec!["u", "v"]));
        assert_eq!(ys.row(1), &[2.0, 6.0]);
        assert_eq!(p.calls_number(), 2);
    }
}
