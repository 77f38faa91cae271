//! Function Composition Algebra
//!
//! Real-valued multivariate functions as composable objects, with value,
//! gradient and Hessian kept mutually consistent however deeply they are
//! nested.
//!
//! # Features
//! - Products, linear combinations, compositions and marginals of functions
//! - Chain-rule gradients and Hessians for every combinator
//! - Flattened parameter vectors with per-node parameter gradients
//! - Call counting and opt-in input/output history on every node
//! - Point/field connections through modal lifting and projection
//! - Save and reload of whole function graphs, shared children included
//!
//! # Usage Examples
//!
//! ```
//! use function_algebra::{Function, LinearFunction, Matrix, Point};
//!
//! // f(x) = 2x, g(x) = x + 1
//! let f = Function::from_primitive(LinearFunction::new(
//!     Point::zeros(1), Point::zeros(1), Matrix::from_rows(&[vec![2.0]]))?);
//! let g = Function::from_primitive(LinearFunction::new(
//!     Point::zeros(1), Point::from([1.0]), Matrix::identity(1))?);
//!
//! let h = Function::compose(&f, &g)?;
//! assert_eq!(h.evaluate(&Point::from([1.0]))?, Point::from([4.0]));
//! assert_eq!(h.gradient(&Point::from([1.0]))?[(0, 0)], 2.0);
//! # Ok::<(), function_algebra::FunctionError>(())
//! ```

mod composition;
mod error;
mod evaluation;
mod field;
mod finite_difference;
mod function;
mod gradient;
mod hessian;
mod instrument;
pub mod linalg;
mod linear_combination;
mod marginal;
mod persistence;
mod primitives;
mod product;

#[cfg(test)]
mod tests;

pub use composition::{CompositionEvaluation, CompositionGradient, CompositionHessian, CompositionTerms};
pub use error::{FunctionError, Result};
pub use evaluation::{Evaluation, EvaluationRef, EvaluationState};
pub use field::{
    FieldToPointFunction, FieldToPointRef, Mesh, ModalLifting, ModalProjection,
    PointToFieldConnection, PointToFieldFunction, PointToFieldRef,
};
pub use finite_difference::{
    CenteredFiniteDifferenceGradient, CenteredFiniteDifferenceHessian, FiniteDifferenceStep,
};
pub use function::{Function, FunctionKind};
pub use gradient::{Gradient, GradientRef};
pub use hessian::{Hessian, HessianRef};
pub use instrument::{CallCounter, CallHistory, Instrumentation};
pub use linalg::{Description, Matrix, Point, Sample, SymmetricTensor};
pub use linear_combination::{
    LinearCombinationEvaluation, LinearCombinationGradient, LinearCombinationHessian,
    LinearCombinationTerms,
};
pub use marginal::{MarginalEvaluation, MarginalGradient, MarginalHessian, MarginalTerms};
pub use persistence::{Advocate, Study};
pub use primitives::{AnalyticalFunction, EvalFn, GradientFn, HessianFn, LinearFunction, QuadraticFunction};
pub use product::{ProductEvaluation, ProductGradient, ProductHessian, ProductTerms};

/// Default centered finite-difference step for gradients
pub const DEFAULT_GRADIENT_EPSILON: f64 = 1e-5;
/// Default centered finite-difference step for Hessians
pub const DEFAULT_HESSIAN_EPSILON: f64 = 1e-4;
