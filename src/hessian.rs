//! The Hessian contract

use crate::error::Result;
use crate::linalg::{Point, SymmetricTensor};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a Hessian node
pub type HessianRef = Arc<dyn Hessian>;

/// Maps a point to one second-derivative sheet per output component
pub trait Hessian: Send + Sync + fmt::Debug {
    fn input_dimension(&self) -> usize;

    fn output_dimension(&self) -> usize;

    /// Entry `(i, j, k)` is `∂²f_k/∂x_i∂x_j`; counts one call
    fn hessian(&self, x: &Point) -> Result<SymmetricTensor>;

    fn hessian_calls_number(&self) -> u64;
}
