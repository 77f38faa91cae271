//! The gradient (Jacobian) contract

use crate::error::Result;
use crate::linalg::{Matrix, Point};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a gradient node
pub type GradientRef = Arc<dyn Gradient>;

/// Maps a point to its `input_dimension × output_dimension` Jacobian
pub trait Gradient: Send + Sync + fmt::Debug {
    fn input_dimension(&self) -> usize;

    fn output_dimension(&self) -> usize;

    /// Entry `(i, j)` is `∂f_j/∂x_i`; counts one call
    fn gradient(&self, x: &Point) -> Result<Matrix>;

    fn gradient_calls_number(&self) -> u64;
}
