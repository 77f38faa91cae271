//! The evaluation contract shared by primitives and combinators
//!
//! Combinators hold their children as `EvaluationRef` handles and never look
//! at the concrete type behind them.

use crate::error::{FunctionError, Result, check_dimension, check_indices};
use crate::instrument::Instrumentation;
use crate::linalg::{Description, Matrix, Point, Sample};
use crate::persistence::Advocate;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an evaluation node
pub type EvaluationRef = Arc<dyn Evaluation>;

/// Mutable state every evaluation node carries: its description and its
/// call instrumentation
#[derive(Debug)]
pub struct EvaluationState {
    description: RwLock<Description>,
    instrumentation: Instrumentation,
}

impl EvaluationState {
    /// `description` holds the input names followed by the output names
    pub fn new(input_dimension: usize, output_dimension: usize, description: Description) -> Self {
        debug_assert_eq!(description.len(), input_dimension + output_dimension);
        EvaluationState {
            description: RwLock::new(description),
            instrumentation: Instrumentation::new(input_dimension, output_dimension),
        }
    }

    /// State with `x0..` / `y0..` default names
    pub fn with_default_description(input_dimension: usize, output_dimension: usize) -> Self {
        let description = Description::build_default(input_dimension, "x")
            .concat(&Description::build_default(output_dimension, "y"));
        Self::new(input_dimension, output_dimension, description)
    }

    pub fn description(&self) -> Description {
        self.description.read().clone()
    }

    pub fn set_description(&self, description: Description, expected: usize) -> Result<()> {
        check_dimension("description", expected, description.len())?;
        *self.description.write() = description;
        Ok(())
    }

    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }
}

/// A map from points of a fixed input dimension to points of a fixed output
/// dimension.
///
/// Implementors supply the numeric work and the dimension/parameter
/// accessors; description, call counting and history are provided on top of
/// [`EvaluationState`].
pub trait Evaluation: Send + Sync + fmt::Debug + fmt::Display {
    /// Name under which the node is persisted
    fn class_name(&self) -> &'static str;

    fn input_dimension(&self) -> usize;

    fn output_dimension(&self) -> usize;

    /// Evaluate at one point; counts one call
    fn evaluate(&self, x: &Point) -> Result<Point>;

    /// Evaluate at every point of `xs`; counts `xs.size()` calls
    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample>;

    fn state(&self) -> &EvaluationState;

    /// Input names followed by output names
    fn description(&self) -> Description {
        self.state().description()
    }

    fn set_description(&self, description: Description) -> Result<()> {
        self.state()
            .set_description(description, self.input_dimension() + self.output_dimension())
    }

    fn input_description(&self) -> Description {
        self.description().slice(0, self.input_dimension())
    }

    fn output_description(&self) -> Description {
        let n = self.input_dimension();
        self.description().slice(n, n + self.output_dimension())
    }

    fn set_input_description(&self, names: Description) -> Result<()> {
        check_dimension("input description", self.input_dimension(), names.len())?;
        self.set_description(names.concat(&self.output_description()))
    }

    fn set_output_description(&self, names: Description) -> Result<()> {
        check_dimension("output description", self.output_dimension(), names.len())?;
        self.set_description(self.input_description().concat(&names))
    }

    fn parameter(&self) -> Point {
        Point::default()
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        check_dimension("parameter", 0, parameter.dimension())
    }

    fn parameter_description(&self) -> Description {
        Description::default()
    }

    /// `∂f/∂p` as a `parameter_dimension × output_dimension` matrix
    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.input_dimension(), x)?;
        Ok(Matrix::zeros(self.parameter().dimension(), self.output_dimension()))
    }

    fn calls_number(&self) -> u64 {
        self.state().instrumentation().calls()
    }

    fn enable_history(&self) {
        self.state().instrumentation().history().enable();
    }

    fn disable_history(&self) {
        self.state().instrumentation().history().disable();
    }

    fn is_history_enabled(&self) -> bool {
        self.state().instrumentation().history().is_enabled()
    }

    fn clear_history(&self) {
        self.state().instrumentation().history().clear();
    }

    fn input_history(&self) -> Sample {
        let mut s = self.state().instrumentation().history().inputs();
        s.set_description(self.input_description());
        s
    }

    fn output_history(&self) -> Sample {
        let mut s = self.state().instrumentation().history().outputs();
        s.set_description(self.output_description());
        s
    }

    fn is_linear(&self) -> bool {
        false
    }

    /// Whether the function is linear with respect to input variable `index`
    fn is_linearly_dependent(&self, index: usize) -> Result<bool> {
        check_indices(&[index], self.input_dimension())?;
        Ok(self.is_linear())
    }

    /// Store the node's attributes
    fn save(&self, _adv: &mut Advocate<'_>) -> Result<()> {
        Err(FunctionError::persistence(format!(
            "{} cannot be saved",
            self.class_name()
        )))
    }
}

pub(crate) fn check_input(input_dimension: usize, x: &Point) -> Result<()> {
    check_dimension("evaluation input", input_dimension, x.dimension())
}

pub(crate) fn check_sample(input_dimension: usize, xs: &Sample) -> Result<()> {
    check_dimension("evaluation sample", input_dimension, xs.dimension())
}

/// Apply `f` to every row of `xs`, preserving row order.
///
/// With the `parallel` feature the rows are spread over the rayon pool.
pub(crate) fn map_rows<F>(xs: &Sample, output_dimension: usize, f: F) -> Result<Sample>
where
    F: Fn(&[f64]) -> Result<Point> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    let points: Vec<Point> = {
        use rayon::prelude::*;
        (0..xs.size())
            .into_par_iter()
            .map(|i| f(xs.row(i)))
            .collect::<Result<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let points: Vec<Point> = xs.rows().map(&f).collect::<Result<_>>()?;

    let mut out = Sample::empty(output_dimension);
    for p in &points {
        check_dimension("evaluation output", output_dimension, p.dimension())?;
        out.push(p);
    }
    Ok(out)
}

/// Apply `f(row_index, row)` to every row of `sample` in place
pub(crate) fn update_rows<F>(sample: &mut Sample, f: F)
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    let dim = sample.dimension();
    if dim == 0 {
        return;
    }
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        sample
            .as_mut_slice()
            .par_chunks_mut(dim)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    }
    #[cfg(not(feature = "parallel"))]
    sample
        .as_mut_slice()
        .chunks_mut(dim)
        .enumerate()
        .for_each(|(i, row)| f(i, row));
}
