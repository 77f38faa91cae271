//! Error taxonomy for function construction and evaluation
//!
//! Every error here is an invalid-usage error surfaced immediately: a node
//! either refuses to be built or refuses a call before touching any state.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FunctionError>;

/// Errors raised by function nodes, combinators and persistence
#[derive(Debug, Error)]
pub enum FunctionError {
    /// A dimension (point, sample, child, coefficient or parameter count)
    /// does not match the expected one
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        got: usize,
    },

    /// The requested combination cannot be built from the given children
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An index (output component, input variable) is out of range
    #[error("Index {index} out of bounds (bound {bound})")]
    IndexOutOfBounds { index: usize, bound: usize },

    /// No derivative is available for the requested order
    #[error("Not differentiable: {0}")]
    NotDifferentiable(String),

    /// Malformed or incomplete persisted data
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl FunctionError {
    /// Create a DimensionMismatch error
    pub fn dimension(context: impl Into<String>, expected: usize, got: usize) -> Self {
        FunctionError::DimensionMismatch {
            context: context.into(),
            expected,
            got,
        }
    }

    /// Create an InvalidConfiguration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        FunctionError::InvalidConfiguration(msg.into())
    }

    /// Create a Persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        FunctionError::Persistence(msg.into())
    }
}

/// Fail with DimensionMismatch unless `got == expected`
pub(crate) fn check_dimension(context: &str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(FunctionError::dimension(context, expected, got))
    }
}

/// Fail with IndexOutOfBounds unless every index is below `bound`
pub(crate) fn check_indices(indices: &[usize], bound: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= bound) {
        Some(&index) => Err(FunctionError::IndexOutOfBounds { index, bound }),
        None => Ok(()),
    }
}
