use super::Matrix;
use crate::error::{FunctionError, check_dimension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Stack of symmetric `n × n` matrices, one sheet per output component.
///
/// Entry `(i, j, k)` is `∂²f_k/∂x_i∂x_j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSymmetricTensor")]
pub struct SymmetricTensor {
    size: usize,
    sheets: Vec<Matrix>,
}

#[derive(Deserialize)]
struct RawSymmetricTensor {
    size: usize,
    sheets: Vec<Matrix>,
}

impl TryFrom<RawSymmetricTensor> for SymmetricTensor {
    type Error = FunctionError;

    fn try_from(raw: RawSymmetricTensor) -> Result<Self, Self::Error> {
        for sheet in &raw.sheets {
            check_dimension("tensor sheet rows", raw.size, sheet.nb_rows())?;
            check_dimension("tensor sheet columns", raw.size, sheet.nb_columns())?;
        }
        Ok(SymmetricTensor {
            size: raw.size,
            sheets: raw.sheets,
        })
    }
}

impl SymmetricTensor {
    pub fn zeros(size: usize, nb_sheets: usize) -> Self {
        SymmetricTensor {
            size,
            sheets: vec![Matrix::zeros(size, size); nb_sheets],
        }
    }

    /// Build from square sheets of equal size
    pub fn from_sheets(size: usize, sheets: Vec<Matrix>) -> Self {
        for s in &sheets {
            assert_eq!((s.nb_rows(), s.nb_columns()), (size, size), "sheet is not {size}x{size}");
        }
        SymmetricTensor { size, sheets }
    }

    /// Row/column dimension of each sheet (the input dimension)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn nb_sheets(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, k: usize) -> &Matrix {
        &self.sheets[k]
    }

    pub fn sheet_mut(&mut self, k: usize) -> &mut Matrix {
        &mut self.sheets[k]
    }

    /// Sheets at the given positions, in the given order
    pub fn select_sheets(&self, indices: &[usize]) -> SymmetricTensor {
        SymmetricTensor {
            size: self.size,
            sheets: indices.iter().map(|&k| self.sheets[k].clone()).collect(),
        }
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f64, other: &SymmetricTensor) {
        assert_eq!(
            (self.size, self.sheets.len()),
            (other.size, other.sheets.len()),
            "tensor shapes differ"
        );
        for (a, b) in self.sheets.iter_mut().zip(&other.sheets) {
            a.axpy(alpha, b);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.sheets.iter().all(Matrix::is_zero)
    }

    pub fn max_abs_diff(&self, other: &SymmetricTensor) -> f64 {
        self.sheets
            .iter()
            .zip(&other.sheets)
            .map(|(a, b)| a.max_abs_diff(b))
            .fold(0.0, f64::max)
    }
}

impl Index<(usize, usize, usize)> for SymmetricTensor {
    type Output = f64;
    fn index(&self, (i, j, k): (usize, usize, usize)) -> &f64 {
        &self.sheets[k][(i, j)]
    }
}

impl IndexMut<(usize, usize, usize)> for SymmetricTensor {
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut f64 {
        &mut self.sheets[k][(i, j)]
    }
}

impl fmt::Display for SymmetricTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (k, s) in self.sheets.iter().enumerate() {
            if k > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}
