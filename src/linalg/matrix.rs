use super::Point;
use crate::error::{FunctionError, check_dimension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul};

/// Dense row-major matrix.
///
/// Gradients use the `input_dimension × output_dimension` layout:
/// entry `(i, j)` is `∂f_j/∂x_i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = FunctionError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        let expected = raw
            .rows
            .checked_mul(raw.columns)
            .ok_or_else(|| FunctionError::configuration("matrix shape overflows"))?;
        check_dimension("matrix data", expected, raw.data.len())?;
        Ok(Matrix {
            rows: raw.rows,
            columns: raw.columns,
            data: raw.data,
        })
    }
}

impl Matrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Matrix {
            rows,
            columns,
            data: vec![0.0; rows * columns],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Build from row vectors; all rows must share one length
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let columns = rows.first().map_or(0, Vec::len);
        let mut m = Self::zeros(rows.len(), columns);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), columns, "ragged matrix rows");
            m.data[i * columns..(i + 1) * columns].copy_from_slice(row);
        }
        m
    }

    /// Single column matrix holding `p`
    pub fn column(p: &[f64]) -> Self {
        Matrix {
            rows: p.len(),
            columns: 1,
            data: p.to_vec(),
        }
    }

    pub fn nb_rows(&self) -> usize {
        self.rows
    }

    pub fn nb_columns(&self) -> usize {
        self.columns
    }

    /// Entries in row-major order
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn transpose(&self) -> Matrix {
        let mut t = Matrix::zeros(self.columns, self.rows);
        for i in 0..self.rows {
            for j in 0..self.columns {
                t[(j, i)] = self[(i, j)];
            }
        }
        t
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.columns..(i + 1) * self.columns]
    }

    pub fn column_values(&self, j: usize) -> Point {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    /// Columns at the given positions, in the given order
    pub fn select_columns(&self, indices: &[usize]) -> Matrix {
        let mut m = Matrix::zeros(self.rows, indices.len());
        for i in 0..self.rows {
            for (k, &j) in indices.iter().enumerate() {
                m[(i, k)] = self[(i, j)];
            }
        }
        m
    }

    /// Stack `other` below `self`; column counts must agree
    pub fn stack_rows(&self, other: &Matrix) -> Matrix {
        assert!(
            self.rows == 0 || other.rows == 0 || self.columns == other.columns,
            "cannot stack matrices with different column counts"
        );
        let columns = if self.rows == 0 { other.columns } else { self.columns };
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        Matrix {
            rows: self.rows + other.rows,
            columns,
            data,
        }
    }

    /// `self * v` for a vector `v` of length `nb_columns`
    pub fn mul_vec(&self, v: &[f64]) -> Point {
        assert_eq!(v.len(), self.columns, "matrix/vector dimensions differ");
        (0..self.rows)
            .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// `selfᵀ * v` for a vector `v` of length `nb_rows`
    pub fn transpose_mul_vec(&self, v: &[f64]) -> Point {
        assert_eq!(v.len(), self.rows, "matrix/vector dimensions differ");
        let mut out = Point::zeros(self.columns);
        for (i, &vi) in v.iter().enumerate() {
            out.axpy(vi, self.row(i));
        }
        out
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f64, other: &Matrix) {
        assert_eq!((self.rows, self.columns), (other.rows, other.columns), "matrix shapes differ");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += alpha * b;
        }
    }

    pub fn scaled(&self, alpha: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            columns: self.columns,
            data: self.data.iter().map(|v| v * alpha).collect(),
        }
    }

    /// Outer product `a bᵀ`
    pub fn outer(a: &[f64], b: &[f64]) -> Matrix {
        let mut m = Matrix::zeros(a.len(), b.len());
        for (i, ai) in a.iter().enumerate() {
            for (j, bj) in b.iter().enumerate() {
                m[(i, j)] = ai * bj;
            }
        }
        m
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.rows == self.columns
            && (0..self.rows)
                .all(|i| (0..i).all(|j| (self[(i, j)] - self[(j, i)]).abs() <= tolerance))
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|v| *v == 0.0)
    }

    pub fn max_abs_diff(&self, other: &Matrix) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.columns + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.columns + j]
    }
}

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;
    fn mul(self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.columns, rhs.rows, "matrix product dimensions differ");
        let mut out = Matrix::zeros(self.rows, rhs.columns);
        for i in 0..self.rows {
            for k in 0..self.columns {
                let a = self[(i, k)];
                if a == 0.0 {
                    continue;
                }
                for j in 0..rhs.columns {
                    out[(i, j)] += a * rhs[(k, j)];
                }
            }
        }
        out
    }
}

impl Add<&Matrix> for &Matrix {
    type Output = Matrix;
    fn add(self, rhs: &Matrix) -> Matrix {
        let mut out = self.clone();
        out.axpy(1.0, rhs);
        out
    }
}

impl AddAssign<&Matrix> for Matrix {
    fn add_assign(&mut self, rhs: &Matrix) {
        self.axpy(1.0, rhs);
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", Point::from(self.row(i)))?;
        }
        write!(f, "]")
    }
}
