use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Deref, DerefMut, Mul, MulAssign, Sub};

/// A vector of real values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point(Vec<f64>);

impl Point {
    /// Point of the given dimension filled with `value`
    pub fn new(dimension: usize, value: f64) -> Self {
        Point(vec![value; dimension])
    }

    pub fn zeros(dimension: usize) -> Self {
        Self::new(dimension, 0.0)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Append the components of `other`
    pub fn extend(&mut self, other: &Point) {
        self.0.extend_from_slice(&other.0);
    }

    /// Components at the given positions, in the given order
    pub fn select(&self, indices: &[usize]) -> Point {
        Point(indices.iter().map(|&i| self.0[i]).collect())
    }

    pub fn norm(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f64, other: &[f64]) {
        debug_assert_eq!(self.0.len(), other.len());
        for (a, b) in self.0.iter_mut().zip(other) {
            *a += alpha * b;
        }
    }
}

impl From<Vec<f64>> for Point {
    fn from(values: Vec<f64>) -> Self {
        Point(values)
    }
}

impl From<&[f64]> for Point {
    fn from(values: &[f64]) -> Self {
        Point(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Point {
    fn from(values: [f64; N]) -> Self {
        Point(values.to_vec())
    }
}

impl FromIterator<f64> for Point {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Point(iter.into_iter().collect())
    }
}

impl Deref for Point {
    type Target = [f64];
    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl DerefMut for Point {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

impl Add<&Point> for &Point {
    type Output = Point;
    fn add(self, rhs: &Point) -> Point {
        assert_eq!(self.dimension(), rhs.dimension(), "point dimensions differ");
        self.0.iter().zip(&rhs.0).map(|(a, b)| a + b).collect()
    }
}

impl Sub<&Point> for &Point {
    type Output = Point;
    fn sub(self, rhs: &Point) -> Point {
        assert_eq!(self.dimension(), rhs.dimension(), "point dimensions differ");
        self.0.iter().zip(&rhs.0).map(|(a, b)| a - b).collect()
    }
}

impl AddAssign<&Point> for Point {
    fn add_assign(&mut self, rhs: &Point) {
        self.axpy(1.0, rhs);
    }
}

impl Mul<f64> for &Point {
    type Output = Point;
    fn mul(self, scalar: f64) -> Point {
        self.0.iter().map(|v| v * scalar).collect()
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(mut self, scalar: f64) -> Point {
        self *= scalar;
        self
    }
}

impl MulAssign<f64> for Point {
    fn mul_assign(&mut self, scalar: f64) {
        self.0.iter_mut().for_each(|v| *v *= scalar);
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}
