use super::{Description, Point};
use crate::error::{FunctionError, check_dimension};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A batch of points sharing one dimension, stored row-major
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSample")]
pub struct Sample {
    size: usize,
    dimension: usize,
    data: Vec<f64>,
    description: Description,
}

#[derive(Deserialize)]
struct RawSample {
    size: usize,
    dimension: usize,
    data: Vec<f64>,
    #[serde(default)]
    description: Description,
}

impl TryFrom<RawSample> for Sample {
    type Error = FunctionError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        let expected = raw
            .size
            .checked_mul(raw.dimension)
            .ok_or_else(|| FunctionError::configuration("sample shape overflows"))?;
        check_dimension("sample data", expected, raw.data.len())?;
        Ok(Sample {
            size: raw.size,
            dimension: raw.dimension,
            data: raw.data,
            description: raw.description,
        })
    }
}

impl Sample {
    /// Sample of `size` points of `dimension` components, all zero
    pub fn zeros(size: usize, dimension: usize) -> Self {
        Sample {
            size,
            dimension,
            data: vec![0.0; size * dimension],
            description: Description::default(),
        }
    }

    /// Empty sample of the given dimension, ready to be pushed into
    pub fn empty(dimension: usize) -> Self {
        Self::zeros(0, dimension)
    }

    pub fn from_points(dimension: usize, points: &[Point]) -> Self {
        let mut sample = Self::empty(dimension);
        for p in points {
            sample.push(p);
        }
        sample
    }

    /// Build from row-major data; `data.len()` must be a multiple of `dimension`
    pub fn from_rows(dimension: usize, data: Vec<f64>) -> Self {
        assert!(
            (dimension == 0 && data.is_empty()) || (dimension > 0 && data.len() % dimension == 0),
            "row data does not match the sample dimension"
        );
        let size = if dimension == 0 { 0 } else { data.len() / dimension };
        Sample {
            size,
            dimension,
            data,
            description: Description::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn point(&self, i: usize) -> Point {
        Point::from(self.row(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on zero chunk size
        let dim = self.dimension.max(1);
        self.data.chunks_exact(dim).take(self.size)
    }

    pub fn push(&mut self, point: &[f64]) {
        assert_eq!(point.len(), self.dimension, "point dimension differs from sample dimension");
        self.data.extend_from_slice(point);
        self.size += 1;
    }

    /// Append all points of `other`
    pub fn append(&mut self, other: &Sample) {
        assert_eq!(other.dimension, self.dimension, "sample dimensions differ");
        self.data.extend_from_slice(&other.data);
        self.size += other.size;
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn set_description(&mut self, description: Description) {
        self.description = description;
    }

    /// Columns at the given positions, in the given order
    pub fn select_columns(&self, indices: &[usize]) -> Sample {
        let mut out = Sample::empty(indices.len());
        for row in self.rows() {
            let selected: Vec<f64> = indices.iter().map(|&j| row[j]).collect();
            out.push(&selected);
        }
        out
    }

    /// Flat row-major values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        for (i, row) in self.rows().enumerate() {
            writeln!(f, "{}: {}", i, Point::from(row))?;
        }
        Ok(())
    }
}
