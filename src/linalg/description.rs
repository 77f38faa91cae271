use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, Index};

/// Ordered list of component names (inputs, outputs or parameters)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description(Vec<String>);

impl Description {
    pub fn new(names: Vec<String>) -> Self {
        Description(names)
    }

    /// Build `prefix0, prefix1, ...` with `size` entries
    pub fn build_default(size: usize, prefix: &str) -> Self {
        Description((0..size).map(|i| format!("{}{}", prefix, i)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.0.push(name.into());
    }

    /// Append all names of `other`
    pub fn extend(&mut self, other: &Description) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Contiguous sub-description `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Description {
        Description(self.0[start..end].to_vec())
    }

    /// Names at the given positions, in the given order
    pub fn select(&self, indices: &[usize]) -> Description {
        Description(indices.iter().map(|&i| self.0[i].clone()).collect())
    }

    /// Concatenation `self ++ other`
    pub fn concat(&self, other: &Description) -> Description {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for Description {
    type Target = [String];
    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl Index<usize> for Description {
    type Output = String;
    fn index(&self, i: usize) -> &String {
        &self.0[i]
    }
}

impl<S: Into<String>> FromIterator<S> for Description {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Description(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<&str>> for Description {
    fn from(names: Vec<&str>) -> Self {
        names.into_iter().collect()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}
