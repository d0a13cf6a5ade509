//! Core type definitions.

use crate::distance;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Unique identifier for a vector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorKey(pub String);

impl VectorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for VectorKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for VectorKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VectorKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&String> for VectorKey {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

/// Coordinates of a vector, either dense or sparse.
///
/// The *support* of a value set is the set of indices it stores: every index
/// for dense values, the explicit entries for sparse values. Indices outside
/// the support read as `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorValues {
    Dense(Vec<f32>),
    Sparse(BTreeMap<usize, f32>),
}

impl VectorValues {
    /// Value at `index`, `0.0` when the index is not stored.
    pub fn get(&self, index: usize) -> f32 {
        match self {
            VectorValues::Dense(values) => values.get(index).copied().unwrap_or(0.0),
            VectorValues::Sparse(entries) => entries.get(&index).copied().unwrap_or(0.0),
        }
    }

    /// Number of stored indices.
    pub fn support_len(&self) -> usize {
        match self {
            VectorValues::Dense(values) => values.len(),
            VectorValues::Sparse(entries) => entries.len(),
        }
    }

    /// Whether `index` is part of the support.
    pub fn contains(&self, index: usize) -> bool {
        match self {
            VectorValues::Dense(values) => index < values.len(),
            VectorValues::Sparse(entries) => entries.contains_key(&index),
        }
    }

    /// Stored `(index, value)` pairs in ascending index order.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (usize, f32)> + '_> {
        match self {
            VectorValues::Dense(values) => Box::new(values.iter().copied().enumerate()),
            VectorValues::Sparse(entries) => Box::new(entries.iter().map(|(&i, &v)| (i, v))),
        }
    }

    /// Indices holding a non-zero value.
    pub fn nonzero_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries()
            .filter(|&(_, value)| value != 0.0)
            .map(|(index, _)| index)
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, VectorValues::Dense(_))
    }

    /// Dense slice if the values are stored densely.
    pub fn as_dense(&self) -> Option<&[f32]> {
        match self {
            VectorValues::Dense(values) => Some(values),
            VectorValues::Sparse(_) => None,
        }
    }

    /// Dot product with a dense direction.
    ///
    /// Sparse entries beyond the direction's length contribute nothing.
    pub fn dot(&self, direction: &[f32]) -> f32 {
        match self {
            VectorValues::Dense(values) => distance::dot_product(values, direction),
            VectorValues::Sparse(entries) => distance::sparse_dot_product(entries, direction),
        }
    }

    /// Smallest dimension able to hold these values.
    fn min_dimension(&self) -> usize {
        match self {
            VectorValues::Dense(values) => values.len(),
            VectorValues::Sparse(entries) => {
                entries.keys().next_back().map(|&i| i + 1).unwrap_or(0)
            }
        }
    }

    /// Check the values against `dimension`.
    pub fn validate(&self, dimension: usize) -> CoreResult<()> {
        if dimension == 0 {
            return Err(CoreError::InvalidVector("dimension must be > 0".into()));
        }
        match self {
            VectorValues::Dense(values) => {
                if values.len() != dimension {
                    return Err(CoreError::DimensionMismatch {
                        expected: dimension,
                        got: values.len(),
                    });
                }
            }
            VectorValues::Sparse(_) => {
                let needed = self.min_dimension();
                if needed > dimension {
                    return Err(CoreError::InvalidVector(format!(
                        "sparse index {} out of range for dimension {}",
                        needed - 1,
                        dimension
                    )));
                }
            }
        }
        if let Some((index, value)) = self.entries().find(|(_, v)| !v.is_finite()) {
            return Err(CoreError::InvalidVector(format!(
                "non-finite value {} at index {}",
                value, index
            )));
        }
        Ok(())
    }
}

impl From<Vec<f32>> for VectorValues {
    fn from(values: Vec<f32>) -> Self {
        VectorValues::Dense(values)
    }
}

impl From<&[f32]> for VectorValues {
    fn from(values: &[f32]) -> Self {
        VectorValues::Dense(values.to_vec())
    }
}

impl<const N: usize> From<[f32; N]> for VectorValues {
    fn from(values: [f32; N]) -> Self {
        VectorValues::Dense(values.to_vec())
    }
}

impl From<BTreeMap<usize, f32>> for VectorValues {
    fn from(entries: BTreeMap<usize, f32>) -> Self {
        VectorValues::Sparse(entries)
    }
}

impl From<HashMap<usize, f32>> for VectorValues {
    fn from(entries: HashMap<usize, f32>) -> Self {
        VectorValues::Sparse(entries.into_iter().collect())
    }
}

/// A keyed, fixed-dimension point.
///
/// Vectors are immutable once built; every constructor validates the
/// coordinates against the dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vector {
    key: VectorKey,
    dimension: usize,
    values: VectorValues,
}

impl Vector {
    /// Build a vector with an explicit dimension.
    pub fn new(
        key: impl Into<VectorKey>,
        dimension: usize,
        values: impl Into<VectorValues>,
    ) -> CoreResult<Self> {
        let values = values.into();
        values.validate(dimension)?;
        Ok(Self {
            key: key.into(),
            dimension,
            values,
        })
    }

    /// Build a dense vector; the dimension is the number of values.
    pub fn dense(key: impl Into<VectorKey>, values: Vec<f32>) -> CoreResult<Self> {
        let dimension = values.len();
        Self::new(key, dimension, VectorValues::Dense(values))
    }

    /// Build a sparse vector from `(index, value)` entries.
    pub fn sparse(
        key: impl Into<VectorKey>,
        dimension: usize,
        entries: impl IntoIterator<Item = (usize, f32)>,
    ) -> CoreResult<Self> {
        let entries: BTreeMap<usize, f32> = entries.into_iter().collect();
        Self::new(key, dimension, VectorValues::Sparse(entries))
    }

    pub fn key(&self) -> &VectorKey {
        &self.key
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn values(&self) -> &VectorValues {
        &self.values
    }

    pub fn get(&self, index: usize) -> f32 {
        self.values.get(index)
    }

    pub fn is_sparse(&self) -> bool {
        !self.values.is_dense()
    }

    /// Project onto a dense direction of the same dimension.
    pub fn dot(&self, direction: &[f32]) -> f32 {
        debug_assert_eq!(direction.len(), self.dimension, "Vector dimensions must match");
        self.values.dot(direction)
    }
}
