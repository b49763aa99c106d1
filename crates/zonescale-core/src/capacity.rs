//! Multi-dimensional capacity quantities.
//!
//! A `CapacityVector` is a set of named, non-negative resource amounts
//! (`memory`, `cpu`, `instances`, ...). Every operation works component-wise
//! across the union of both operands' dimensions, treating a missing
//! dimension as zero.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

/// An immutable multi-dimensional resource quantity.
///
/// Zero-valued dimensions are dropped on construction, so `{memory: 0}` and
/// `{}` are the same vector and compare/hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct CapacityVector {
    dimensions: BTreeMap<String, u64>,
}

impl CapacityVector {
    /// The zero vector.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build a vector from `(dimension, amount)` pairs. Repeated dimensions
    /// are summed.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        let mut dimensions = BTreeMap::new();
        for (name, amount) in pairs {
            *dimensions.entry(name.into()).or_insert(0u64) += amount;
        }
        Self::normalized(dimensions)
    }

    /// Shorthand for a single-dimension vector.
    pub fn single(dimension: impl Into<String>, amount: u64) -> Self {
        Self::from_pairs([(dimension.into(), amount)])
    }

    fn normalized(mut dimensions: BTreeMap<String, u64>) -> Self {
        dimensions.retain(|_, v| *v > 0);
        Self { dimensions }
    }

    /// Amount in `dimension` (zero when absent).
    pub fn get(&self, dimension: &str) -> u64 {
        self.dimensions.get(dimension).copied().unwrap_or(0)
    }

    /// Non-zero dimensions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.dimensions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Combine two vectors dimension by dimension over the union of their
    /// dimension names.
    fn zip_with(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let mut out = BTreeMap::new();
        for name in self.dimensions.keys().chain(other.dimensions.keys()) {
            if out.contains_key(name) {
                continue;
            }
            out.insert(name.clone(), f(self.get(name), other.get(name)));
        }
        Self::normalized(out)
    }

    /// Component-wise sum (saturating).
    pub fn add(&self, other: &Self) -> Self {
        self.zip_with(other, u64::saturating_add)
    }

    /// Component-wise difference, clamped at zero per dimension.
    pub fn subtract_floor_zero(&self, other: &Self) -> Self {
        self.zip_with(other, u64::saturating_sub)
    }

    /// Component-wise minimum.
    pub fn min(&self, other: &Self) -> Self {
        self.zip_with(other, u64::min)
    }

    /// Component-wise maximum.
    pub fn max(&self, other: &Self) -> Self {
        self.zip_with(other, u64::max)
    }

    /// True iff `self` is strictly greater than `other` in every dimension of
    /// the union. Two zero vectors are never greater than one another.
    pub fn greater_than(&self, other: &Self) -> bool {
        let mut names = self.dimensions.keys().chain(other.dimensions.keys()).peekable();
        if names.peek().is_none() {
            return false;
        }
        names.all(|name| self.get(name) > other.get(name))
    }

    /// True iff some dimension of `self` exceeds the same dimension of
    /// `other`; the dimension name is returned.
    pub fn first_exceeding(&self, other: &Self) -> Option<&str> {
        self.iter()
            .find(|(name, amount)| *amount > other.get(name))
            .map(|(name, _)| name)
    }

    /// True iff every dimension is zero.
    pub fn equals_zero(&self) -> bool {
        self.dimensions.is_empty()
    }
}

impl From<BTreeMap<String, u64>> for CapacityVector {
    fn from(dimensions: BTreeMap<String, u64>) -> Self {
        Self::normalized(dimensions)
    }
}

impl From<CapacityVector> for BTreeMap<String, u64> {
    fn from(v: CapacityVector) -> Self {
        v.dimensions
    }
}

impl<'a> Sum<&'a CapacityVector> for CapacityVector {
    fn sum<I: Iterator<Item = &'a CapacityVector>>(iter: I) -> Self {
        iter.fold(CapacityVector::zero(), |acc, v| acc.add(v))
    }
}

impl Sum for CapacityVector {
    fn sum<I: Iterator<Item = CapacityVector>>(iter: I) -> Self {
        iter.fold(CapacityVector::zero(), |acc, v| acc.add(&v))
    }
}

impl fmt::Display for CapacityVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, amount)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}:{amount}")?;
        }
        f.write_str("}")
    }
}
