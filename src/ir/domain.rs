//! Rectangular iteration domains with symbolic bounds.

use crate::utils::errors::{DimensionError, DimensionErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A box `lower_d <= x_d <= upper_d` per dimension.
///
/// Bounds are opaque affine expressions that only the polyhedral engine
/// interprets, e.g. `"0"` and `"N+M"`. Every free name they use must appear
/// in the symbol set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectangularDomain {
    bounds: Vec<(String, String)>,
    symbols: BTreeSet<String>,
}

impl RectangularDomain {
    /// Create a domain from `(lower, upper)` pairs and the symbols they use.
    #[track_caller]
    pub fn new<B, L, U, S>(bounds: B, symbols: S) -> Result<Self, DimensionError>
    where
        B: IntoIterator<Item = (L, U)>,
        L: Into<String>,
        U: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let bounds: Vec<(String, String)> = bounds
            .into_iter()
            .map(|(l, u)| (l.into(), u.into()))
            .collect();
        if bounds.is_empty() {
            return Err(DimensionError::new(
                DimensionErrorKind::InvalidDomain,
                "Cannot have domain with fewer than one dimension",
            ));
        }
        if let Some(d) = bounds
            .iter()
            .position(|(l, u)| l.trim().is_empty() || u.trim().is_empty())
        {
            return Err(DimensionError::new(
                DimensionErrorKind::InvalidDomain,
                format!("Bound of dimension {} is empty", d),
            ));
        }
        Ok(Self {
            bounds,
            symbols: symbols.into_iter().map(Into::into).collect(),
        })
    }

    /// A one-dimensional domain without symbols.
    #[track_caller]
    pub fn single(
        lower: impl Into<String>,
        upper: impl Into<String>,
    ) -> Result<Self, DimensionError> {
        Self::new([(lower.into(), upper.into())], Vec::<String>::new())
    }

    /// Concatenate `other`'s dimensions after ours and union the symbols.
    pub fn append(&mut self, other: &RectangularDomain) {
        self.bounds.extend(other.bounds.iter().cloned());
        self.symbols.extend(other.symbols.iter().cloned());
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    /// Number of symbols.
    pub fn symbolics(&self) -> usize {
        self.symbols.len()
    }

    pub fn lower_bound(&self, dimension: usize) -> Option<&str> {
        self.bounds.get(dimension).map(|(l, _)| l.as_str())
    }

    pub fn upper_bound(&self, dimension: usize) -> Option<&str> {
        self.bounds.get(dimension).map(|(_, u)| u.as_str())
    }

    /// `(lower, upper)` pairs in dimension order.
    pub fn bounds(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bounds.iter().map(|(l, u)| (l.as_str(), u.as_str()))
    }

    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }
}
