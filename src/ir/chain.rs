//! Loop nests and the chains they form.

use super::access::{Dataspace, Tuple};
use super::domain::RectangularDomain;
use crate::utils::errors::{ConfigError, ConfigErrorKind, DimensionError};
use serde::{Deserialize, Serialize};

/// One loop nest: an iteration domain and the arrays its body touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopNest {
    domain: RectangularDomain,
    dataspaces: Vec<Dataspace>,
}

impl LoopNest {
    /// A nest with no recorded accesses.
    pub fn new(domain: RectangularDomain) -> Self {
        Self {
            domain,
            dataspaces: Vec::new(),
        }
    }

    pub fn with_dataspaces(domain: RectangularDomain, dataspaces: Vec<Dataspace>) -> Self {
        Self { domain, dataspaces }
    }

    pub fn domain(&self) -> &RectangularDomain {
        &self.domain
    }

    pub fn dataspaces(&self) -> &[Dataspace] {
        &self.dataspaces
    }

    /// Dataspace with the given array name.
    pub fn dataspace(&self, name: &str) -> Option<&Dataspace> {
        self.dataspaces.iter().find(|d| d.name() == name)
    }

    /// Number of iteration dimensions.
    pub fn dimensions(&self) -> usize {
        self.domain.dimensions()
    }

    pub fn replace_dataspaces(&mut self, dataspaces: Vec<Dataspace>) {
        self.dataspaces = dataspaces;
    }

    /// Move every read and write offset by `extent`.
    #[track_caller]
    pub fn shift_dataspaces(&mut self, extent: &Tuple) -> Result<(), DimensionError> {
        let shifted = self
            .dataspaces
            .iter()
            .map(|d| d.shifted(extent))
            .collect::<Result<Vec<_>, _>>()?;
        self.dataspaces = shifted;
        Ok(())
    }
}

/// An ordered sequence of loop nests executed one after another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopChain {
    nests: Vec<LoopNest>,
}

impl LoopChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, nest: LoopNest) {
        self.nests.push(nest);
    }

    pub fn nest(&self, index: usize) -> Option<&LoopNest> {
        self.nests.get(index)
    }

    pub fn nest_mut(&mut self, index: usize) -> Option<&mut LoopNest> {
        self.nests.get_mut(index)
    }

    /// Like [`LoopChain::nest`], failing with an unknown-loop error.
    #[track_caller]
    pub fn nest_checked(&self, index: usize) -> Result<&LoopNest, ConfigError> {
        self.nests.get(index).ok_or_else(|| {
            ConfigError::new(
                ConfigErrorKind::UnknownLoop,
                format!("Loop {} is not part of a chain of {} loops", index, self.nests.len()),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.nests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nests.is_empty()
    }

    /// Widest nest dimensionality, zero for an empty chain.
    pub fn max_dimension(&self) -> usize {
        self.nests.iter().map(LoopNest::dimensions).max().unwrap_or(0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoopNest> {
        self.nests.iter()
    }
}

impl FromIterator<LoopNest> for LoopChain {
    fn from_iter<I: IntoIterator<Item = LoopNest>>(iter: I) -> Self {
        Self {
            nests: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LoopChain {
    type Item = &'a LoopNest;
    type IntoIter = std::slice::Iter<'a, LoopNest>;

    fn into_iter(self) -> Self::IntoIter {
        self.nests.iter()
    }
}
