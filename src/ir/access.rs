//! Access summaries: integer offset tuples, sets of them, and dataspaces.
//!
//! A [`Dataspace`] records which offsets (relative to a statement's own
//! iterator) the statement reads from and writes to one named array. The
//! automatic shift transformation derives its legality constraints from these.

use crate::utils::errors::{DimensionError, DimensionErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A fixed-length vector of signed integers, ordered lexicographically.
///
/// Tuples of different lengths order by length first, so a set of tuples of
/// mixed widths still has a total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    values: Vec<i64>,
}

impl Tuple {
    /// Create a tuple from its components.
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }

    /// The all-zero tuple of the given width.
    pub fn zeros(dimensions: usize) -> Self {
        Self::new(vec![0; dimensions])
    }

    /// Number of components.
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// True if every component is zero.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    /// Component at `index`.
    pub fn get(&self, index: usize) -> Option<i64> {
        self.values.get(index).copied()
    }

    /// Borrow the components.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Iterate over the components.
    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.values.iter()
    }

    /// Component-wise sum, failing on a width mismatch or overflow.
    #[track_caller]
    pub fn checked_add(&self, that: &Tuple) -> Result<Tuple, DimensionError> {
        self.zip_with(that, i64::checked_add)
    }

    /// Component-wise difference, failing on a width mismatch or overflow.
    #[track_caller]
    pub fn checked_sub(&self, that: &Tuple) -> Result<Tuple, DimensionError> {
        self.zip_with(that, i64::checked_sub)
    }

    /// Component-wise negation, failing on overflow.
    #[track_caller]
    pub fn checked_neg(&self) -> Result<Tuple, DimensionError> {
        self.values
            .iter()
            .map(|v| v.checked_neg().ok_or_else(|| overflow(self, "negating")))
            .collect::<Result<Vec<i64>, _>>()
            .map(Tuple::new)
    }

    #[track_caller]
    fn zip_with(
        &self,
        that: &Tuple,
        op: impl Fn(i64, i64) -> Option<i64>,
    ) -> Result<Tuple, DimensionError> {
        if self.dimensions() != that.dimensions() {
            return Err(DimensionError::new(
                DimensionErrorKind::TupleMismatch,
                format!(
                    "Tuples are of different dimensionality {} {}",
                    self.dimensions(),
                    that.dimensions()
                ),
            ));
        }
        self.values
            .iter()
            .zip(that.values.iter())
            .map(|(&a, &b)| op(a, b).ok_or_else(|| overflow(self, "combining")))
            .collect::<Result<Vec<i64>, _>>()
            .map(Tuple::new)
    }

    /// Render as an expression list usable as shift extents.
    pub fn to_extents(&self) -> Vec<String> {
        self.values.iter().map(|v| v.to_string()).collect()
    }
}

#[track_caller]
fn overflow(tuple: &Tuple, action: &str) -> DimensionError {
    DimensionError::new(
        DimensionErrorKind::Overflow,
        format!("Overflow {} tuple {}", action, tuple),
    )
}

impl From<Vec<i64>> for Tuple {
    fn from(values: Vec<i64>) -> Self {
        Self::new(values)
    }
}

impl PartialOrd for Tuple {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tuple {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dimensions()
            .cmp(&other.dimensions())
            .then_with(|| self.values.cmp(&other.values))
    }
}

/// # Panics
///
/// Panics if the tuples differ in width or a component overflows; use
/// [`Tuple::checked_add`] to get an error instead.
impl Add for &Tuple {
    type Output = Tuple;

    #[track_caller]
    fn add(self, rhs: &Tuple) -> Tuple {
        match self.checked_add(rhs) {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }
}

impl Add for Tuple {
    type Output = Tuple;

    #[track_caller]
    fn add(self, rhs: Tuple) -> Tuple {
        &self + &rhs
    }
}

/// # Panics
///
/// Panics if the tuples differ in width or a component overflows; use
/// [`Tuple::checked_sub`] to get an error instead.
impl Sub for &Tuple {
    type Output = Tuple;

    #[track_caller]
    fn sub(self, rhs: &Tuple) -> Tuple {
        match self.checked_sub(rhs) {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }
}

impl Sub for Tuple {
    type Output = Tuple;

    #[track_caller]
    fn sub(self, rhs: Tuple) -> Tuple {
        &self - &rhs
    }
}

/// # Panics
///
/// Panics on a component equal to `i64::MIN`; use [`Tuple::checked_neg`] to
/// get an error instead.
impl Neg for &Tuple {
    type Output = Tuple;

    #[track_caller]
    fn neg(self) -> Tuple {
        match self.checked_neg() {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }
}

impl Neg for Tuple {
    type Output = Tuple;

    fn neg(self) -> Tuple {
        -&self
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

/// A set of same-width tuples. The width is fixed for the collection's
/// lifetime, even when it holds no tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleCollection {
    tuples: BTreeSet<Tuple>,
    dimensions: usize,
}

impl TupleCollection {
    /// Build a collection, inferring the width from the first tuple.
    ///
    /// Fails on an empty input (use [`TupleCollection::empty`]), on
    /// zero-width tuples, and on mixed widths.
    #[track_caller]
    pub fn new(tuples: impl IntoIterator<Item = Tuple>) -> Result<Self, DimensionError> {
        let tuples: BTreeSet<Tuple> = tuples.into_iter().collect();
        let dimensions = match tuples.iter().next() {
            Some(first) => first.dimensions(),
            None => {
                return Err(DimensionError::new(
                    DimensionErrorKind::CollectionMismatch,
                    "Dimensionality must be specified for collection with no initial set.",
                ))
            }
        };
        Self::with_dimensions(tuples, dimensions)
    }

    /// Build a collection of an explicit width.
    #[track_caller]
    pub fn with_dimensions(
        tuples: impl IntoIterator<Item = Tuple>,
        dimensions: usize,
    ) -> Result<Self, DimensionError> {
        if dimensions == 0 {
            return Err(DimensionError::new(
                DimensionErrorKind::CollectionMismatch,
                "Collections must have one or more dimensions.",
            ));
        }
        let tuples: BTreeSet<Tuple> = tuples.into_iter().collect();
        if let Some(bad) = tuples.iter().find(|t| t.dimensions() != dimensions) {
            return Err(DimensionError::new(
                DimensionErrorKind::CollectionMismatch,
                format!(
                    "Not all tuples are of the same dimensionality: {} is not {}-dimensional",
                    bad, dimensions
                ),
            ));
        }
        Ok(Self { tuples, dimensions })
    }

    /// An empty collection of the given width.
    #[track_caller]
    pub fn empty(dimensions: usize) -> Result<Self, DimensionError> {
        Self::with_dimensions(std::iter::empty(), dimensions)
    }

    /// Width of every member.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of distinct tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// True if the collection holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Membership test.
    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.tuples.contains(tuple)
    }

    /// Iterate in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// Set union with another collection of the same width.
    #[track_caller]
    pub fn union(&self, that: &TupleCollection) -> Result<TupleCollection, DimensionError> {
        if self.dimensions != that.dimensions {
            return Err(DimensionError::new(
                DimensionErrorKind::CollectionMismatch,
                format!(
                    "Cannot union collections of dimensionality {} and {}",
                    self.dimensions, that.dimensions
                ),
            ));
        }
        Ok(Self {
            tuples: self.tuples.union(&that.tuples).cloned().collect(),
            dimensions: self.dimensions,
        })
    }

    /// Per-dimension maximum, or `None` for an empty collection.
    pub fn max_on_dims(&self) -> Option<Tuple> {
        self.reduce_on_dims(i64::MIN, i64::max)
    }

    /// Per-dimension minimum, or `None` for an empty collection.
    pub fn min_on_dims(&self) -> Option<Tuple> {
        self.reduce_on_dims(i64::MAX, i64::min)
    }

    fn reduce_on_dims(&self, init: i64, op: impl Fn(i64, i64) -> i64) -> Option<Tuple> {
        if self.tuples.is_empty() {
            return None;
        }
        let mut acc = vec![init; self.dimensions];
        for tuple in &self.tuples {
            for (slot, &v) in acc.iter_mut().zip(tuple.values()) {
                *slot = op(*slot, v);
            }
        }
        Some(Tuple::new(acc))
    }

    /// Add `extent` to every member.
    #[track_caller]
    pub fn shift_all(&mut self, extent: &Tuple) -> Result<(), DimensionError> {
        if extent.dimensions() != self.dimensions {
            return Err(DimensionError::new(
                DimensionErrorKind::ExtentMismatch,
                format!(
                    "Shift extent dimensionality ({}) differs from collection ({})",
                    extent.dimensions(),
                    self.dimensions
                ),
            ));
        }
        let mut shifted = BTreeSet::new();
        for tuple in &self.tuples {
            shifted.insert(tuple.checked_add(extent)?);
        }
        self.tuples = shifted;
        Ok(())
    }
}

impl fmt::Display for TupleCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, t) in self.tuples.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, " }}")
    }
}

/// The read/write footprint of one statement on one named array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataspace {
    name: String,
    reads: TupleCollection,
    writes: TupleCollection,
}

impl Dataspace {
    /// Create a dataspace; reads and writes must share a width.
    #[track_caller]
    pub fn new(
        name: impl Into<String>,
        reads: TupleCollection,
        writes: TupleCollection,
    ) -> Result<Self, DimensionError> {
        let name = name.into();
        if reads.dimensions() != writes.dimensions() {
            return Err(DimensionError::new(
                DimensionErrorKind::DataspaceMismatch,
                format!(
                    "Read/Write sets of {} are of different dimensionality ({} vs {})",
                    name,
                    reads.dimensions(),
                    writes.dimensions()
                ),
            ));
        }
        Ok(Self { name, reads, writes })
    }

    /// Array name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read offsets.
    pub fn reads(&self) -> &TupleCollection {
        &self.reads
    }

    /// Write offsets.
    pub fn writes(&self) -> &TupleCollection {
        &self.writes
    }

    /// Access width.
    pub fn dimensions(&self) -> usize {
        self.reads.dimensions()
    }

    /// A copy with every read and write offset moved by `extent`.
    #[track_caller]
    pub fn shifted(&self, extent: &Tuple) -> Result<Dataspace, DimensionError> {
        let mut reads = self.reads.clone();
        let mut writes = self.writes.clone();
        reads.shift_all(extent)?;
        writes.shift_all(extent)?;
        Ok(Self {
            name: self.name.clone(),
            reads,
            writes,
        })
    }
}

impl fmt::Display for Dataspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: \n\tReads: {}\n\tWrites: {}",
            self.name, self.reads, self.writes
        )
    }
}
