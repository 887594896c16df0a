//! Error types for the loop-chain scheduler.
//!
//! Errors are organized by the kind of contract they report. None of them is
//! recoverable locally: a caller fixes the input and rebuilds the pipeline.

use crate::ilp::SolveStatus;
use crate::isl::IslError;
use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Top-level error type for the scheduler.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Tuple, collection, domain or extent dimensions disagree
    #[error("Dimensionality error: {0}")]
    Dimension(#[from] DimensionError),

    /// A transformation or schedule was configured inconsistently
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The ILP solve behind automatic shifting did not reach optimality
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// The polyhedral engine failed
    #[error("Polyhedral engine error: {0}")]
    Engine(#[from] IslError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed pipeline description
    #[error("Pipeline description error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error raised when two dimensioned objects disagree.
#[derive(Error, Debug, Clone)]
pub struct DimensionError {
    /// The error message
    pub message: String,
    /// The kind of dimensionality error
    pub kind: DimensionErrorKind,
    /// Where the violation was detected
    pub location: &'static Location<'static>,
}

impl DimensionError {
    /// Create a new error at the caller's location.
    #[track_caller]
    pub fn new(kind: DimensionErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for DimensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionErrorKind {
    /// Tuple arithmetic between different widths
    TupleMismatch,
    /// Collection members of different widths, or no width at all
    CollectionMismatch,
    /// Dataspace reads and writes of different widths
    DataspaceMismatch,
    /// Domain without dimensions or with blank bounds
    InvalidDomain,
    /// Shift extent width does not match the shifted loop
    ExtentMismatch,
    /// Derived subspace larger than its source
    SubspaceMismatch,
    /// Tuple arithmetic left the range of `i64`
    Overflow,
}

/// Error raised when a transformation or schedule is misconfigured.
#[derive(Error, Debug, Clone)]
pub struct ConfigError {
    /// The error message
    pub message: String,
    /// The kind of configuration error
    pub kind: ConfigErrorKind,
    /// The transformation that failed, if any
    pub transform: Option<String>,
    /// Where the violation was detected
    pub location: &'static Location<'static>,
}

impl ConfigError {
    /// Create a new error at the caller's location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            transform: None,
            location: Location::caller(),
        }
    }

    /// Attach the name of the failing transformation.
    pub fn in_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = Some(transform.into());
        self
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref transform) = self.transform {
            write!(f, " in {}", transform)?;
        }
        write!(f, " (at {})", self.location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// Loop id outside the chain
    UnknownLoop,
    /// Tile size list does not fit the tiled subspace
    InvalidTileSize,
    /// Fusion of zero loops
    EmptyFusion,
    /// Target subspace cannot host the transformation
    InvalidSubspace,
    /// Iterator length adjusted below zero
    NegativeIteratorLength,
    /// Pipeline description refers to something that does not exist
    InvalidPipeline,
}

/// Error raised when the ILP solve behind automatic shifting is not optimal.
#[derive(Error, Debug, Clone)]
pub struct SolverError {
    /// The error message
    pub message: String,
    /// The status the solver reported
    pub status: SolveStatus,
}

impl SolverError {
    /// Create a new solver error from a status.
    pub fn new(status: SolveStatus, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status: {})", self.message, self.status)
    }
}

/// Result type using ScheduleError.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_error_display_has_location() {
        let err = DimensionError::new(DimensionErrorKind::TupleMismatch, "Tuples are of different dimensionality 2 3");
        let s = format!("{}", err);
        assert!(s.contains("different dimensionality"));
        assert!(s.contains("errors.rs"));
    }

    #[test]
    fn test_config_error_names_transform() {
        let err = ConfigError::new(ConfigErrorKind::EmptyFusion, "Must fuse one or more loops")
            .in_transform("fusion");
        let s = format!("{}", err);
        assert!(s.contains("Must fuse"));
        assert!(s.contains("in fusion"));
    }

    #[test]
    fn test_solver_error_reports_status() {
        let err = SolverError::new(SolveStatus::Infeasible, "Automatic shift has no legal solution");
        let wrapped: ScheduleError = err.into();
        assert!(wrapped.to_string().contains("infeasible"));
    }
}
