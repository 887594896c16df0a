//! # loopchain - Polyhedral Loop-Chain Scheduling
//!
//! Schedules a chain of loop nests with symbolic rectangular domains:
//! - Shift, fusion, tiling and wavefront skewing as composable affine maps
//! - Parallel loop annotation
//! - Automatic, dependence-driven shifting solved as an integer program
//! - Code generation through ISL's `iscc`
//!
//! ## Architecture
//!
//! ```text
//! LoopChain → Schedule (domains + embedding) → Transformations (maps) → iscc → AST → C
//! ```
//!
//! ## Example
//!
//! ```rust
//! use loopchain::prelude::*;
//!
//! let mut chain = LoopChain::new();
//! for _ in 0..2 {
//!     chain.append(LoopNest::new(RectangularDomain::new([("0", "N")], ["N"])?));
//! }
//! let mut schedule = Schedule::new(chain);
//! schedule.apply(&Fusion::new(vec![0, 1]).into())?;
//! assert_eq!(schedule.transformations().len(), 2);
//! assert!(schedule.codegen_to_iscc().contains("codegen ((M1.M2)*(S1+S2))"));
//! # Ok::<(), loopchain::utils::errors::ScheduleError>(())
//! ```

#![warn(clippy::all)]

pub mod codegen;
pub mod config;
pub mod ilp;
pub mod ir;
pub mod isl;
pub mod schedule;
pub mod subspace;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::codegen::{print_c, CodegenOptions};
    pub use crate::config::PipelineConfig;
    pub use crate::ilp::{BranchAndBound, IlpSolver};
    pub use crate::ir::{Dataspace, LoopChain, LoopNest, RectangularDomain, Tuple, TupleCollection};
    pub use crate::isl::AstNode;
    pub use crate::schedule::Schedule;
    pub use crate::subspace::{Subspace, SubspaceId, SubspaceManager};
    pub use crate::transform::{
        AutomaticShift, Fusion, Identity, ParallelAnnotation, Shift, Tile, TileSizes, Transform,
        Transformation, Wavefront,
    };
    pub use crate::utils::errors::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
