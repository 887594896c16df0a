//! The loop-chain representation.
//!
//! - [`access`]: offset tuples and per-array read/write summaries
//! - [`domain`]: rectangular iteration domains with symbolic bounds
//! - [`chain`]: loop nests and chains of them

pub mod access;
pub mod chain;
pub mod domain;

pub use access::{Dataspace, Tuple, TupleCollection};
pub use chain::{LoopChain, LoopNest};
pub use domain::RectangularDomain;
