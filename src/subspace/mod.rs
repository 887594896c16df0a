//! Subspaces: named groups of coordinates in the global iteration vector.
//!
//! Every fragment a transformation emits is a map from the manager's input
//! iterators to its output iterators. A subspace that is *aliased* renders
//! its output names with `alias_` so both sides of the map can coexist.

mod manager;
mod space;

pub use manager::{SubspaceId, SubspaceManager};
pub use space::{Stage, Subspace, ALIAS_PREFIX, ALL_STAGES, BASE_STAGE, CONST_SUFFIX, UNSTAGED};
