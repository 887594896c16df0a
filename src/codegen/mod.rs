//! Code generation from the loop AST.

pub mod c;

pub use c::print_c;

use serde::{Deserialize, Serialize};

/// Default annotation placed before a parallel loop.
pub const DEFAULT_PARALLEL_PRAGMA: &str = "#pragma omp parallel for";

/// Output options for the C printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// One level of indentation
    pub indent: String,
    /// Line printed before every parallel loop; empty disables it
    pub parallel_pragma: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            parallel_pragma: DEFAULT_PARALLEL_PRAGMA.to_string(),
        }
    }
}
