//! Utility modules shared by the scheduler:
//! - Error types
//! - Code formatting

pub mod errors;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use pretty::CodeFormatter;
