//! Unified error types for msiole.
//!
//! This module provides the single error type returned by every reader
//! operation, together with its coarse [`ErrorKind`] classification.

// Submodule declarations
mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, ErrorKind, Result};
