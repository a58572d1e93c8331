//! Common types and utilities shared across the crate.
//!
//! Error types, little-endian field readers and package detection live here;
//! the compound file reader itself is in [`crate::ole`].

// Submodule declarations
pub mod binary;
pub mod detection;
pub mod error;

// Re-exports for convenience
pub use detection::{PackageKind, detect_package_kind};
pub use error::{Error, ErrorKind, Result};
