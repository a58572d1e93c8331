//! Package format detection utilities.
//!
//! Identifies which kind of Windows Installer package a compound file is,
//! from its signature and the class ID of its root storage, reading only
//! the header and directory.

pub mod ole2;
pub mod types;

pub use ole2::{detect_package_kind, detect_package_kind_from_reader};
pub use types::PackageKind;
