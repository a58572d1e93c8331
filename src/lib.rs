//! msiole - A read-only reader for Windows Installer compound files
//!
//! Windows Installer databases (.msi), patches (.msp) and transforms (.mst)
//! are OLE2 structured storage files (Compound File Binary Format). This
//! crate parses the container and exposes its hierarchy of storages and
//! streams, so callers can find and extract payloads such as embedded
//! cabinet archives.
//!
//! # Features
//!
//! - **Container parsing**: header, FAT, DIFAT, MiniFAT and directory of
//!   version 3 (512-byte sectors) and version 4 (4096-byte sectors) files
//! - **Hostile input**: cyclic or dangling chains and directory links are
//!   reported as corruption instead of looping or panicking
//! - **Installer names**: packed table and stream names are decoded for display
//! - **Cabinet discovery**: streams holding "MSCF" archives are easy to find
//! - **Debug dump** (`dump` feature): XML rendering and stream extraction
//!
//! # Example - Extracting cabinets from a patch
//!
//! ```no_run
//! use msiole::ole::CompoundFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let package = CompoundFile::open("update.msp")?;
//! println!("package kind: {:?}", package.package_kind());
//!
//! for stream in package.cabinet_streams()? {
//!     let data = stream.read_all()?;
//!     std::fs::write(format!("{}.cab", stream.display_name()), data)?;
//! }
//!
//! package.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Walking the hierarchy
//!
//! ```no_run
//! use msiole::ole::CompoundFile;
//!
//! # fn main() -> msiole::Result<()> {
//! let package = CompoundFile::open("product.msi")?;
//! let root = package.root()?;
//! for storage in root.sub_storages()? {
//!     println!("storage {}", storage.name());
//! }
//! for stream in root.streams()? {
//!     println!("stream {} ({} bytes)", stream.display_name(), stream.len());
//! }
//! # Ok(())
//! # }
//! ```

/// Shared error types, binary helpers and package detection
pub mod common;

/// OLE2 (Compound File Binary Format) reader
///
/// The reader validates the container while opening it and serves stream
/// payloads on demand.
pub mod ole;

// Re-export commonly used types for convenience
pub use common::{Error, ErrorKind, PackageKind, Result};
pub use ole::{CompoundFile, ReaderOptions, Storage, Stream};
