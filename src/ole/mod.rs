/// Constants for OLE file format
pub mod consts;

/// Header parsing and sector geometry
mod header;

/// Positioned sector reads over the underlying reader
mod sector;

/// FAT and MiniFAT chain walking
mod fat;

/// FAT sector discovery through the header and DIFAT sectors
mod difat;

/// Mini stream addressing
mod minifat;

/// Directory entries and hierarchy reconstruction
mod directory;

/// Entry name collation and installer name decoding
mod name;

/// Reader configuration
mod options;

/// Compound file reader and storage/stream handles
mod file;

/// XML dump and stream extraction for diagnostics
#[cfg(feature = "dump")]
pub mod dump;

#[cfg(test)]
mod fixture;


// Re-export public types for convenient access
pub use directory::{Clsid, EntryKind};
pub use file::{CompoundFile, Storage, Stream, is_ole_file};
pub use header::Geometry;
pub use name::{compare_names, decode_msi_name};
pub use options::ReaderOptions;
