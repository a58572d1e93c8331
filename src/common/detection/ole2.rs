//! Installer package detection for OLE2 compound files.

use crate::common::detection::PackageKind;
use crate::ole::{CompoundFile, is_ole_file};
use std::io::{Cursor, Read, Seek};

/// Detect the package kind of an in-memory file.
///
/// Returns `None` when the bytes are not a readable compound file.
pub fn detect_package_kind(bytes: &[u8]) -> Option<PackageKind> {
    if !is_ole_file(bytes) {
        return None;
    }
    detect_package_kind_from_reader(Cursor::new(bytes))
}

/// Detect the package kind from a reader.
/// Opens the compound file, which validates the header and directory.
pub fn detect_package_kind_from_reader<R: Read + Seek>(reader: R) -> Option<PackageKind> {
    CompoundFile::from_reader(reader)
        .ok()
        .map(|file| file.package_kind())
}
