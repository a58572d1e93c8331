//! Sector addressing over the underlying byte source.

use super::consts::MAXREGSECT;
use super::header::Geometry;
use crate::common::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// Translates sector indexes into byte ranges of the file and reads them.
///
/// Holds nothing but the reader, its length and the geometry.
#[derive(Debug)]
pub(crate) struct SectorReader<R> {
    reader: R,
    file_size: u64,
    geometry: Geometry,
}

impl<R: Read + Seek> SectorReader<R> {
    pub fn new(reader: R, file_size: u64, geometry: Geometry) -> Self {
        Self {
            reader,
            file_size,
            geometry,
        }
    }

    /// Number of (possibly partial) sectors physically present after the header.
    pub fn sector_count(&self) -> u32 {
        let sector_size = self.geometry.sector_size as u64;
        let body = self.file_size.saturating_sub(sector_size);
        body.div_ceil(sector_size).min(u64::from(MAXREGSECT) + 1) as u32
    }

    /// Fill `buf` from the absolute file offset `offset`.
    ///
    /// Ranges reaching past the end of the file fail with [`Error::Truncated`]
    /// before any read is issued.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.is_none_or(|end| end > self.file_size) {
            return Err(Error::Truncated {
                offset,
                length: buf.len(),
                file_size: self.file_size,
            });
        }
        let length = buf.len();
        let failed = |source| Error::ReadFailed {
            offset,
            length,
            source,
        };
        self.reader.seek(SeekFrom::Start(offset)).map_err(failed)?;
        self.reader.read_exact(buf).map_err(failed)
    }

    /// Read `len` bytes starting `within` bytes into `sector`.
    pub fn read_in_sector(&mut self, sector: u32, within: usize, buf: &mut [u8]) -> Result<()> {
        debug_assert!(within + buf.len() <= self.geometry.sector_size);
        let offset = self.geometry.sector_offset(sector) + within as u64;
        self.read_at(offset, buf)
    }

    /// Read one whole sector.
    pub fn read_sector(&mut self, sector: u32) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.geometry.sector_size];
        self.read_in_sector(sector, 0, &mut buffer)?;
        Ok(buffer)
    }
}
