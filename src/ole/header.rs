//! Compound file header parsing
//!
//! Validates the fixed 512-byte header and extracts the sector geometry
//! every other component works from.

use super::consts::*;
use crate::common::error::{Error, Result};
use zerocopy::{FromBytes, LE, U16, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE header structure (512 bytes)
///
/// This represents the on-disk format of the header. All multi-byte fields
/// are little-endian.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
#[allow(dead_code)] // full on-disk layout, not every field is consulted
struct RawHeader {
    /// Signature, must equal [`MAGIC`]
    signature: [u8; 8],
    /// Reserved class ID (all zero)
    clsid: [u8; 16],
    /// Minor version (usually 0x003E)
    minor_version: U16<LE>,
    /// Major version (3 or 4)
    major_version: U16<LE>,
    /// Byte order mark (0xFFFE)
    byte_order: U16<LE>,
    /// Sector size as a power of two
    sector_shift: U16<LE>,
    /// Mini sector size as a power of two
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    /// Number of directory sectors (always 0 for version 3)
    num_dir_sectors: U32<LE>,
    /// Number of FAT sectors
    num_fat_sectors: U32<LE>,
    /// First sector of the directory chain
    first_dir_sector: U32<LE>,
    /// Transaction signature (unused by readers)
    transaction_signature: U32<LE>,
    /// Mini stream cutoff size
    mini_stream_cutoff: U32<LE>,
    /// First sector of the MiniFAT chain
    first_minifat_sector: U32<LE>,
    /// Number of MiniFAT sectors
    num_minifat_sectors: U32<LE>,
    /// First DIFAT continuation sector
    first_difat_sector: U32<LE>,
    /// Number of DIFAT continuation sectors
    num_difat_sectors: U32<LE>,
    /// First 109 FAT sector IDs
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Sector geometry of a compound file, fixed once the header is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Major format version (3 or 4)
    pub major_version: u16,
    /// Sector size in bytes (512 or 4096)
    pub sector_size: usize,
    /// Mini sector size in bytes (64)
    pub mini_sector_size: usize,
    /// Streams below this size are stored in the mini stream
    pub mini_stream_cutoff: u32,
    /// Number of FAT sectors
    pub num_fat_sectors: u32,
    /// First sector of the directory chain
    pub first_dir_sector: u32,
    /// First sector of the MiniFAT chain
    pub first_minifat_sector: u32,
    /// Number of MiniFAT sectors
    pub num_minifat_sectors: u32,
    /// First DIFAT continuation sector
    pub first_difat_sector: u32,
    /// Number of DIFAT continuation sectors
    pub num_difat_sectors: u32,
}

impl Geometry {
    /// Number of 32-bit sector IDs held by one sector.
    #[inline]
    pub fn ids_per_sector(&self) -> usize {
        self.sector_size / 4
    }

    /// Byte offset of a sector; the header conceptually occupies sector -1.
    #[inline]
    pub fn sector_offset(&self, sector: u32) -> u64 {
        (u64::from(sector) + 1) * self.sector_size as u64
    }
}

/// Parsed header: geometry plus the FAT sector IDs stored inline.
#[derive(Debug, Clone)]
pub struct Header {
    pub geometry: Geometry,
    /// The header's DIFAT array (109 entries, unused slots are FREESECT)
    pub difat: Vec<u32>,
}

impl Header {
    /// Parse and validate a header from the first bytes of a file.
    ///
    /// The signature is checked before anything else so that non-compound
    /// inputs fail with [`Error::NotOleFile`] regardless of their length.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(Error::NotOleFile);
        }
        let raw = data
            .get(..HEADER_SIZE)
            .and_then(|bytes| RawHeader::read_from_bytes(bytes).ok())
            .ok_or(Error::Truncated {
                offset: 0,
                length: HEADER_SIZE,
                file_size: data.len() as u64,
            })?;

        if raw.byte_order.get() != BYTE_ORDER_LE {
            return Err(Error::invalid_format(format!(
                "invalid byte order mark {:#06x}",
                raw.byte_order.get()
            )));
        }

        let major_version = raw.major_version.get();
        let sector_shift = raw.sector_shift.get();
        match (major_version, sector_shift) {
            (3, SECTOR_SHIFT_V3) | (4, SECTOR_SHIFT_V4) => {},
            (_, SECTOR_SHIFT_V3 | SECTOR_SHIFT_V4) => {
                return Err(Error::invalid_format(format!(
                    "sector shift {} does not match major version {}",
                    sector_shift, major_version
                )));
            },
            _ => {
                return Err(Error::invalid_format(format!(
                    "unsupported sector shift {}",
                    sector_shift
                )));
            },
        }

        let mini_sector_shift = raw.mini_sector_shift.get();
        if mini_sector_shift != MINI_SECTOR_SHIFT {
            return Err(Error::invalid_format(format!(
                "unsupported mini sector shift {}",
                mini_sector_shift
            )));
        }

        let mini_stream_cutoff = raw.mini_stream_cutoff.get();
        if mini_stream_cutoff != MINI_STREAM_CUTOFF {
            return Err(Error::invalid_format(format!(
                "non-standard mini stream cutoff {}",
                mini_stream_cutoff
            )));
        }

        let geometry = Geometry {
            major_version,
            sector_size: 1usize << sector_shift,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff,
            num_fat_sectors: raw.num_fat_sectors.get(),
            first_dir_sector: raw.first_dir_sector.get(),
            first_minifat_sector: raw.first_minifat_sector.get(),
            num_minifat_sectors: raw.num_minifat_sectors.get(),
            first_difat_sector: raw.first_difat_sector.get(),
            num_difat_sectors: raw.num_difat_sectors.get(),
        };

        Ok(Header {
            geometry,
            difat: raw.difat.iter().map(|id| id.get()).collect(),
        })
    }
}
