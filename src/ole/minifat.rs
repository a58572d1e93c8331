//! Mini stream addressing
//!
//! Streams below the cutoff are stored as 64-byte mini sectors inside one
//! consolidated mini stream, which itself is an ordinary FAT chain rooted at
//! the root directory entry.

use super::fat::AllocationTable;
use super::header::Geometry;
use crate::common::error::{Error, Result};

/// Location of the mini stream inside the main sector space.
#[derive(Debug, Clone, Default)]
pub(crate) struct MiniStream {
    /// Main sectors holding the mini stream, in order
    chain: Vec<u32>,
    /// Declared size of the mini stream in bytes
    size: u64,
    mini_sector_size: usize,
    sector_size: usize,
}

impl MiniStream {
    /// Resolve the mini stream from the root entry's start sector and size.
    pub fn load(fat: &AllocationTable, start: u32, size: u64, geometry: &Geometry) -> Result<Self> {
        let chain = fat.stream_chain(start, size, geometry.sector_size)?;
        Ok(Self {
            chain,
            size,
            mini_sector_size: geometry.mini_sector_size,
            sector_size: geometry.sector_size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Map `len` bytes at the start of `mini_sector` to a main sector and
    /// an offset within it.
    pub fn locate(&self, mini_sector: u32, len: usize) -> Result<(u32, usize)> {
        let position = u64::from(mini_sector) * self.mini_sector_size as u64;
        if position + len as u64 > self.size {
            return Err(Error::corrupted(format!(
                "mini sector {} lies beyond the {}-byte mini stream",
                mini_sector, self.size
            )));
        }
        let index = (position / self.sector_size as u64) as usize;
        let within = (position % self.sector_size as u64) as usize;
        let sector = self.chain.get(index).copied().ok_or_else(|| {
            Error::corrupted(format!("mini stream has no sector {}", index))
        })?;
        Ok((sector, within))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::consts::ENDOFCHAIN;
    use crate::ole::fat::TableKind;

    fn geometry() -> Geometry {
        Geometry {
            major_version: 3,
            sector_size: 512,
            mini_sector_size: 64,
            mini_stream_cutoff: 4096,
            num_fat_sectors: 1,
            first_dir_sector: 0,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
        }
    }

    #[test]
    fn test_locate_across_main_sectors() {
        // Mini stream occupies main sectors 4 then 2
        let fat = AllocationTable::new(
            TableKind::Fat,
            vec![ENDOFCHAIN, ENDOFCHAIN, ENDOFCHAIN, ENDOFCHAIN, 2],
        );
        let mini = MiniStream::load(&fat, 4, 1024, &geometry()).unwrap();
        assert_eq!(mini.size(), 1024);
        assert_eq!(mini.locate(0, 64).unwrap(), (4, 0));
        assert_eq!(mini.locate(7, 64).unwrap(), (4, 448));
        assert_eq!(mini.locate(8, 64).unwrap(), (2, 0));
        assert_eq!(mini.locate(15, 10).unwrap(), (2, 448));
        assert!(mini.locate(16, 1).is_err());
    }

    #[test]
    fn test_empty_mini_stream() {
        let mini = MiniStream::default();
        assert!(mini.locate(0, 1).is_err());
    }
}
