//! Allocation tables and sector chain walking
//!
//! Both the FAT and the MiniFAT are plain arrays mapping a sector index to
//! the next index of its chain. Walking a chain is the one place where a
//! hostile file could make the reader loop forever, so every walk tracks
//! the sectors it has visited and is bounded by the table size.

use super::consts::*;
use super::difat::collect_fat_sector_ids;
use super::header::Header;
use super::sector::SectorReader;
use crate::common::binary::u32_le_values;
use crate::common::error::{Error, Result};
use fixedbitset::FixedBitSet;
use std::fmt;
use std::io::{Read, Seek};
use tracing::{trace, warn};

/// Which allocation table a chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableKind {
    Fat,
    MiniFat,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Fat => f.write_str("FAT"),
            TableKind::MiniFat => f.write_str("MiniFAT"),
        }
    }
}

/// A FAT or MiniFAT: next-sector links indexed by sector.
#[derive(Debug, Clone)]
pub(crate) struct AllocationTable {
    kind: TableKind,
    entries: Vec<u32>,
}

impl AllocationTable {
    pub fn new(kind: TableKind, entries: Vec<u32>) -> Self {
        Self { kind, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Follow a chain from `start` until ENDOFCHAIN.
    ///
    /// Fails on a revisited sector, a free or reserved marker inside the
    /// chain, an index outside the table, or more than `max_len` sectors.
    pub fn chain(&self, start: u32, max_len: usize) -> Result<Vec<u32>> {
        let mut chain = Vec::new();
        let mut visited = FixedBitSet::with_capacity(self.entries.len());
        let mut current = start;

        while current != ENDOFCHAIN {
            if current > MAXREGSECT {
                return Err(Error::corrupted(format!(
                    "{} chain from sector {} reaches marker {:#010x} after {} sectors",
                    self.kind,
                    start,
                    current,
                    chain.len()
                )));
            }
            let index = current as usize;
            if index >= self.entries.len() {
                return Err(Error::corrupted(format!(
                    "{} chain from sector {} points to sector {} beyond table of {} entries",
                    self.kind,
                    start,
                    current,
                    self.entries.len()
                )));
            }
            if visited.put(index) {
                return Err(Error::corrupted(format!(
                    "{} chain from sector {} revisits sector {}",
                    self.kind, start, current
                )));
            }
            if chain.len() >= max_len {
                return Err(Error::corrupted(format!(
                    "{} chain from sector {} exceeds {} sectors",
                    self.kind, start, max_len
                )));
            }
            chain.push(current);
            current = self.entries[index];
        }

        trace!(kind = %self.kind, start, sectors = chain.len(), "walked sector chain");
        Ok(chain)
    }

    /// Resolve the chain of a stream of `size` bytes stored in `unit`-byte sectors.
    ///
    /// The chain may carry at most one spare sector beyond what the size
    /// requires; anything shorter or longer is corruption.
    pub fn stream_chain(&self, start: u32, size: u64, unit: usize) -> Result<Vec<u32>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let needed = size.div_ceil(unit as u64);
        let needed = usize::try_from(needed).map_err(|_| {
            Error::corrupted(format!("stream size {} is not addressable", size))
        })?;
        let chain = self.chain(start, needed.saturating_add(1))?;
        if chain.len() < needed {
            return Err(Error::corrupted(format!(
                "{} chain from sector {} has {} sectors but stream of {} bytes needs {}",
                self.kind,
                start,
                chain.len(),
                size,
                needed
            )));
        }
        Ok(chain)
    }
}

/// Load the main FAT through the header DIFAT and its continuation sectors.
pub(crate) fn load_fat<R: Read + Seek>(
    sectors: &mut SectorReader<R>,
    header: &Header,
) -> Result<AllocationTable> {
    let fat_sector_ids = collect_fat_sector_ids(sectors, header)?;
    let ids_per_sector = header.geometry.ids_per_sector();

    let mut entries = Vec::with_capacity(fat_sector_ids.len() * ids_per_sector);
    for &sector_id in &fat_sector_ids {
        let sector_data = sectors.read_sector(sector_id)?;
        entries.extend(u32_le_values(&sector_data));
    }

    Ok(AllocationTable::new(TableKind::Fat, entries))
}

/// Load the MiniFAT, whose sectors form an ordinary FAT chain.
pub(crate) fn load_minifat<R: Read + Seek>(
    sectors: &mut SectorReader<R>,
    fat: &AllocationTable,
    header: &Header,
) -> Result<AllocationTable> {
    let geometry = &header.geometry;
    if geometry.num_minifat_sectors == 0 || geometry.first_minifat_sector == ENDOFCHAIN {
        return Ok(AllocationTable::new(TableKind::MiniFat, Vec::new()));
    }

    let chain = fat.chain(geometry.first_minifat_sector, fat.len())?;
    if chain.len() != geometry.num_minifat_sectors as usize {
        warn!(
            declared = geometry.num_minifat_sectors,
            found = chain.len(),
            "MiniFAT sector count differs from header"
        );
    }

    let mut entries = Vec::with_capacity(chain.len() * geometry.ids_per_sector());
    for &sector_id in &chain {
        let sector_data = sectors.read_sector(sector_id)?;
        entries.extend(u32_le_values(&sector_data));
    }

    Ok(AllocationTable::new(TableKind::MiniFat, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorKind;

    fn table(entries: &[u32]) -> AllocationTable {
        AllocationTable::new(TableKind::Fat, entries.to_vec())
    }

    #[test]
    fn test_simple_chain() {
        let fat = table(&[2, ENDOFCHAIN, 3, 1]);
        assert_eq!(fat.chain(0, 10).unwrap(), vec![0, 2, 3, 1]);
        assert_eq!(fat.chain(1, 10).unwrap(), vec![1]);
        assert!(fat.chain(ENDOFCHAIN, 10).unwrap().is_empty());
    }

    #[test]
    fn test_self_reference_is_corruption() {
        let fat = table(&[0]);
        let err = fat.chain(0, usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(err.to_string().contains("revisits sector 0"));
    }

    #[test]
    fn test_longer_cycle_is_corruption() {
        let fat = table(&[1, 2, 3, 1]);
        let err = fat.chain(0, usize::MAX).unwrap_err();
        assert!(err.to_string().contains("revisits sector 1"));
    }

    #[test]
    fn test_free_sector_mid_chain() {
        let fat = table(&[1, FREESECT]);
        let err = fat.chain(0, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(err.to_string().contains("0xffffffff"));

        let fat = table(&[FATSECT]);
        assert!(fat.chain(0, 10).is_err());
    }

    #[test]
    fn test_index_beyond_table() {
        let fat = table(&[7]);
        let err = fat.chain(0, 10).unwrap_err();
        assert!(err.to_string().contains("beyond table"));
    }

    #[test]
    fn test_max_len_bound() {
        let fat = table(&[1, 2, 3, ENDOFCHAIN]);
        assert!(fat.chain(0, 4).is_ok());
        assert!(fat.chain(0, 3).is_err());
    }

    #[test]
    fn test_stream_chain_slack() {
        // Three sectors of 512 bytes
        let fat = table(&[1, 2, ENDOFCHAIN]);
        // 1024 bytes need two sectors; one spare sector is tolerated
        assert_eq!(fat.stream_chain(0, 1024, 512).unwrap().len(), 3);
        assert_eq!(fat.stream_chain(0, 1500, 512).unwrap().len(), 3);
        // 512 bytes need one sector; two spare sectors are not
        assert!(fat.stream_chain(0, 512, 512).is_err());
        // 2000 bytes need four sectors; the chain is too short
        let err = fat.stream_chain(0, 2000, 512).unwrap_err();
        assert!(err.to_string().contains("needs 4"));
    }

    #[test]
    fn test_empty_stream_needs_no_chain() {
        let fat = table(&[]);
        assert!(fat.stream_chain(FREESECT, 0, 512).unwrap().is_empty());
    }

    #[test]
    fn test_minifat_kind_in_messages() {
        let minifat = AllocationTable::new(TableKind::MiniFat, vec![0]);
        let err = minifat.chain(0, 10).unwrap_err();
        assert!(err.to_string().contains("MiniFAT"));
    }
}
