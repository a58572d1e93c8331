//! DIFAT resolution
//!
//! The first 109 FAT sector IDs are stored in the header. Larger files keep
//! the remaining IDs in DIFAT sectors, each holding `sector_size / 4 - 1` IDs
//! followed by the index of the next DIFAT sector.

use super::consts::*;
use super::header::Header;
use super::sector::SectorReader;
use crate::common::binary::{read_u32_le, u32_le_values};
use crate::common::error::{Error, Result};
use fixedbitset::FixedBitSet;
use std::io::{Read, Seek};
use tracing::{debug, warn};

/// Collect the IDs of all FAT sectors, in order.
pub(crate) fn collect_fat_sector_ids<R: Read + Seek>(
    sectors: &mut SectorReader<R>,
    header: &Header,
) -> Result<Vec<u32>> {
    let geometry = &header.geometry;
    let wanted = geometry.num_fat_sectors as usize;
    let physical = sectors.sector_count() as usize;
    if wanted > physical {
        return Err(Error::corrupted(format!(
            "header declares {} FAT sectors but the file holds only {} sectors",
            wanted, physical
        )));
    }

    let mut fat_sector_ids = Vec::with_capacity(wanted);
    for (slot, &id) in header.difat.iter().enumerate() {
        if slot < wanted {
            if id > MAXREGSECT {
                return Err(Error::corrupted(format!(
                    "header DIFAT slot {} is {:#010x} but {} FAT sectors are declared",
                    slot, id, wanted
                )));
            }
            fat_sector_ids.push(id);
        } else if id != FREESECT {
            warn!(slot, id, "ignoring header DIFAT slot beyond declared FAT count");
        }
    }

    let ids_per_difat = geometry.ids_per_sector() - 1;
    let mut visited = FixedBitSet::with_capacity(physical);
    let mut difat_sector = geometry.first_difat_sector;
    let mut difat_sectors_read = 0u32;

    while fat_sector_ids.len() < wanted {
        if difat_sector > MAXREGSECT {
            return Err(Error::corrupted(format!(
                "DIFAT chain ends after {} of {} FAT sectors",
                fat_sector_ids.len(),
                wanted
            )));
        }
        if difat_sector as usize >= physical {
            return Err(Error::corrupted(format!(
                "DIFAT sector {} lies beyond the {} sectors of the file",
                difat_sector, physical
            )));
        }
        if visited.put(difat_sector as usize) {
            return Err(Error::corrupted(format!(
                "DIFAT chain revisits sector {}",
                difat_sector
            )));
        }

        let sector_data = sectors.read_sector(difat_sector)?;
        for id in u32_le_values(&sector_data).take(ids_per_difat) {
            if fat_sector_ids.len() == wanted {
                break;
            }
            if id > MAXREGSECT {
                return Err(Error::corrupted(format!(
                    "DIFAT sector {} holds {:#010x} before all {} FAT sectors were listed",
                    difat_sector, id, wanted
                )));
            }
            fat_sector_ids.push(id);
        }
        difat_sector = read_u32_le(&sector_data, ids_per_difat * 4)?;
        difat_sectors_read += 1;
    }

    if difat_sectors_read != geometry.num_difat_sectors {
        debug!(
            declared = geometry.num_difat_sectors,
            read = difat_sectors_read,
            "DIFAT sector count differs from header"
        );
    }

    Ok(fat_sector_ids)
}
