//! In-memory compound file images for tests
//!
//! Lays out header, data sectors, MiniFAT, mini stream, directory, FAT and
//! DIFAT sectors explicitly so tests can build both valid files and files
//! with deliberately broken bookkeeping.

use super::consts::*;
use super::name::compare_names;

/// Directory entry as written into a test image.
#[derive(Debug, Clone)]
pub(crate) struct EntrySpec {
    pub name: String,
    pub entry_type: u8,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    pub clsid: [u8; 16],
    pub start_sector: u32,
    pub size: u64,
}

impl EntrySpec {
    fn new(name: &str, entry_type: u8, start_sector: u32, size: u64) -> Self {
        Self {
            name: name.to_string(),
            entry_type,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            clsid: [0; 16],
            start_sector,
            size,
        }
    }

    pub fn root() -> Self {
        Self::new("Root Entry", STGTY_ROOT, ENDOFCHAIN, 0)
    }

    pub fn storage(name: &str) -> Self {
        Self::new(name, STGTY_STORAGE, 0, 0)
    }

    pub fn stream(name: &str, start_sector: u32, size: u64) -> Self {
        Self::new(name, STGTY_STREAM, start_sector, size)
    }

    pub fn unused() -> Self {
        Self::new("", STGTY_EMPTY, 0, 0)
    }

    pub fn left(mut self, sid: u32) -> Self {
        self.sid_left = sid;
        self
    }

    pub fn right(mut self, sid: u32) -> Self {
        self.sid_right = sid;
        self
    }

    pub fn child(mut self, sid: u32) -> Self {
        self.sid_child = sid;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut entry = vec![0u8; DIRENTRY_SIZE];
        let units: Vec<u16> = self.name.encode_utf16().collect();
        for (i, unit) in units.iter().take(31).enumerate() {
            entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        let name_len = if units.is_empty() {
            0
        } else {
            (units.len().min(31) as u16 + 1) * 2
        };
        entry[64..66].copy_from_slice(&name_len.to_le_bytes());
        entry[66] = self.entry_type;
        entry[67] = 1; // black
        entry[68..72].copy_from_slice(&self.sid_left.to_le_bytes());
        entry[72..76].copy_from_slice(&self.sid_right.to_le_bytes());
        entry[76..80].copy_from_slice(&self.sid_child.to_le_bytes());
        entry[80..96].copy_from_slice(&self.clsid);
        entry[116..120].copy_from_slice(&self.start_sector.to_le_bytes());
        entry[120..128].copy_from_slice(&self.size.to_le_bytes());
        entry
    }
}

/// Builder for a complete compound file image.
pub(crate) struct ImageBuilder {
    sector_size: usize,
    sectors: Vec<Vec<u8>>,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    ministream: Vec<u8>,
    entries: Vec<EntrySpec>,
    min_fat_entries: usize,
    fat_overrides: Vec<(u32, u32)>,
    minifat_overrides: Vec<(u32, u32)>,
}

impl ImageBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            sector_size,
            sectors: Vec::new(),
            fat: Vec::new(),
            minifat: Vec::new(),
            ministream: Vec::new(),
            entries: vec![EntrySpec::root()],
            min_fat_entries: 0,
            fat_overrides: Vec::new(),
            minifat_overrides: Vec::new(),
        }
    }

    fn ids_per_sector(&self) -> usize {
        self.sector_size / 4
    }

    /// Store `data` in freshly allocated main sectors and return the first one.
    pub fn alloc(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }
        let first = self.sectors.len() as u32;
        for chunk in data.chunks(self.sector_size) {
            let mut sector = chunk.to_vec();
            sector.resize(self.sector_size, 0);
            self.sectors.push(sector);
            let index = self.fat.len() as u32;
            self.fat.push(index + 1);
        }
        if let Some(last) = self.fat.last_mut() {
            *last = ENDOFCHAIN;
        }
        first
    }

    /// Store `data` in freshly allocated mini sectors and return the first one.
    pub fn alloc_mini(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }
        let first = self.minifat.len() as u32;
        for chunk in data.chunks(64) {
            self.ministream.extend_from_slice(chunk);
            self.ministream.resize(self.ministream.len().div_ceil(64) * 64, 0);
            let index = self.minifat.len() as u32;
            self.minifat.push(index + 1);
        }
        if let Some(last) = self.minifat.last_mut() {
            *last = ENDOFCHAIN;
        }
        first
    }

    pub fn push_entry(&mut self, spec: EntrySpec) -> u32 {
        self.entries.push(spec);
        (self.entries.len() - 1) as u32
    }

    pub fn entry_mut(&mut self, sid: u32) -> &mut EntrySpec {
        &mut self.entries[sid as usize]
    }

    /// Add a stream entry, placing small payloads in the mini stream.
    pub fn add_stream(&mut self, name: &str, data: &[u8]) -> u32 {
        let start = if (data.len() as u32) < MINI_STREAM_CUTOFF {
            self.alloc_mini(data)
        } else {
            self.alloc(data)
        };
        self.push_entry(EntrySpec::stream(name, start, data.len() as u64))
    }

    pub fn add_storage(&mut self, name: &str) -> u32 {
        self.push_entry(EntrySpec::storage(name))
    }

    /// Link `children` under `parent` as a balanced tree in name order.
    pub fn set_children(&mut self, parent: u32, children: &[u32]) {
        let mut sorted = children.to_vec();
        sorted.sort_by(|&a, &b| {
            compare_names(&self.entries[a as usize].name, &self.entries[b as usize].name)
        });
        let root = self.link_balanced(&sorted);
        self.entries[parent as usize].sid_child = root;
    }

    fn link_balanced(&mut self, sorted: &[u32]) -> u32 {
        if sorted.is_empty() {
            return NOSTREAM;
        }
        let mid = sorted.len() / 2;
        let left = self.link_balanced(&sorted[..mid]);
        let right = self.link_balanced(&sorted[mid + 1..]);
        let node = &mut self.entries[sorted[mid] as usize];
        node.sid_left = left;
        node.sid_right = right;
        sorted[mid]
    }

    /// Pad the FAT with free entries so that it spans at least `entries` slots.
    pub fn min_fat_entries(&mut self, entries: usize) {
        self.min_fat_entries = entries;
    }

    /// Replace a FAT link after layout.
    pub fn override_fat(&mut self, index: u32, value: u32) {
        self.fat_overrides.push((index, value));
    }

    /// Replace a MiniFAT link after layout.
    pub fn override_minifat(&mut self, index: u32, value: u32) {
        self.minifat_overrides.push((index, value));
    }

    pub fn build(mut self) -> Vec<u8> {
        let ids = self.ids_per_sector();

        let ministream = std::mem::take(&mut self.ministream);
        let root_start = self.alloc(&ministream);
        self.entries[0].start_sector = root_start;
        self.entries[0].size = ministream.len() as u64;

        let mut minifat = std::mem::take(&mut self.minifat);
        for &(index, value) in &self.minifat_overrides {
            minifat[index as usize] = value;
        }
        let minifat_count = minifat.len().div_ceil(ids);
        minifat.resize(minifat_count * ids, FREESECT);
        let minifat_bytes: Vec<u8> = minifat.iter().flat_map(|v| v.to_le_bytes()).collect();
        let minifat_start = self.alloc(&minifat_bytes);

        let per_sector = self.sector_size / DIRENTRY_SIZE;
        let dir_count = self.entries.len().div_ceil(per_sector);
        let mut entries = self.entries.clone();
        entries.resize(dir_count * per_sector, EntrySpec::unused());
        let dir_bytes: Vec<u8> = entries.iter().flat_map(EntrySpec::to_bytes).collect();
        let dir_start = self.alloc(&dir_bytes);

        // Size FAT and DIFAT so that they also map their own sectors
        let used = self.sectors.len();
        let (mut fat_count, mut difat_count) = (0usize, 0usize);
        loop {
            let total = (used + fat_count + difat_count).max(self.min_fat_entries);
            let needed_fat = total.div_ceil(ids);
            let needed_difat = needed_fat
                .saturating_sub(HEADER_DIFAT_ENTRIES)
                .div_ceil(ids - 1);
            if needed_fat == fat_count && needed_difat == difat_count {
                break;
            }
            fat_count = needed_fat;
            difat_count = needed_difat;
        }

        let fat_ids: Vec<u32> = (used..used + fat_count).map(|i| i as u32).collect();
        let difat_ids: Vec<u32> = (used + fat_count..used + fat_count + difat_count)
            .map(|i| i as u32)
            .collect();
        let mut fat = self.fat.clone();
        fat.resize(fat_count * ids, FREESECT);
        for &id in &fat_ids {
            fat[id as usize] = FATSECT;
        }
        for &id in &difat_ids {
            fat[id as usize] = DIFSECT;
        }
        for &(index, value) in &self.fat_overrides {
            fat[index as usize] = value;
        }

        let mut header = vec![0u8; self.sector_size];
        header[0..8].copy_from_slice(MAGIC);
        header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
        let (major, shift) = if self.sector_size == 512 {
            (3u16, SECTOR_SHIFT_V3)
        } else {
            (4u16, SECTOR_SHIFT_V4)
        };
        header[26..28].copy_from_slice(&major.to_le_bytes());
        header[28..30].copy_from_slice(&BYTE_ORDER_LE.to_le_bytes());
        header[30..32].copy_from_slice(&shift.to_le_bytes());
        header[32..34].copy_from_slice(&MINI_SECTOR_SHIFT.to_le_bytes());
        let num_dir_sectors = if major == 3 { 0 } else { dir_count as u32 };
        header[40..44].copy_from_slice(&num_dir_sectors.to_le_bytes());
        header[44..48].copy_from_slice(&(fat_count as u32).to_le_bytes());
        header[48..52].copy_from_slice(&dir_start.to_le_bytes());
        header[56..60].copy_from_slice(&MINI_STREAM_CUTOFF.to_le_bytes());
        header[60..64].copy_from_slice(&minifat_start.to_le_bytes());
        header[64..68].copy_from_slice(&(minifat_count as u32).to_le_bytes());
        let first_difat = difat_ids.first().copied().unwrap_or(ENDOFCHAIN);
        header[68..72].copy_from_slice(&first_difat.to_le_bytes());
        header[72..76].copy_from_slice(&(difat_count as u32).to_le_bytes());
        for slot in 0..HEADER_DIFAT_ENTRIES {
            let id = fat_ids.get(slot).copied().unwrap_or(FREESECT);
            let offset = 76 + slot * 4;
            header[offset..offset + 4].copy_from_slice(&id.to_le_bytes());
        }

        let mut image = header;
        for sector in &self.sectors {
            image.extend_from_slice(sector);
        }
        for chunk in fat.chunks(ids) {
            image.extend(chunk.iter().flat_map(|v| v.to_le_bytes()));
        }
        let overflow: Vec<u32> = fat_ids.iter().skip(HEADER_DIFAT_ENTRIES).copied().collect();
        for (i, &difat_id) in difat_ids.iter().enumerate() {
            let mut slots: Vec<u32> = overflow
                .iter()
                .skip(i * (ids - 1))
                .take(ids - 1)
                .copied()
                .collect();
            slots.resize(ids - 1, FREESECT);
            let next = difat_ids.get(i + 1).copied().unwrap_or(ENDOFCHAIN);
            debug_assert_eq!(difat_id as usize, used + fat_count + i);
            slots.push(next);
            image.extend(slots.iter().flat_map(|v| v.to_le_bytes()));
        }
        image
    }
}

/// One root storage holding the given streams.
pub(crate) fn flat_image(streams: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = ImageBuilder::new(512);
    let sids: Vec<u32> = streams
        .iter()
        .map(|(name, data)| builder.add_stream(name, data))
        .collect();
    builder.set_children(0, &sids);
    builder.build()
}
