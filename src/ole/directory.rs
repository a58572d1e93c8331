//! Directory parsing and hierarchy reconstruction
//!
//! The directory stream is a flat array of 128-byte entries. Entry 0 is the
//! root storage; every storage points at the root of a red-black tree of its
//! children through `sid_child`, and siblings are linked through
//! `sid_left`/`sid_right`. An in-order walk of a sibling tree yields the
//! children in the format's name order, which is the enumeration order this
//! crate exposes.

use super::consts::*;
use super::name::compare_names;
use super::options::ReaderOptions;
use crate::common::binary::decode_utf16le;
use crate::common::error::{Error, Result};
use fixedbitset::FixedBitSet;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
/// Based on Microsoft OLE2 specification.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
#[allow(dead_code)] // full on-disk layout, not every field is consulted
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (0 = unused, 1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    /// Left sibling SID
    sid_left: U32<LE>,
    /// Right sibling SID
    sid_right: U32<LE>,
    /// Child SID
    sid_child: U32<LE>,
    /// CLSID (16 bytes)
    clsid: [u8; 16],
    /// State bits
    state_bits: U32<LE>,
    /// Creation time (FILETIME)
    creation_time: U64<LE>,
    /// Modified time (FILETIME)
    modified_time: U64<LE>,
    /// Starting sector
    start_sector: U32<LE>,
    /// Stream size
    stream_size: U64<LE>,
}

/// Class identifier attached to a storage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Clsid([u8; 16]);

impl Clsid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Whether the identifier is all zeros (no class).
    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for Clsid {
    /// Formats as `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            b[8],
            b[9],
            b[10],
            b[11],
            b[12],
            b[13],
            b[14],
            b[15],
        )
    }
}

impl fmt::Debug for Clsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clsid({})", self)
    }
}

/// Kind of object a hierarchy node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The root storage (directory entry 0)
    Root,
    /// A nested storage
    Storage,
    /// A stream
    Stream,
}

/// One entry of the directory array as stored on disk.
#[derive(Debug, Clone)]
struct DirEntry {
    name: String,
    entry_type: u8,
    sid_left: u32,
    sid_right: u32,
    sid_child: u32,
    clsid: Clsid,
    start_sector: u32,
    size: u64,
}

impl DirEntry {
    fn parse(data: &[u8], major_version: u16) -> Result<Self> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| Error::corrupted("failed to parse directory entry"))?;

        let name_len = (raw.name_len.get() as usize).min(raw.name.len());
        let name = decode_utf16le(&raw.name[..name_len]);

        // Version 3 files only use the low 32 bits of the size
        let size = if major_version == 3 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        Ok(DirEntry {
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            clsid: Clsid::from_bytes(raw.clsid),
            start_sector: raw.start_sector.get(),
            size,
        })
    }
}

/// A storage or stream of the reconstructed hierarchy.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Index of the directory entry this node came from
    pub sid: u32,
    pub name: String,
    pub kind: EntryKind,
    pub clsid: Clsid,
    pub start_sector: u32,
    pub size: u64,
    /// Child node indexes in sibling-tree order (storages only)
    pub children: Vec<usize>,
}

impl Node {
    #[inline]
    pub fn is_storage(&self) -> bool {
        matches!(self.kind, EntryKind::Root | EntryKind::Storage)
    }
}

/// The immutable storage/stream hierarchy built at open time.
#[derive(Debug, Clone)]
pub(crate) struct Directory {
    /// All reachable nodes; index 0 is the root storage
    nodes: Vec<Node>,
}

impl Directory {
    /// Parse the directory stream and rebuild the hierarchy.
    pub fn parse(data: &[u8], major_version: u16, options: &ReaderOptions) -> Result<Self> {
        let entries = data
            .chunks_exact(DIRENTRY_SIZE)
            .map(|chunk| DirEntry::parse(chunk, major_version))
            .collect::<Result<Vec<_>>>()?;

        let root = entries
            .first()
            .ok_or_else(|| Error::corrupted("directory stream is empty"))?;
        if root.entry_type != STGTY_ROOT {
            return Err(Error::corrupted(format!(
                "directory entry 0 has type {} instead of root storage",
                root.entry_type
            )));
        }
        if root.sid_left != NOSTREAM || root.sid_right != NOSTREAM {
            return Err(Error::corrupted("root storage has siblings"));
        }

        let mut builder = TreeBuilder {
            entries: &entries,
            visited: FixedBitSet::with_capacity(entries.len()),
            nodes: Vec::new(),
        };
        builder.visited.insert(0);
        builder.nodes.push(Node {
            sid: 0,
            name: root.name.clone(),
            kind: EntryKind::Root,
            clsid: root.clsid,
            start_sector: root.start_sector,
            size: root.size,
            children: Vec::new(),
        });

        let mut pending = vec![(0usize, root.sid_child)];
        while let Some((parent, child_sid)) = pending.pop() {
            let children = builder.expand(child_sid, &mut pending)?;
            if options.strict_names {
                builder.check_unique_names(&children)?;
            }
            builder.nodes[parent].children = children;
        }

        let reachable = builder.visited.count_ones(..);
        let live = entries
            .iter()
            .filter(|entry| entry.entry_type != STGTY_EMPTY)
            .count();
        debug!(
            entries = entries.len(),
            nodes = builder.nodes.len(),
            unreachable = live.saturating_sub(reachable),
            "rebuilt directory hierarchy"
        );

        Ok(Directory {
            nodes: builder.nodes,
        })
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    #[inline]
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

struct TreeBuilder<'a> {
    entries: &'a [DirEntry],
    /// Entries already placed in the hierarchy
    visited: FixedBitSet,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn entry(&self, sid: u32) -> Result<&'a DirEntry> {
        if sid > MAXREGSID {
            return Err(Error::corrupted(format!(
                "invalid directory link {:#010x}",
                sid
            )));
        }
        let entries = self.entries;
        entries.get(sid as usize).ok_or_else(|| {
            Error::corrupted(format!(
                "directory link {} is beyond the {} entries",
                sid,
                entries.len()
            ))
        })
    }

    /// Walk the sibling tree rooted at `first` in order and create a node per
    /// live entry. Storages are queued on `pending` for their own expansion.
    fn expand(&mut self, first: u32, pending: &mut Vec<(usize, u32)>) -> Result<Vec<usize>> {
        let mut ordered = Vec::new();
        let mut stack = Vec::new();
        let mut current = first;

        loop {
            while current != NOSTREAM {
                let entry = self.entry(current)?;
                if self.visited.put(current as usize) {
                    return Err(Error::corrupted(format!(
                        "directory entry {} is linked more than once",
                        current
                    )));
                }
                stack.push(current);
                current = entry.sid_left;
            }
            let Some(sid) = stack.pop() else {
                break;
            };
            ordered.push(sid);
            current = self.entries[sid as usize].sid_right;
        }

        let mut children = Vec::with_capacity(ordered.len());
        for sid in ordered {
            let entry = &self.entries[sid as usize];
            let kind = match entry.entry_type {
                STGTY_STORAGE => EntryKind::Storage,
                STGTY_STREAM => EntryKind::Stream,
                STGTY_EMPTY => {
                    warn!(sid, "skipping unused directory entry linked into the tree");
                    continue;
                },
                STGTY_ROOT => {
                    return Err(Error::corrupted(format!(
                        "directory entry {} is a second root storage",
                        sid
                    )));
                },
                other => {
                    return Err(Error::corrupted(format!(
                        "directory entry {} has invalid type {}",
                        sid, other
                    )));
                },
            };

            let index = self.nodes.len();
            if kind == EntryKind::Storage {
                pending.push((index, entry.sid_child));
            }
            self.nodes.push(Node {
                sid,
                name: entry.name.clone(),
                kind,
                clsid: entry.clsid,
                start_sector: entry.start_sector,
                size: entry.size,
                children: Vec::new(),
            });
            children.push(index);
        }
        Ok(children)
    }

    fn check_unique_names(&self, children: &[usize]) -> Result<()> {
        let mut names: Vec<&str> = children
            .iter()
            .map(|&index| self.nodes[index].name.as_str())
            .collect();
        names.sort_by(|a, b| compare_names(a, b));
        for pair in names.windows(2) {
            if compare_names(pair[0], pair[1]) == Ordering::Equal {
                return Err(Error::corrupted(format!(
                    "duplicate entry name \"{}\" within one storage",
                    pair[1]
                )));
            }
        }
        Ok(())
    }
}
