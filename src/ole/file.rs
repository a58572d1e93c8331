//! Compound file reader and the storage/stream handles it hands out.
//!
//! Opening a file parses the header, loads the FAT, the directory and the
//! MiniFAT, and rebuilds the storage hierarchy once. The hierarchy is
//! immutable afterwards; stream payloads are read on demand through the
//! shared sector reader, which [`CompoundFile::close`] releases.

use super::consts::*;
use super::directory::{Clsid, Directory, EntryKind, Node};
use super::fat::{AllocationTable, load_fat, load_minifat};
use super::header::{Geometry, Header};
use super::minifat::MiniStream;
use super::name::{decode_msi_name, names_equal};
use super::options::ReaderOptions;
use super::sector::SectorReader;
use crate::common::detection::PackageKind;
use crate::common::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Everything needed to read stream payloads. Dropped on close.
struct OpenState<R> {
    sectors: SectorReader<R>,
    fat: AllocationTable,
    minifat: AllocationTable,
    mini_stream: MiniStream,
}

impl<R: Read + Seek> OpenState<R> {
    /// Feed the first `want` bytes of the stream described by `node` to
    /// `sink`, one sector at a time. Returns the number of bytes delivered.
    fn read_stream(
        &mut self,
        node: &Node,
        geometry: &Geometry,
        want: u64,
        mut sink: impl FnMut(&[u8]) -> Result<()>,
    ) -> Result<u64> {
        let want = want.min(node.size);
        if want == 0 {
            return Ok(0);
        }

        let mini = node.size < u64::from(geometry.mini_stream_cutoff);
        let unit = if mini {
            geometry.mini_sector_size
        } else {
            geometry.sector_size
        };
        let chain = if mini {
            self.minifat.stream_chain(node.start_sector, node.size, unit)?
        } else {
            self.fat.stream_chain(node.start_sector, node.size, unit)?
        };

        let mut buffer = vec![0u8; unit];
        let mut delivered = 0u64;
        for &sector in &chain {
            if delivered == want {
                break;
            }
            let len = (want - delivered).min(unit as u64) as usize;
            let piece = &mut buffer[..len];
            if mini {
                let (host, within) = self.mini_stream.locate(sector, len)?;
                self.sectors.read_in_sector(host, within, piece)?;
            } else {
                self.sectors.read_in_sector(sector, 0, piece)?;
            }
            sink(piece)?;
            delivered += len as u64;
        }
        Ok(delivered)
    }
}

/// A read-only compound file (MSI, MSP, MST, ...).
///
/// Storage and stream handles borrow the file; once [`close`](Self::close)
/// has been called every operation on them fails with [`Error::Closed`].
///
/// # Example
///
/// ```no_run
/// use msiole::ole::CompoundFile;
///
/// # fn main() -> msiole::Result<()> {
/// let package = CompoundFile::open("product.msp")?;
/// let root = package.root()?;
/// for stream in root.streams()? {
///     println!("{} ({} bytes)", stream.display_name(), stream.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct CompoundFile<R> {
    state: Mutex<Option<OpenState<R>>>,
    directory: Directory,
    geometry: Geometry,
    file_size: u64,
    options: ReaderOptions,
}

impl CompoundFile<File> {
    /// Open a compound file from disk with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ReaderOptions::default())
    }

    /// Open a compound file from disk.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with(file, options)
    }
}

impl<R: Read + Seek> CompoundFile<R> {
    /// Parse a compound file from any seekable reader with default options.
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, ReaderOptions::default())
    }

    /// Parse a compound file from any seekable reader.
    ///
    /// Validates the header, loads the allocation tables and rebuilds the
    /// directory hierarchy. No stream payload is read yet.
    pub fn from_reader_with(mut reader: R, options: ReaderOptions) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header_len = file_size.min(HEADER_SIZE as u64) as usize;
        let mut header_data = vec![0u8; header_len];
        reader
            .read_exact(&mut header_data)
            .map_err(|source| Error::ReadFailed {
                offset: 0,
                length: header_len,
                source,
            })?;
        let header = Header::parse(&header_data)?;
        let geometry = header.geometry;

        let mut sectors = SectorReader::new(reader, file_size, geometry);
        let fat = load_fat(&mut sectors, &header)?;

        let dir_chain = fat.chain(geometry.first_dir_sector, fat.len())?;
        let mut dir_data = Vec::with_capacity(dir_chain.len() * geometry.sector_size);
        for &sector in &dir_chain {
            dir_data.extend_from_slice(&sectors.read_sector(sector)?);
        }
        let directory = Directory::parse(&dir_data, geometry.major_version, &options)?;

        let minifat = load_minifat(&mut sectors, &fat, &header)?;
        let root = directory.root();
        let mini_stream = if root.size == 0 {
            MiniStream::default()
        } else {
            MiniStream::load(&fat, root.start_sector, root.size, &geometry)?
        };

        debug!(
            version = geometry.major_version,
            sector_size = geometry.sector_size,
            file_size,
            fat_entries = fat.len(),
            minifat_entries = minifat.len(),
            mini_stream_size = mini_stream.size(),
            nodes = directory.len(),
            "opened compound file"
        );

        Ok(CompoundFile {
            state: Mutex::new(Some(OpenState {
                sectors,
                fat,
                minifat,
                mini_stream,
            })),
            directory,
            geometry,
            file_size,
            options,
        })
    }

    /// Release the underlying reader. Calling it again has no effect.
    pub fn close(&self) {
        if self.state.lock().take().is_some() {
            debug!("closed compound file");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().is_none()
    }

    /// Sector geometry taken from the header.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// The root storage.
    pub fn root(&self) -> Result<Storage<'_, R>> {
        self.ensure_open()?;
        Ok(Storage {
            file: self,
            index: 0,
        })
    }

    /// Installer flavour identified by the root storage's class ID.
    pub fn package_kind(&self) -> PackageKind {
        PackageKind::from_clsid(&self.directory.root().clsid)
    }

    /// Look up a stream by its path of entry names, e.g.
    /// `&["Binary", "Icon"]`. Names compare case-insensitively.
    pub fn stream_at(&self, path: &[&str]) -> Result<Stream<'_, R>> {
        let Some((last, storages)) = path.split_last() else {
            return Err(Error::ComponentNotFound(String::new()));
        };
        let mut storage = self.root()?;
        for name in storages {
            storage = storage
                .sub_storage(name)
                .map_err(|_| Error::ComponentNotFound(path.join("/")))?;
        }
        storage
            .stream(last)
            .map_err(|_| Error::ComponentNotFound(path.join("/")))
    }

    /// Paths of every stream in the file, depth first in tree order.
    pub fn list_streams(&self) -> Result<Vec<Vec<String>>> {
        self.ensure_open()?;
        let mut streams = Vec::new();
        let mut pending: Vec<(usize, Vec<String>)> = Vec::new();
        let push_children =
            |pending: &mut Vec<(usize, Vec<String>)>, index: usize, path: &[String]| {
                // Reversed so the first child is popped first
                for &child in self.directory.node(index).children.iter().rev() {
                    let mut child_path = path.to_vec();
                    child_path.push(self.directory.node(child).name.clone());
                    pending.push((child, child_path));
                }
            };
        push_children(&mut pending, 0, &[]);
        while let Some((index, path)) = pending.pop() {
            if self.directory.node(index).is_storage() {
                push_children(&mut pending, index, &path);
            } else {
                streams.push(path);
            }
        }
        Ok(streams)
    }

    /// Every stream, at any depth, whose content starts with the cabinet
    /// signature.
    pub fn cabinet_streams(&self) -> Result<Vec<Stream<'_, R>>> {
        let mut found = Vec::new();
        let mut pending = vec![self.root()?];
        while let Some(storage) = pending.pop() {
            for stream in storage.streams()? {
                if stream.is_cabinet()? {
                    found.push(stream);
                }
            }
            pending.extend(storage.sub_storages()?.into_iter().rev());
        }
        Ok(found)
    }

    fn node(&self, index: usize) -> &Node {
        self.directory.node(index)
    }

    fn read_stream(
        &self,
        index: usize,
        want: u64,
        sink: impl FnMut(&[u8]) -> Result<()>,
    ) -> Result<u64> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(Error::Closed)?;
        state.read_stream(self.node(index), &self.geometry, want, sink)
    }
}

impl<R> fmt::Debug for CompoundFile<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundFile")
            .field("geometry", &self.geometry)
            .field("nodes", &self.directory.len())
            .field("closed", &self.state.lock().is_none())
            .finish()
    }
}

/// A storage (directory-like node) of an open compound file.
pub struct Storage<'a, R> {
    file: &'a CompoundFile<R>,
    index: usize,
}

impl<R> Clone for Storage<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Storage<'_, R> {}

impl<'a, R: Read + Seek> Storage<'a, R> {
    fn node(&self) -> &'a Node {
        self.file.node(self.index)
    }

    /// Entry name as stored; the root storage is usually "Root Entry".
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn kind(&self) -> EntryKind {
        self.node().kind
    }

    pub fn clsid(&self) -> Clsid {
        self.node().clsid
    }

    fn children(&self) -> Result<impl Iterator<Item = (usize, &'a Node)> + 'a> {
        self.file.ensure_open()?;
        let file = self.file;
        Ok(self
            .node()
            .children
            .iter()
            .map(move |&child| (child, file.node(child))))
    }

    /// Child storages in sibling-tree order.
    pub fn sub_storages(&self) -> Result<Vec<Storage<'a, R>>> {
        let file = self.file;
        Ok(self
            .children()?
            .filter(|(_, node)| node.is_storage())
            .map(|(index, _)| Storage { file, index })
            .collect())
    }

    /// Child streams in sibling-tree order.
    pub fn streams(&self) -> Result<Vec<Stream<'a, R>>> {
        let file = self.file;
        Ok(self
            .children()?
            .filter(|(_, node)| node.kind == EntryKind::Stream)
            .map(|(index, _)| Stream { file, index })
            .collect())
    }

    /// Child stream called `name` (case-insensitive).
    pub fn stream(&self, name: &str) -> Result<Stream<'a, R>> {
        let file = self.file;
        self.children()?
            .find(|(_, node)| node.kind == EntryKind::Stream && names_equal(&node.name, name))
            .map(|(index, _)| Stream { file, index })
            .ok_or_else(|| Error::ComponentNotFound(name.to_string()))
    }

    /// Child storage called `name` (case-insensitive).
    pub fn sub_storage(&self, name: &str) -> Result<Storage<'a, R>> {
        let file = self.file;
        self.children()?
            .find(|(_, node)| node.is_storage() && names_equal(&node.name, name))
            .map(|(index, _)| Storage { file, index })
            .ok_or_else(|| Error::ComponentNotFound(name.to_string()))
    }
}

impl<R> fmt::Debug for Storage<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.file.directory.node(self.index);
        f.debug_struct("Storage")
            .field("name", &node.name)
            .field("clsid", &node.clsid)
            .finish()
    }
}

/// A stream (leaf node holding bytes) of an open compound file.
pub struct Stream<'a, R> {
    file: &'a CompoundFile<R>,
    index: usize,
}

impl<R> Clone for Stream<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Stream<'_, R> {}

impl<'a, R: Read + Seek> Stream<'a, R> {
    fn node(&self) -> &'a Node {
        self.file.node(self.index)
    }

    /// Entry name as stored.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Name with Windows Installer packing undone.
    pub fn display_name(&self) -> String {
        decode_msi_name(self.name())
    }

    /// Declared length in bytes.
    pub fn len(&self) -> u64 {
        self.node().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the payload lives in the mini stream.
    pub fn is_mini(&self) -> bool {
        self.len() < u64::from(self.file.geometry.mini_stream_cutoff)
    }

    /// Read the whole payload.
    ///
    /// The result always has exactly [`len`](Self::len) bytes.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let size = self.len();
        if size > self.file.options.max_stream_size {
            return Err(Error::corrupted(format!(
                "stream \"{}\" declares {} bytes, more than the {} byte limit",
                self.name(),
                size,
                self.file.options.max_stream_size
            )));
        }
        // The declared size is untrusted until the chain is walked
        let mut data = Vec::with_capacity(size.min(self.file.file_size) as usize);
        let read = self.file.read_stream(self.index, size, |piece| {
            data.extend_from_slice(piece);
            Ok(())
        })?;
        if read != size {
            return Err(Error::corrupted(format!(
                "stream \"{}\" yielded {} of {} bytes",
                self.name(),
                read,
                size
            )));
        }
        Ok(data)
    }

    /// Whether the payload starts with the "MSCF" cabinet signature.
    ///
    /// Only the first four bytes are read.
    pub fn is_cabinet(&self) -> Result<bool> {
        self.file.ensure_open()?;
        if self.len() < CAB_MAGIC.len() as u64 {
            return Ok(false);
        }
        let mut prefix = Vec::with_capacity(CAB_MAGIC.len());
        self.file
            .read_stream(self.index, CAB_MAGIC.len() as u64, |piece| {
                prefix.extend_from_slice(piece);
                Ok(())
            })?;
        Ok(prefix.starts_with(CAB_MAGIC))
    }

    /// Copy the payload into `writer` sector by sector.
    pub fn copy_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        let size = self.len();
        let copied = self.file.read_stream(self.index, size, |piece| {
            writer.write_all(piece)?;
            Ok(())
        })?;
        if copied != size {
            return Err(Error::corrupted(format!(
                "stream \"{}\" yielded {} of {} bytes",
                self.name(),
                copied,
                size
            )));
        }
        Ok(copied)
    }
}

impl<R> fmt::Debug for Stream<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.file.directory.node(self.index);
        f.debug_struct("Stream")
            .field("sid", &node.sid)
            .field("name", &node.name)
            .field("len", &node.size)
            .finish()
    }
}

/// Check if a file/data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && data.starts_with(MAGIC)
}
