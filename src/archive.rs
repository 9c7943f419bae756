//! Main Archive API
//!
//! An [`Archive`] is one opened pair of structure and store files. It is
//! opened at the start of a command, mutated in memory, persisted, and
//! dropped; nothing about it lives in global state.

use crate::allocator::{BitmapAllocator, BlockRange};
use crate::catalog::{Directory, Entry};
use crate::config::{ArchivePaths, Geometry};
use crate::error::{ArchiveError, Result};
use crate::io::{StoreFile, StructureFile};
use crate::structure::Structure;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

/// An opened archive
///
/// Combines geometry, directory, block allocator and the store file.
pub struct Archive {
    paths: ArchivePaths,

    /// Geometry and directory as persisted in the structure file
    structure: Structure,

    /// Block occupancy, rebuilt from the directory on open
    allocator: BitmapAllocator,

    /// Disk-backed store region
    store: StoreFile,
}

impl Archive {
    /// Create a new archive at `prefix`
    ///
    /// Writes a zero-filled store of `block_size * block_count` bytes and a
    /// structure file with an empty directory of `block_count` slots.
    ///
    /// # Errors
    ///
    /// - `InvalidGeometry` if either value is zero or the capacity overflows
    /// - `ArchiveAlreadyExists` if either sibling file is present
    pub fn create<P: AsRef<Path>>(prefix: P, block_size: u64, block_count: u64) -> Result<Self> {
        let geometry = Geometry::new(block_size, block_count)?;
        let paths = ArchivePaths::new(prefix);

        if paths.exists_any() {
            return Err(ArchiveError::ArchiveAlreadyExists {
                path: paths.prefix().to_path_buf(),
            });
        }

        let structure = Structure::new(geometry);
        let structure_bytes = structure.to_bytes()?;

        let store = StoreFile::create(paths.store(), geometry.capacity())
            .map_err(|e| already_exists_or(e, &paths))?;

        if let Err(e) = StructureFile::new(paths.structure()).create(&structure_bytes) {
            // Don't leave half an archive behind
            drop(store);
            if let Err(cleanup) = std::fs::remove_file(paths.store()) {
                tracing::warn!(
                    "Failed to remove {} after aborted create: {}",
                    paths.store().display(),
                    cleanup
                );
            }
            return Err(already_exists_or(e, &paths));
        }

        tracing::info!(
            prefix = %paths.prefix().display(),
            block_size,
            block_count,
            "created archive"
        );

        Ok(Archive {
            allocator: BitmapAllocator::new(block_count),
            paths,
            structure,
            store,
        })
    }

    /// Open an existing archive at `prefix`
    ///
    /// # Errors
    ///
    /// - `ArchiveNotFound` if either file is missing or cannot be opened
    /// - `CorruptStructure` if the structure file is malformed or the store
    ///   size does not match the recorded geometry
    pub fn open<P: AsRef<Path>>(prefix: P) -> Result<Self> {
        let paths = ArchivePaths::new(prefix);

        if !paths.exists_all() {
            tracing::debug!(prefix = %paths.prefix().display(), "archive files missing");
            return Err(ArchiveError::ArchiveNotFound {
                path: paths.prefix().to_path_buf(),
            });
        }

        let bytes = StructureFile::new(paths.structure())
            .read()
            .map_err(|e| not_found(&paths, paths.structure(), e))?;

        let store =
            StoreFile::open(paths.store()).map_err(|e| not_found(&paths, paths.store(), e))?;

        let structure = Structure::from_bytes(&bytes)?;
        let geometry = structure.geometry;

        let store_len = store.len()?;
        if store_len != geometry.capacity() {
            return Err(ArchiveError::CorruptStructure(format!(
                "store is {} bytes, geometry {} x {} needs {}",
                store_len,
                geometry.block_size(),
                geometry.block_count(),
                geometry.capacity()
            )));
        }

        let allocator =
            BitmapAllocator::from_ranges(geometry.block_count(), structure.directory.ranges())
                .map_err(|e| ArchiveError::CorruptStructure(e.to_string()))?;

        tracing::debug!(
            prefix = %paths.prefix().display(),
            entries = structure.directory.len(),
            free_blocks = allocator.free_blocks(),
            "opened archive"
        );

        Ok(Archive {
            paths,
            structure,
            allocator,
            store,
        })
    }

    /// Add the contents of the file at `source` under `name`
    ///
    /// # Errors
    ///
    /// - `SourceNotFound` if `source` cannot be opened or inspected
    /// - everything [`Archive::add_reader`] can return
    pub fn add_file<P: AsRef<Path>>(&mut self, source: P, name: &str) -> Result<&Entry> {
        let source = source.as_ref();
        let source_error = |e: io::Error| ArchiveError::SourceNotFound {
            path: source.to_path_buf(),
            source: e,
        };

        let file = File::open(source).map_err(source_error)?;
        let metadata = file.metadata().map_err(source_error)?;

        if !metadata.is_file() {
            return Err(source_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        self.add_reader(name, metadata.len(), file)
    }

    /// Add an in-memory buffer under `name`
    pub fn add_bytes(&mut self, name: &str, content: &[u8]) -> Result<&Entry> {
        self.add_reader(name, content.len() as u64, content)
    }

    /// Add exactly `size` bytes read from `reader` under `name`
    ///
    /// Every check runs before anything is written. Content goes to the
    /// store first; the structure file is replaced only once the bytes are
    /// on disk, so a failure never leaves an entry pointing at unwritten
    /// blocks.
    ///
    /// # Errors
    ///
    /// - `InvalidName` / `DuplicateName` / `DirectoryFull` from the directory
    /// - `CapacityExceeded` if `size` exceeds the archive capacity
    /// - `InsufficientSpace` if no contiguous run of free blocks is long enough
    pub fn add_reader<R: Read>(&mut self, name: &str, size: u64, reader: R) -> Result<&Entry> {
        self.structure.directory.check_insert(name)?;

        let geometry = self.structure.geometry;
        if size > geometry.capacity() {
            return Err(ArchiveError::CapacityExceeded {
                requested: size,
                capacity: geometry.capacity(),
            });
        }

        let range = self.allocator.reserve(geometry.blocks_for(size))?;

        if let Err(e) = self.write_content(range, size, reader) {
            self.release(range);
            return Err(e);
        }

        let entry = Entry::new(name, size, range);
        if let Err(e) = self.structure.directory.insert(entry) {
            self.release(range);
            return Err(e);
        }

        if let Err(e) = self.persist() {
            // Roll back: the entry was appended last, removal keeps order
            if let Err(rollback) = self.structure.directory.remove(name) {
                tracing::warn!("Failed to roll back entry {}: {}", name, rollback);
            }
            self.release(range);
            return Err(e);
        }

        tracing::info!(
            name,
            size,
            first_block = range.first,
            blocks = range.count,
            "added entry"
        );

        self.structure
            .directory
            .lookup(name)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))
    }

    /// Copy the content of `name` into `dest`, creating or truncating it
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if `name` is not stored
    /// - `DestinationNotWritable` if `dest` cannot be created for writing or
    ///   is one of the archive's own files
    pub fn get<P: AsRef<Path>>(&mut self, name: &str, dest: P) -> Result<u64> {
        let entry = self
            .structure
            .directory
            .lookup(name)
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;

        let dest = dest.as_ref();
        if self.is_archive_file(dest) {
            return Err(ArchiveError::DestinationNotWritable {
                path: dest.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "destination is a file of the archive itself",
                ),
            });
        }

        let file = File::create(dest).map_err(|e| ArchiveError::DestinationNotWritable {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        self.copy_entry(&entry, &mut writer)?;
        writer.flush()?;

        tracing::info!(name, size = entry.size, dest = %dest.display(), "extracted entry");

        Ok(entry.size)
    }

    /// Read the content of `name` into memory
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .structure
            .directory
            .lookup(name)
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;

        let offset = entry.range.byte_offset(self.structure.geometry.block_size());
        self.store.read_at(offset, entry.size)
    }

    /// Delete `name`, returning its blocks to the free pool
    ///
    /// The freed bytes are left in the store as they are.
    pub fn delete(&mut self, name: &str) -> Result<Entry> {
        let entry = self
            .structure
            .directory
            .lookup(name)
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;

        let previous = self.structure.directory.clone();
        self.structure.directory.remove(name)?;

        if let Err(e) = self.persist() {
            self.structure.directory = previous;
            return Err(e);
        }

        self.release(entry.range);

        tracing::info!(
            name,
            first_block = entry.first_block(),
            blocks = entry.block_count_used(),
            "deleted entry"
        );

        Ok(entry)
    }

    /// Look up an entry by name
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.structure.directory.lookup(name)
    }

    /// Live entries in insertion order
    pub fn list(&self) -> &[Entry] {
        self.structure.directory.list()
    }

    /// Bytes of content stored (exact sizes, no block rounding)
    pub fn used(&self) -> u64 {
        self.structure.directory.used_bytes()
    }

    /// Capacity minus [`Archive::used`]
    pub fn free(&self) -> u64 {
        self.structure.geometry.capacity() - self.used()
    }

    pub fn geometry(&self) -> Geometry {
        self.structure.geometry
    }

    pub fn paths(&self) -> &ArchivePaths {
        &self.paths
    }

    pub fn directory(&self) -> &Directory {
        &self.structure.directory
    }

    /// Byte and block level statistics
    pub fn stats(&self) -> ArchiveStats {
        let geometry = self.structure.geometry;
        ArchiveStats {
            block_size: geometry.block_size(),
            block_count: geometry.block_count(),
            capacity: geometry.capacity(),
            entries: self.structure.directory.len() as u64,
            used_bytes: self.used(),
            free_bytes: self.free(),
            used_blocks: self.allocator.used_blocks(),
            free_blocks: self.allocator.free_blocks(),
            largest_free_run: self.allocator.largest_free_run(),
        }
    }

    /// Sync the store and close the archive
    pub fn close(mut self) -> Result<()> {
        self.store.sync()
    }

    fn persist(&self) -> Result<()> {
        let bytes = self.structure.to_bytes()?;
        StructureFile::new(self.paths.structure()).replace(&bytes)
    }

    fn write_content<R: Read>(&mut self, range: BlockRange, size: u64, reader: R) -> Result<()> {
        if size == 0 {
            return Ok(());
        }

        let offset = range.byte_offset(self.structure.geometry.block_size());
        self.store.write_from(offset, size, reader)?;
        self.store.sync()
    }

    fn copy_entry<W: Write>(&mut self, entry: &Entry, writer: &mut W) -> Result<()> {
        if entry.size == 0 {
            return Ok(());
        }

        let offset = entry.range.byte_offset(self.structure.geometry.block_size());
        self.store.copy_to(offset, entry.size, writer)
    }

    /// True if `path` resolves to the structure or store file
    fn is_archive_file(&self, path: &Path) -> bool {
        // A destination that does not exist yet cannot be either file
        let Ok(target) = std::fs::canonicalize(path) else {
            return false;
        };

        [self.paths.structure(), self.paths.store()]
            .iter()
            .filter_map(|own| std::fs::canonicalize(own).ok())
            .any(|own| own == target)
    }

    fn release(&mut self, range: BlockRange) {
        if let Err(e) = self.allocator.release(range) {
            tracing::warn!("Failed to release blocks {:?}: {}", range, e);
        }
    }
}

/// Archive statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStats {
    pub block_size: u64,
    pub block_count: u64,
    pub capacity: u64,
    pub entries: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_blocks: u64,
    pub free_blocks: u64,
    pub largest_free_run: u64,
}

fn not_found(paths: &ArchivePaths, file: &Path, e: io::Error) -> ArchiveError {
    tracing::debug!("cannot open {}: {}", file.display(), e);
    ArchiveError::ArchiveNotFound {
        path: paths.prefix().to_path_buf(),
    }
}

fn already_exists_or(e: ArchiveError, paths: &ArchivePaths) -> ArchiveError {
    match e {
        ArchiveError::Io(io) if io.kind() == io::ErrorKind::AlreadyExists => {
            ArchiveError::ArchiveAlreadyExists {
                path: paths.prefix().to_path_buf(),
            }
        }
        other => other,
    }
}
