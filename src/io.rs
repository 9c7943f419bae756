//! Disk I/O for the two archive files

use crate::error::{ArchiveError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Disk-backed store region (`<prefix>.store`)
pub struct StoreFile {
    file: File,
    path: PathBuf,
}

impl StoreFile {
    /// Create a zero-filled store of exactly `capacity` bytes
    ///
    /// Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P, capacity: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        // Extending with set_len fills with zeros
        file.set_len(capacity)?;
        file.sync_all()?;

        Ok(StoreFile {
            file,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Open an existing store for reading and writing
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        Ok(StoreFile {
            file,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Current length in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Write exactly `size` bytes from `reader` starting at `offset`
    ///
    /// Fails if the reader yields fewer or more than `size` bytes. Bytes
    /// already written are left in place; the caller owns the range.
    pub fn write_from<R: Read>(&mut self, offset: u64, size: u64, reader: R) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;

        // One byte past `size` reveals a reader that is too long
        let mut limited = reader.take(size + 1);
        let mut buffer = vec![0u8; WRITE_CHUNK.min(size as usize + 1)];
        let mut written = 0u64;

        loop {
            let n = match limited.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if written + n as u64 > size {
                return Err(length_mismatch(size));
            }

            self.file.write_all(&buffer[..n])?;
            written += n as u64;
        }

        if written != size {
            return Err(length_mismatch(size));
        }

        self.file.flush()?;
        Ok(())
    }

    /// Read exactly `len` bytes from `offset`
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.copy_to(offset, len, &mut buffer)?;
        Ok(buffer)
    }

    /// Stream exactly `len` bytes from `offset` into `writer`
    pub fn copy_to<W: Write>(&mut self, offset: u64, len: u64, writer: &mut W) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;

        let copied = io::copy(&mut (&mut self.file).take(len), writer)?;
        if copied != len {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "store {} ended after {} of {} bytes",
                    self.path.display(),
                    copied,
                    len
                ),
            )));
        }

        Ok(())
    }

    /// Sync all writes to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

const WRITE_CHUNK: usize = 64 * 1024;

fn length_mismatch(expected: u64) -> ArchiveError {
    ArchiveError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("source did not yield exactly {} bytes", expected),
    ))
}

/// Metadata file (`<prefix>.structure`)
///
/// Always read and written whole.
pub struct StructureFile {
    path: PathBuf,
}

impl StructureFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        StructureFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the whole file
    pub fn read(&self) -> io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Write a new file; fails if it already exists
    pub fn create(&self, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;

        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Atomically replace the file contents
    ///
    /// Writes a temporary file next to the target and renames it over the
    /// target, so readers see either the old or the new contents.
    pub fn replace(&self, bytes: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        // NamedTempFile is created 0600; keep the mode of the file it replaces
        match fs::metadata(&self.path) {
            Ok(metadata) => temp.as_file().set_permissions(metadata.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        temp.persist(&self.path).map_err(|e| ArchiveError::Io(e.error))?;

        Ok(())
    }
}
