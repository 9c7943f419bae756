//! Archive operations by path
//!
//! One function per command. Each opens the archive, performs the
//! operation and drops every file handle before returning, on success and
//! on error alike.

use crate::archive::Archive;
use crate::catalog::Entry;
use crate::error::Result;
use std::path::Path;

/// Create an empty archive with the given geometry
pub fn create<P: AsRef<Path>>(prefix: P, block_size: u64, block_count: u64) -> Result<()> {
    Archive::create(prefix, block_size, block_count)?.close()
}

/// Add the file at `source` to the archive under `name`
pub fn add<P: AsRef<Path>, S: AsRef<Path>>(prefix: P, source: S, name: &str) -> Result<Entry> {
    let mut archive = Archive::open(prefix)?;
    let entry = archive.add_file(source, name)?.clone();
    archive.close()?;
    Ok(entry)
}

/// Copy entry `name` out of the archive into `dest`
///
/// Returns the number of bytes written.
pub fn get<P: AsRef<Path>, D: AsRef<Path>>(prefix: P, name: &str, dest: D) -> Result<u64> {
    let mut archive = Archive::open(prefix)?;
    archive.get(name, dest)
}

/// Remove entry `name` and release its blocks
pub fn del<P: AsRef<Path>>(prefix: P, name: &str) -> Result<Entry> {
    let mut archive = Archive::open(prefix)?;
    let entry = archive.delete(name)?;
    archive.close()?;
    Ok(entry)
}

/// Capacity minus the exact sizes of all entries
pub fn free<P: AsRef<Path>>(prefix: P) -> Result<u64> {
    Ok(Archive::open(prefix)?.free())
}

/// Sum of the exact sizes of all entries
pub fn used<P: AsRef<Path>>(prefix: P) -> Result<u64> {
    Ok(Archive::open(prefix)?.used())
}

/// All entries in insertion order
pub fn list<P: AsRef<Path>>(prefix: P) -> Result<Vec<Entry>> {
    Ok(Archive::open(prefix)?.list().to_vec())
}
