//! Archive geometry and sibling-file naming
//!
//! An archive has no configuration file. Its only settings are the block
//! geometry chosen at `create` time, persisted in the structure header, and
//! the path prefix the two archive files are derived from.

use crate::error::{ArchiveError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to the path prefix for the metadata file
pub const STRUCTURE_SUFFIX: &str = ".structure";

/// Suffix appended to the path prefix for the raw data file
pub const STORE_SUFFIX: &str = ".store";

/// Environment variable holding the `tracing` filter for the `vfs` binary
pub const LOG_ENV_VAR: &str = "VFS_LOG";

/// Filter used when [`LOG_ENV_VAR`] is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Block geometry of an archive
///
/// Immutable once the archive is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    block_size: u64,
    block_count: u64,
}

impl Geometry {
    /// Create a validated geometry
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeometry` if either value is zero or the capacity
    /// does not fit in a `u64`.
    pub fn new(block_size: u64, block_count: u64) -> Result<Self> {
        if block_size == 0 {
            return Err(ArchiveError::InvalidGeometry(
                "block size must be greater than zero".to_string(),
            ));
        }

        if block_count == 0 {
            return Err(ArchiveError::InvalidGeometry(
                "block count must be greater than zero".to_string(),
            ));
        }

        if block_size.checked_mul(block_count).is_none() {
            return Err(ArchiveError::InvalidGeometry(format!(
                "capacity {} x {} overflows",
                block_size, block_count
            )));
        }

        Ok(Geometry {
            block_size,
            block_count,
        })
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Total bytes in the store region
    pub fn capacity(&self) -> u64 {
        // Checked in `new`
        self.block_size * self.block_count
    }

    /// Number of blocks needed to hold `bytes` (ceiling division)
    pub fn blocks_for(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.block_size)
    }
}

/// The two sibling files making up an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePaths {
    prefix: PathBuf,
    structure: PathBuf,
    store: PathBuf,
}

impl ArchivePaths {
    /// Derive `<prefix>.structure` and `<prefix>.store`
    ///
    /// The suffix is appended to the whole prefix, so `data.v1` becomes
    /// `data.v1.store` rather than replacing the `.v1` extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockvault::config::ArchivePaths;
    /// use std::path::Path;
    ///
    /// let paths = ArchivePaths::new("backups/archive");
    /// assert_eq!(paths.structure(), Path::new("backups/archive.structure"));
    /// assert_eq!(paths.store(), Path::new("backups/archive.store"));
    /// ```
    pub fn new<P: AsRef<Path>>(prefix: P) -> Self {
        let prefix = prefix.as_ref().to_path_buf();
        ArchivePaths {
            structure: with_suffix(&prefix, STRUCTURE_SUFFIX),
            store: with_suffix(&prefix, STORE_SUFFIX),
            prefix,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn structure(&self) -> &Path {
        &self.structure
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    /// True if either file is present
    pub fn exists_any(&self) -> bool {
        self.structure.exists() || self.store.exists()
    }

    /// True if both files are present
    pub fn exists_all(&self) -> bool {
        self.structure.exists() && self.store.exists()
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
