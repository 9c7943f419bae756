//! Flat directory of archive entries
//!
//! The directory maps entry names to their size and block range. Entries
//! are kept in insertion order, which is also the order they are listed
//! and persisted in.

pub mod metadata;

pub use metadata::{Entry, MAX_NAME_LEN};

use crate::allocator::BlockRange;
use crate::error::{ArchiveError, Result};

/// Directory for managing entry metadata
///
/// Provides the name-indexed view over the slot table:
/// - Insert entries (names are unique)
/// - Look up entries by name
/// - Remove entries, handing back their block range
/// - List entries in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    /// Live entries in insertion order
    entries: Vec<Entry>,

    /// Number of slots in the on-disk table
    slots: u64,
}

impl Directory {
    /// Create an empty directory with room for `slots` entries
    pub fn new(slots: u64) -> Self {
        Directory {
            entries: Vec::new(),
            slots,
        }
    }

    /// Build a directory from decoded entries, checking uniqueness
    pub fn from_entries(slots: u64, entries: Vec<Entry>) -> Result<Self> {
        let mut directory = Directory::new(slots);
        for entry in entries {
            directory.insert(entry)?;
        }
        Ok(directory)
    }

    /// Look up an entry by name
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Append an entry
    ///
    /// # Errors
    ///
    /// - `InvalidName` for an empty or over-long name
    /// - `DuplicateName` if the name is already present
    /// - `DirectoryFull` if every slot is occupied
    pub fn insert(&mut self, entry: Entry) -> Result<()> {
        self.check_insert(&entry.name)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Run the checks of [`Directory::insert`] without inserting
    pub fn check_insert(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        if self.contains(name) {
            return Err(ArchiveError::DuplicateName(name.to_string()));
        }

        if self.entries.len() as u64 >= self.slots {
            return Err(ArchiveError::DirectoryFull { slots: self.slots });
        }

        Ok(())
    }

    /// Remove an entry, returning its block range for release
    pub fn remove(&mut self, name: &str) -> Result<BlockRange> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;

        // Vec::remove keeps the survivors in insertion order
        Ok(self.entries.remove(index).range)
    }

    /// Entries in insertion order
    pub fn list(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes (logical usage)
    pub fn used_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    /// Block ranges of all live entries
    pub fn ranges(&self) -> impl Iterator<Item = &BlockRange> {
        self.entries.iter().map(|entry| &entry.range)
    }
}

/// Check an entry name: non-empty and at most [`MAX_NAME_LEN`] bytes
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ArchiveError::InvalidName(
            "name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ArchiveError::InvalidName(format!(
            "name is {} bytes, limit is {}",
            name.len(),
            MAX_NAME_LEN
        )));
    }

    Ok(())
}
