//! Directory entry metadata

use crate::allocator::BlockRange;
use std::fmt;

/// Longest entry name, in bytes, a directory slot can hold
pub const MAX_NAME_LEN: usize = 255;

/// One named file stored in the archive
///
/// Contains everything about an entry except its content:
/// - Exact byte size (not rounded to blocks)
/// - The contiguous block range holding the bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name, unique within the archive
    pub name: String,

    /// Content size in bytes
    pub size: u64,

    /// Blocks reserved for the content
    pub range: BlockRange,
}

impl Entry {
    pub fn new(name: impl Into<String>, size: u64, range: BlockRange) -> Self {
        Entry {
            name: name.into(),
            size,
            range,
        }
    }

    pub fn block_count_used(&self) -> u64 {
        self.range.count
    }

    pub fn first_block(&self) -> u64 {
        self.range.first
    }

    /// Last reserved block; zero-length entries report their first block
    pub fn last_block(&self) -> u64 {
        self.range.last_block()
    }
}

/// Listing line: `name,size,block_count_used,first_block,last_block`
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.name,
            self.size,
            self.block_count_used(),
            self.first_block(),
            self.last_block()
        )
    }
}
