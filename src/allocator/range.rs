//! Contiguous block ranges
//!
//! Every block-to-byte conversion in the crate goes through [`BlockRange`].

/// A contiguous run of blocks `[first, first + count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    /// Starting block ID
    pub first: u64,
    /// Number of contiguous blocks
    pub count: u64,
}

impl BlockRange {
    pub fn new(first: u64, count: u64) -> Self {
        BlockRange { first, count }
    }

    /// The range held by zero-length content
    pub fn empty() -> Self {
        BlockRange { first: 0, count: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// One past the last block, `None` on overflow
    pub fn end(&self) -> Option<u64> {
        self.first.checked_add(self.count)
    }

    /// Last block in the range
    ///
    /// Empty ranges report their first block.
    pub fn last_block(&self) -> u64 {
        if self.count == 0 {
            self.first
        } else {
            self.first + self.count - 1
        }
    }

    /// True if both ranges share at least one block
    pub fn overlaps(&self, other: &BlockRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.first <= other.last_block() && other.first <= self.last_block()
    }

    /// Byte offset of the first block in the store file
    pub fn byte_offset(&self, block_size: u64) -> u64 {
        self.first * block_size
    }

    /// Bytes spanned by the whole range, including slack in the last block
    pub fn byte_length(&self, block_size: u64) -> u64 {
        self.count * block_size
    }
}
