//! Bitmap allocator for the store region
//!
//! One bit per block, packed into `u64` words. Reservations are contiguous
//! runs found by a first-fit scan from block 0.

use crate::allocator::BlockRange;
use crate::error::{ArchiveError, Result};

/// Bitmap allocator for store blocks
///
/// Represents free/allocated state with bits:
/// - 0 = free block
/// - 1 = allocated block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapAllocator {
    /// Bitmap words (each word = 64 bits = 64 blocks)
    bitmap: Vec<u64>,

    /// Total number of blocks tracked
    total_blocks: u64,

    /// Number of free blocks available
    free_blocks: u64,
}

impl BitmapAllocator {
    /// Create an allocator with every block free
    pub fn new(total_blocks: u64) -> Self {
        let num_words = total_blocks.div_ceil(64) as usize;
        BitmapAllocator {
            bitmap: vec![0u64; num_words],
            total_blocks,
            free_blocks: total_blocks,
        }
    }

    /// Rebuild occupancy from the ranges held by live entries
    ///
    /// Fails if a range leaves the region or two ranges overlap.
    pub fn from_ranges<'a, I>(total_blocks: u64, ranges: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a BlockRange>,
    {
        let mut alloc = Self::new(total_blocks);
        for range in ranges {
            alloc.claim(*range)?;
        }
        Ok(alloc)
    }

    /// Reserve the first run of `num_blocks` contiguous free blocks
    ///
    /// A request for zero blocks always succeeds with an empty range and
    /// touches nothing.
    pub fn reserve(&mut self, num_blocks: u64) -> Result<BlockRange> {
        if num_blocks == 0 {
            return Ok(BlockRange::empty());
        }

        if num_blocks > self.free_blocks {
            return Err(ArchiveError::InsufficientSpace { blocks: num_blocks });
        }

        let first = self
            .find_free_run(num_blocks)
            .ok_or(ArchiveError::InsufficientSpace { blocks: num_blocks })?;

        let range = BlockRange::new(first, num_blocks);
        self.mark_allocated(range);
        self.free_blocks -= num_blocks;

        tracing::debug!(first, count = num_blocks, "reserved block run");

        Ok(range)
    }

    /// Mark a specific range allocated
    ///
    /// Every block in the range must currently be free.
    pub fn claim(&mut self, range: BlockRange) -> Result<()> {
        self.check_bounds(range)?;

        if let Some(block_id) =
            (range.first..range.first + range.count).find(|&b| self.is_allocated(b))
        {
            return Err(ArchiveError::BlockAlreadyAllocated(block_id));
        }

        self.mark_allocated(range);
        self.free_blocks -= range.count;
        Ok(())
    }

    /// Return a range to the free pool
    pub fn release(&mut self, range: BlockRange) -> Result<()> {
        self.check_bounds(range)?;

        let mut freed = 0u64;
        for block_id in range.first..range.first + range.count {
            if !self.is_allocated(block_id) {
                // Already free - this is a double-free bug
                tracing::warn!("Double-free detected for block {}", block_id);
                continue;
            }
            let (word_idx, bit_idx) = Self::locate(block_id);
            self.bitmap[word_idx] &= !(1u64 << bit_idx);
            freed += 1;
        }

        self.free_blocks += freed;
        Ok(())
    }

    /// Check if a specific block is allocated
    pub fn is_allocated(&self, block_id: u64) -> bool {
        if block_id >= self.total_blocks {
            return false;
        }

        let (word_idx, bit_idx) = Self::locate(block_id);
        (self.bitmap[word_idx] & (1u64 << bit_idx)) != 0
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn free_blocks(&self) -> u64 {
        self.free_blocks
    }

    pub fn used_blocks(&self) -> u64 {
        self.total_blocks - self.free_blocks
    }

    /// Length of the longest run of free blocks
    pub fn largest_free_run(&self) -> u64 {
        let mut largest = 0u64;
        let mut current = 0u64;

        for block_id in 0..self.total_blocks {
            if self.is_allocated(block_id) {
                current = 0;
            } else {
                current += 1;
                largest = largest.max(current);
            }
        }

        largest
    }

    fn find_free_run(&self, num_blocks: u64) -> Option<u64> {
        let mut run_start = 0u64;
        let mut run_len = 0u64;
        let mut block_id = 0u64;

        while block_id < self.total_blocks {
            // Whole-word fast paths
            if block_id % 64 == 0 && block_id + 64 <= self.total_blocks {
                let word = self.bitmap[(block_id / 64) as usize];
                if word == u64::MAX {
                    run_len = 0;
                    block_id += 64;
                    continue;
                }
                if word == 0 {
                    if run_len == 0 {
                        run_start = block_id;
                    }
                    run_len += 64;
                    if run_len >= num_blocks {
                        return Some(run_start);
                    }
                    block_id += 64;
                    continue;
                }
            }

            if self.is_allocated(block_id) {
                run_len = 0;
            } else {
                if run_len == 0 {
                    run_start = block_id;
                }
                run_len += 1;
                if run_len == num_blocks {
                    return Some(run_start);
                }
            }
            block_id += 1;
        }

        None
    }

    fn check_bounds(&self, range: BlockRange) -> Result<()> {
        match range.end() {
            Some(end) if end <= self.total_blocks => Ok(()),
            _ => Err(ArchiveError::InvalidBlockRange {
                first: range.first,
                count: range.count,
            }),
        }
    }

    fn mark_allocated(&mut self, range: BlockRange) {
        for block_id in range.first..range.first + range.count {
            let (word_idx, bit_idx) = Self::locate(block_id);
            self.bitmap[word_idx] |= 1u64 << bit_idx;
        }
    }

    fn locate(block_id: u64) -> (usize, u64) {
        ((block_id / 64) as usize, block_id % 64)
    }
}
