//! Block allocation for the store region
//!
//! Blocks are reserved in contiguous runs only. The allocator scans from
//! block 0 upward and takes the first run that is long enough (first-fit),
//! which makes placement a deterministic function of the add/del history.
//!
//! - [`bitmap`] - occupancy bitmap with first-fit run search
//! - [`range`] - the `BlockRange` value type shared with the directory

pub mod bitmap;
pub mod range;

pub use bitmap::BitmapAllocator;
pub use range::BlockRange;
