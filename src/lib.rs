//! # Blockvault - Fixed-Capacity Block Archive
//!
//! `blockvault` manages a flat virtual file system stored in two sibling
//! files:
//!
//! - **`<prefix>.structure`**: header plus a fixed table of directory slots
//! - **`<prefix>.store`**: raw block region of `block_size * block_count` bytes
//!
//! Entries are stored whole in a contiguous run of blocks found by first-fit
//! search. Capacity is reported in exact bytes, ignoring block rounding.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blockvault::{Archive, Result};
//!
//! # fn main() -> Result<()> {
//! // 1000 blocks of 50 bytes
//! let mut archive = Archive::create("my-archive", 50, 1000)?;
//!
//! archive.add_bytes("notes.txt", b"Hello, World!")?;
//! let content = archive.read("notes.txt")?;
//! assert_eq!(content, b"Hello, World!");
//!
//! for entry in archive.list() {
//!     println!("{}", entry); // name,size,blocks,first,last
//! }
//!
//! println!("free: {} used: {}", archive.free(), archive.used());
//! # Ok(())
//! # }
//! ```
//!
//! ## Operations by path
//!
//! [`ops`] mirrors the `vfs` command line: every call opens the archive,
//! performs one operation and closes it again.
//!
//! ```rust,no_run
//! use blockvault::ops;
//!
//! # fn main() -> blockvault::Result<()> {
//! ops::create("archive", 4096, 4)?;
//! ops::add("archive", "vfs.c", "vfs.c")?;
//! ops::get("archive", "vfs.c", "/tmp/vfs.c")?;
//! ops::del("archive", "vfs.c")?;
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod header;
pub mod io;
pub mod ops;
pub mod structure;

pub use allocator::{BitmapAllocator, BlockRange};
pub use archive::{Archive, ArchiveStats};
pub use catalog::{Directory, Entry};
pub use config::{ArchivePaths, Geometry};
pub use error::{ArchiveError, Result};
pub use structure::Structure;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
