//! Error types for archive operations

use std::path::PathBuf;
use thiserror::Error;

/// Archive operation result type
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Archive operation errors
///
/// Every variant maps to exactly one process exit code, see
/// [`ArchiveError::exit_code`].
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The structure or store file is missing or cannot be opened
    #[error("archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    /// `create` found an existing structure or store file
    #[error("archive already exists: {}", path.display())]
    ArchiveAlreadyExists { path: PathBuf },

    /// An entry with this name is already stored
    #[error("entry already exists: {0}")]
    DuplicateName(String),

    /// The file to add cannot be read
    #[error("cannot read source file {}: {source}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content is larger than the whole archive
    #[error("content of {requested} bytes exceeds archive capacity of {capacity} bytes")]
    CapacityExceeded { requested: u64, capacity: u64 },

    /// No run of free blocks is long enough right now
    #[error("no run of {blocks} contiguous free blocks available")]
    InsufficientSpace { blocks: u64 },

    /// Every directory slot is occupied
    #[error("directory full: all {slots} slots are in use")]
    DirectoryFull { slots: u64 },

    /// No entry with this name is stored
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The destination of `get` cannot be created or written
    #[error("cannot write destination file {}: {source}", path.display())]
    DestinationNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The structure file exists but does not describe a valid archive
    #[error("corrupt structure file: {0}")]
    CorruptStructure(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid entry name: {0}")]
    InvalidName(String),

    #[error("invalid block range: first={first} count={count}")]
    InvalidBlockRange { first: u64, count: u64 },

    #[error("block already allocated: {0}")]
    BlockAlreadyAllocated(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Exit code: 0 is success and never produced here
    pub fn exit_code(&self) -> i32 {
        match self {
            ArchiveError::ArchiveNotFound { .. } => 2,
            ArchiveError::ArchiveAlreadyExists { .. } => 3,
            ArchiveError::CorruptStructure(_) => 4,
            ArchiveError::DuplicateName(_) => 11,
            ArchiveError::CapacityExceeded { .. }
            | ArchiveError::InsufficientSpace { .. }
            | ArchiveError::DirectoryFull { .. } => 12,
            ArchiveError::SourceNotFound { .. } => 13,
            ArchiveError::EntryNotFound(_) => 21,
            ArchiveError::DestinationNotWritable { .. } => 30,
            ArchiveError::InvalidGeometry(_) | ArchiveError::InvalidName(_) => USAGE_EXIT_CODE,
            ArchiveError::InvalidBlockRange { .. }
            | ArchiveError::BlockAlreadyAllocated(_)
            | ArchiveError::Io(_) => 1,
        }
    }
}

/// Exit code for malformed command lines and argument errors
pub const USAGE_EXIT_CODE: i32 = 66;
