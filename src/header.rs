use crate::config::Geometry;
use crate::error::{ArchiveError, Result};

pub const MAGIC: [u8; 8] = *b"VFSARCH\x00";
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

/// Encoded header length in bytes
pub const HEADER_SIZE: usize = 64;

/// Structure-file header
///
/// Occupies the first 64 bytes of `<prefix>.structure` and records the
/// geometry the archive was created with plus the number of occupied
/// directory slots that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Magic number: "VFSARCH\x00"
    pub magic: [u8; 8],

    /// Format version (major)
    pub version_major: u16,

    /// Format version (minor)
    pub version_minor: u16,

    /// Bytes per block
    pub block_size: u64,

    /// Blocks in the store region, also the number of directory slots
    pub block_count: u64,

    /// Occupied directory slots
    pub entry_count: u64,
}

impl Header {
    pub fn new(geometry: Geometry) -> Self {
        Header {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            block_size: geometry.block_size(),
            block_count: geometry.block_count(),
            entry_count: 0,
        }
    }

    /// Validate magic, version and geometry
    pub fn validate(&self) -> Result<Geometry> {
        if self.magic != MAGIC {
            return Err(ArchiveError::CorruptStructure(
                "invalid magic number in header".to_string(),
            ));
        }

        if self.version_major != VERSION_MAJOR || self.version_minor != VERSION_MINOR {
            return Err(ArchiveError::CorruptStructure(format!(
                "unsupported format version: {}.{}",
                self.version_major, self.version_minor
            )));
        }

        if self.entry_count > self.block_count {
            return Err(ArchiveError::CorruptStructure(format!(
                "entry count ({}) exceeds slot count ({})",
                self.entry_count, self.block_count
            )));
        }

        Geometry::new(self.block_size, self.block_count)
            .map_err(|e| ArchiveError::CorruptStructure(e.to_string()))
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);

        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(&self.version_major.to_le_bytes());
        bytes.extend_from_slice(&self.version_minor.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&self.block_size.to_le_bytes());
        bytes.extend_from_slice(&self.block_count.to_le_bytes());
        bytes.extend_from_slice(&self.entry_count.to_le_bytes());

        // Pad to HEADER_SIZE
        bytes.resize(HEADER_SIZE, 0);

        bytes
    }

    /// Deserialize and validate a header
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ArchiveError::CorruptStructure(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);

        let header = Header {
            magic,
            version_major: u16::from_le_bytes([bytes[8], bytes[9]]),
            version_minor: u16::from_le_bytes([bytes[10], bytes[11]]),
            block_size: read_u64(bytes, 16),
            block_count: read_u64(bytes, 24),
            entry_count: read_u64(bytes, 32),
        };

        header.validate()?;

        Ok(header)
    }
}

/// Little-endian `u64` at `offset`; caller checks bounds
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header::new(Geometry::new(4096, 4).unwrap())
    }

    #[test]
    fn test_header_creation() {
        let header = header();
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.version_major, VERSION_MAJOR);
        assert_eq!(header.version_minor, VERSION_MINOR);
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.block_count, 4);
        assert_eq!(header.entry_count, 0);
    }

    #[test]
    fn test_header_serialization() {
        let mut header = header();
        header.entry_count = 3;

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let decoded = Header::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = header().to_bytes();
        bytes[0..8].copy_from_slice(b"INVALID!");
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(ArchiveError::CorruptStructure(_))
        ));
    }

    #[test]
    fn test_invalid_version() {
        let mut header = header();
        header.version_major = 99;
        assert!(matches!(
            header.validate(),
            Err(ArchiveError::CorruptStructure(_))
        ));
    }

    #[test]
    fn test_zero_block_size_is_corrupt() {
        let mut header = header();
        header.block_size = 0;
        assert!(matches!(
            Header::from_bytes(&header.to_bytes()),
            Err(ArchiveError::CorruptStructure(_))
        ));
    }

    #[test]
    fn test_entry_count_exceeds_slots() {
        let mut header = header();
        header.entry_count = 5;
        assert!(matches!(
            header.validate(),
            Err(ArchiveError::CorruptStructure(_))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = header().to_bytes();
        assert!(matches!(
            Header::from_bytes(&bytes[..HEADER_SIZE - 1]),
            Err(ArchiveError::CorruptStructure(_))
        ));
    }
}
