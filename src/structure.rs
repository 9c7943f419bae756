//! Structure-file codec
//!
//! The structure file is a [`Header`] followed by a table of `block_count`
//! fixed-size directory slots:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Header (64 bytes)                             │
//! │  - Magic "VFSARCH\0", version 1.0             │
//! │  - block_size, block_count, entry_count       │
//! ├───────────────────────────────────────────────┤
//! │ Slot 0 .. Slot block_count-1 (288 bytes each) │
//! │  +0   flags        u8   0 = empty, 1 = used   │
//! │  +1   name_len     u8                         │
//! │  +8   size         u64                        │
//! │  +16  first_block  u64                        │
//! │  +24  blocks       u64                        │
//! │  +32  name         [u8; 255], zero padded     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Occupied slots form a prefix of the table in insertion order. All
//! integers are little-endian. Encoding is deterministic: the same
//! geometry and directory always produce the same bytes.

use crate::allocator::BlockRange;
use crate::catalog::{Directory, Entry, MAX_NAME_LEN};
use crate::config::Geometry;
use crate::error::{ArchiveError, Result};
use crate::header::{read_u64, Header, HEADER_SIZE};

/// Encoded size of one directory slot
pub const SLOT_SIZE: usize = 288;

const SLOT_EMPTY: u8 = 0;
const SLOT_OCCUPIED: u8 = 1;
const NAME_OFFSET: usize = 32;

/// Decoded contents of a structure file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub geometry: Geometry,
    pub directory: Directory,
}

impl Structure {
    /// An empty directory sized for `geometry`
    pub fn new(geometry: Geometry) -> Self {
        Structure {
            geometry,
            directory: Directory::new(geometry.block_count()),
        }
    }

    /// Byte length of the structure file for a given block count
    pub fn encoded_len(block_count: u64) -> Option<usize> {
        usize::try_from(block_count)
            .ok()?
            .checked_mul(SLOT_SIZE)?
            .checked_add(HEADER_SIZE)
    }

    /// Serialize header and slot table
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = Self::encoded_len(self.geometry.block_count()).ok_or_else(|| {
            ArchiveError::InvalidGeometry(format!(
                "{} directory slots do not fit in memory",
                self.geometry.block_count()
            ))
        })?;

        let mut header = Header::new(self.geometry);
        header.entry_count = self.directory.len() as u64;

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).map_err(|_| {
            ArchiveError::InvalidGeometry(format!(
                "cannot allocate a {} byte structure file",
                len
            ))
        })?;
        bytes.extend_from_slice(&header.to_bytes());

        for entry in self.directory.list() {
            encode_slot(&mut bytes, entry);
        }

        // Remaining slots stay zeroed (SLOT_EMPTY)
        bytes.resize(len, 0);

        Ok(bytes)
    }

    /// Deserialize and validate a structure file
    ///
    /// # Errors
    ///
    /// Returns `CorruptStructure` if the length, header or any slot is
    /// inconsistent with a valid archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Header::from_bytes(bytes)?;
        let geometry = header.validate()?;

        let expected = Self::encoded_len(header.block_count).ok_or_else(|| {
            ArchiveError::CorruptStructure(format!(
                "slot table for {} blocks is too large",
                header.block_count
            ))
        })?;

        if bytes.len() != expected {
            return Err(ArchiveError::CorruptStructure(format!(
                "structure file is {} bytes, expected {}",
                bytes.len(),
                expected
            )));
        }

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        let mut seen_empty = false;

        for (index, slot) in bytes[HEADER_SIZE..].chunks_exact(SLOT_SIZE).enumerate() {
            match slot[0] {
                SLOT_EMPTY => seen_empty = true,
                SLOT_OCCUPIED if seen_empty => {
                    return Err(ArchiveError::CorruptStructure(format!(
                        "occupied slot {} follows an empty slot",
                        index
                    )));
                }
                SLOT_OCCUPIED => entries.push(decode_slot(index, slot, geometry)?),
                flags => {
                    return Err(ArchiveError::CorruptStructure(format!(
                        "slot {} has invalid flags {:#04x}",
                        index, flags
                    )));
                }
            }
        }

        if entries.len() as u64 != header.entry_count {
            return Err(ArchiveError::CorruptStructure(format!(
                "header records {} entries, found {}",
                header.entry_count,
                entries.len()
            )));
        }

        check_disjoint(&entries)?;

        let directory = Directory::from_entries(geometry.block_count(), entries)
            .map_err(|e| ArchiveError::CorruptStructure(e.to_string()))?;

        Ok(Structure {
            geometry,
            directory,
        })
    }
}

fn encode_slot(bytes: &mut Vec<u8>, entry: &Entry) {
    let start = bytes.len();
    let name = entry.name.as_bytes();

    bytes.push(SLOT_OCCUPIED);
    // Directory::insert caps names at MAX_NAME_LEN
    bytes.push(name.len() as u8);
    bytes.resize(start + 8, 0);
    bytes.extend_from_slice(&entry.size.to_le_bytes());
    bytes.extend_from_slice(&entry.range.first.to_le_bytes());
    bytes.extend_from_slice(&entry.range.count.to_le_bytes());
    bytes.extend_from_slice(name);
    bytes.resize(start + SLOT_SIZE, 0);
}

fn decode_slot(index: usize, slot: &[u8], geometry: Geometry) -> Result<Entry> {
    let corrupt = |what: String| ArchiveError::CorruptStructure(format!("slot {}: {}", index, what));

    let name_len = slot[1] as usize;
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(corrupt(format!("invalid name length {}", name_len)));
    }

    let name = std::str::from_utf8(&slot[NAME_OFFSET..NAME_OFFSET + name_len])
        .map_err(|_| corrupt("name is not valid UTF-8".to_string()))?;

    let size = read_u64(slot, 8);
    let range = BlockRange::new(read_u64(slot, 16), read_u64(slot, 24));

    if range.count != geometry.blocks_for(size) {
        return Err(corrupt(format!(
            "{} bytes need {} blocks, slot records {}",
            size,
            geometry.blocks_for(size),
            range.count
        )));
    }

    if range.is_empty() {
        if range.first != 0 {
            return Err(corrupt(format!(
                "empty entry records first block {}",
                range.first
            )));
        }
    } else {
        match range.end() {
            Some(end) if end <= geometry.block_count() => {}
            _ => {
                return Err(corrupt(format!(
                    "blocks {}..+{} lie outside the store",
                    range.first, range.count
                )))
            }
        }
    }

    Ok(Entry::new(name, size, range))
}

fn check_disjoint(entries: &[Entry]) -> Result<()> {
    let mut ranges: Vec<&Entry> = entries.iter().filter(|e| !e.range.is_empty()).collect();
    ranges.sort_by_key(|e| e.range.first);

    for pair in ranges.windows(2) {
        if pair[0].range.overlaps(&pair[1].range) {
            return Err(ArchiveError::CorruptStructure(format!(
                "entries {} and {} share blocks",
                pair[0].name, pair[1].name
            )));
        }
    }

    Ok(())
}
