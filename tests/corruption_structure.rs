//! Structure file corruption detection tests
//!
//! Damages the on-disk structure file and checks that opening refuses it
//! instead of serving inconsistent state.

use blockvault::header::HEADER_SIZE;
use blockvault::structure::SLOT_SIZE;
use blockvault::{Archive, ArchiveError, ArchivePaths};
use std::path::PathBuf;
use tempfile::TempDir;

/// Archive with two entries: "a" in blocks 0..2 and "b" in blocks 2..4
fn two_entry_archive() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let prefix = temp_dir.path().join("archive");

    let mut archive = Archive::create(&prefix, 8, 8).unwrap();
    archive.add_bytes("a", &[1u8; 16]).unwrap();
    archive.add_bytes("b", &[2u8; 16]).unwrap();
    archive.close().unwrap();

    (temp_dir, prefix)
}

fn damage<F: FnOnce(&mut Vec<u8>)>(prefix: &PathBuf, f: F) {
    let paths = ArchivePaths::new(prefix);
    let mut bytes = std::fs::read(paths.structure()).unwrap();
    f(&mut bytes);
    std::fs::write(paths.structure(), bytes).unwrap();
}

fn assert_corrupt(prefix: &PathBuf) {
    match Archive::open(prefix) {
        Err(e @ ArchiveError::CorruptStructure(_)) => assert_eq!(e.exit_code(), 4),
        Err(e) => panic!("expected CorruptStructure, got {}", e),
        Ok(_) => panic!("damaged structure file was accepted"),
    }
}

fn slot_offset(index: usize) -> usize {
    HEADER_SIZE + index * SLOT_SIZE
}

#[test]
fn test_undamaged_archive_opens() {
    let (_temp_dir, prefix) = two_entry_archive();
    let mut archive = Archive::open(&prefix).unwrap();
    assert_eq!(archive.read("b").unwrap(), vec![2u8; 16]);
}

#[test]
fn test_bad_magic() {
    let (_temp_dir, prefix) = two_entry_archive();
    damage(&prefix, |bytes| bytes[0] ^= 0xFF);
    assert_corrupt(&prefix);
}

#[test]
fn test_truncated_slot_table() {
    let (_temp_dir, prefix) = two_entry_archive();
    damage(&prefix, |bytes| bytes.truncate(bytes.len() - 1));
    assert_corrupt(&prefix);
}

#[test]
fn test_overlapping_entries() {
    let (_temp_dir, prefix) = two_entry_archive();
    // Point b's first_block at block 1, inside a
    damage(&prefix, |bytes| {
        let at = slot_offset(1) + 16;
        bytes[at..at + 8].copy_from_slice(&1u64.to_le_bytes());
    });
    assert_corrupt(&prefix);
}

#[test]
fn test_entry_beyond_store() {
    let (_temp_dir, prefix) = two_entry_archive();
    damage(&prefix, |bytes| {
        let at = slot_offset(1) + 16;
        bytes[at..at + 8].copy_from_slice(&7u64.to_le_bytes());
    });
    assert_corrupt(&prefix);
}

#[test]
fn test_size_disagrees_with_block_count() {
    let (_temp_dir, prefix) = two_entry_archive();
    damage(&prefix, |bytes| {
        let at = slot_offset(0) + 8;
        bytes[at..at + 8].copy_from_slice(&100u64.to_le_bytes());
    });
    assert_corrupt(&prefix);
}

#[test]
fn test_duplicate_names() {
    let (_temp_dir, prefix) = two_entry_archive();
    damage(&prefix, |bytes| {
        let at = slot_offset(1) + 32;
        bytes[at] = b'a';
    });
    assert_corrupt(&prefix);
}

#[test]
fn test_occupied_slot_after_gap() {
    let (_temp_dir, prefix) = two_entry_archive();
    // Mark slot 1 empty and slot 3 occupied
    damage(&prefix, |bytes| {
        let slot1 = slot_offset(1);
        let slot3 = slot_offset(3);
        let copy = bytes[slot1..slot1 + SLOT_SIZE].to_vec();
        bytes[slot3..slot3 + SLOT_SIZE].copy_from_slice(&copy);
        bytes[slot1] = 0;
    });
    assert_corrupt(&prefix);
}

#[test]
fn test_failed_open_leaves_files_untouched() {
    let (_temp_dir, prefix) = two_entry_archive();
    damage(&prefix, |bytes| bytes[0] ^= 0xFF);

    let paths = ArchivePaths::new(&prefix);
    let before = std::fs::read(paths.structure()).unwrap();
    assert_corrupt(&prefix);
    assert_eq!(std::fs::read(paths.structure()).unwrap(), before);
}
