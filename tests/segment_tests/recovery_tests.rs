//! Tests for Segment recovery
//!
//! These tests verify:
//! - Recovery from a clean segment (no corruption)
//! - Recovery from an empty file
//! - Recovery with partial writes (truncated tail)
//! - Recovery with corrupted frames (CRC mismatch)
//! - Verify mode (report only, file untouched)

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use seglog::segment::{self, frame, Segment, TailDefect};
use seglog::{BincodeCodec, Record};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const BASE: u64 = 0;

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(segment::segment_file_name(BASE));
    (temp_dir, path)
}

fn record(i: usize) -> Record {
    Record::new("recovery", format!("value{}", i)).with_timestamp(i as u64)
}

/// Write `count` records through a Segment and return the file length after each
fn write_records(path: &Path, count: usize) -> Vec<u64> {
    let segment = Segment::open(path, BASE, 1024 * 1024, BincodeCodec).unwrap();
    let mut lengths = Vec::new();
    for i in 0..count {
        segment.append(record(i)).unwrap();
        lengths.push(segment.size());
    }
    segment.close().unwrap();
    lengths
}

fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

// =============================================================================
// Clean Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, path) = setup_temp_dir();
    fs::File::create(&path).unwrap();

    let report = segment::verify(&path, BASE).unwrap();
    let segment = Segment::open(&path, BASE, 1024, BincodeCodec).unwrap();

    assert_eq!(report.frames_recovered, 0);
    assert_eq!(report.valid_len, 0);
    assert!(!report.was_truncated());
    assert_eq!(report.defect, None);
    assert!(segment.is_empty());
    assert_eq!(segment.next_offset(), BASE);
}

#[test]
fn test_recover_multiple_frames() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 10);

    let segment = Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap();

    assert_eq!(segment.len(), 10);
    assert_eq!(segment.next_offset(), 10);
    assert_eq!(segment.size(), *lengths.last().unwrap());
    for i in 0..10 {
        let read = segment.read_at(i as u64).unwrap();
        assert_eq!(read.offset, i as u64);
        assert_eq!(read.value, format!("value{}", i).into_bytes());
    }
}

#[test]
fn test_recover_is_idempotent() {
    let (_temp, path) = setup_temp_dir();
    write_records(&path, 4);

    let first = segment::verify(&path, BASE).unwrap();
    drop(Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap());
    let second = segment::verify(&path, BASE).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.frames_recovered, 4);
}

// =============================================================================
// Partial Write Tests (was_truncated = true)
// =============================================================================

#[test]
fn test_recover_truncates_two_garbage_bytes() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 1);
    let valid_len = lengths[0];
    append_raw(&path, &[0xDE, 0xAD]);

    let report = segment::verify(&path, BASE).unwrap();
    assert_eq!(report.defect, Some(TailDefect::PartialLength));
    assert_eq!(report.truncated_bytes, 2);

    let segment = Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap();

    // Exactly one record, garbage removed from disk
    assert_eq!(segment.len(), 1);
    assert_eq!(segment.next_offset(), BASE + 1);
    assert_eq!(file_len(&path), valid_len);

    // The next append lands right after the valid frame
    let offset = segment.append(record(1)).unwrap();
    assert_eq!(offset, BASE + 1);
    assert_eq!(segment.read_at(BASE).unwrap().value, b"value0".to_vec());
    assert_eq!(segment.read_at(BASE + 1).unwrap().value, b"value1".to_vec());
    assert_eq!(file_len(&path), valid_len * 2);
}

#[test]
fn test_recover_truncates_partial_payload() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 2);

    // Length prefix promises 100 bytes, only 10 follow
    let mut torn = 100u32.to_be_bytes().to_vec();
    torn.extend_from_slice(&[0u8; 10]);
    append_raw(&path, &torn);

    let segment = Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap();

    assert_eq!(segment.len(), 2);
    assert_eq!(file_len(&path), lengths[1]);
}

#[test]
fn test_recover_truncates_missing_checksum() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 2);

    // Chop the last two bytes of the second frame's checksum
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(lengths[1] - 2).unwrap();

    let report = segment::verify(&path, BASE).unwrap();
    assert_eq!(report.defect, Some(TailDefect::PartialChecksum));

    let segment = Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap();

    assert_eq!(segment.len(), 1);
    assert_eq!(file_len(&path), lengths[0]);
}

#[test]
fn test_recover_truncates_oversized_length() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 1);
    append_raw(&path, &(frame::MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    let report = segment::verify(&path, BASE).unwrap();
    let segment = Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap();

    assert_eq!(report.defect, Some(TailDefect::OversizedLength));
    assert_eq!(segment.len(), 1);
    assert_eq!(file_len(&path), lengths[0]);
}

// =============================================================================
// Checksum Tests
// =============================================================================

#[test]
fn test_recover_stops_at_checksum_mismatch() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 3);

    // Corrupt a payload byte in the second frame
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(lengths[0] + frame::LEN_PREFIX_SIZE + 1)).unwrap();
    file.write_all(&[0xFF]).unwrap();
    file.sync_all().unwrap();

    let report = segment::verify(&path, BASE).unwrap();
    assert_eq!(report.defect, Some(TailDefect::ChecksumMismatch));
    assert_eq!(report.frames_recovered, 1);
    assert_eq!(report.truncated_bytes, lengths[2] - lengths[0]);

    let segment = Segment::open(&path, BASE, 1024 * 1024, BincodeCodec).unwrap();

    // Everything from the bad frame on is dropped
    assert_eq!(segment.len(), 1);
    assert_eq!(file_len(&path), lengths[0]);
    assert_eq!(segment.append(record(9)).unwrap(), BASE + 1);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, path) = setup_temp_dir();
    let lengths = write_records(&path, 2);
    append_raw(&path, &[1, 2, 3]);

    let report = segment::verify(&path, BASE).unwrap();

    assert!(report.was_truncated());
    assert_eq!(report.frames_recovered, 2);
    assert_eq!(report.valid_len, lengths[1]);
    assert_eq!(report.truncated_bytes, 3);
    assert_eq!(file_len(&path), lengths[1] + 3);
}
