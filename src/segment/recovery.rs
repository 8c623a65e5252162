//! Segment recovery
//!
//! Rebuilds a segment's offset index by scanning its frames from the start of
//! the file. The scan stops at the first frame that is not fully present or
//! whose checksum does not match; everything from that point on is a torn
//! tail and gets cut off so later appends land right after the last good
//! frame.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

use super::frame::{self, CHECKSUM_SIZE, LEN_PREFIX_SIZE, MAX_PAYLOAD_SIZE};
use super::index::OffsetIndex;

/// Why a scan stopped before the end of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailDefect {
    /// Fewer than 4 bytes left where a length prefix should start
    PartialLength,

    /// Length prefix larger than any frame the writer produces
    OversizedLength,

    /// Length prefix present but the payload is cut short
    PartialPayload,

    /// Payload present but the checksum is missing or cut short
    PartialChecksum,

    /// Frame fully present but the checksum does not match the payload
    ChecksumMismatch,
}

/// Result of scanning a segment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of valid frames found
    pub frames_recovered: u64,

    /// Byte length covered by valid frames
    pub valid_len: u64,

    /// Bytes past `valid_len` (removed by `recover`, only counted by `verify`)
    pub truncated_bytes: u64,

    /// What ended the scan early, if anything
    pub defect: Option<TailDefect>,
}

impl RecoveryReport {
    /// Whether the file had bytes past its last valid frame
    pub fn was_truncated(&self) -> bool {
        self.truncated_bytes > 0
    }
}

/// Scan an open segment file, rebuild its index, and truncate any torn tail
///
/// The file is left positioned at its (possibly new) end.
pub(crate) fn recover(file: &mut File, base_offset: u64) -> Result<(OffsetIndex, RecoveryReport)> {
    let (index, report) = scan(file, base_offset)?;

    if report.was_truncated() {
        file.set_len(report.valid_len)?;
        file.sync_all()?;
    }
    file.seek(SeekFrom::End(0))?;

    Ok((index, report))
}

/// Scan a segment file without modifying it
pub fn verify(path: &Path, base_offset: u64) -> Result<RecoveryReport> {
    let mut file = File::open(path)?;
    let (_, report) = scan(&mut file, base_offset)?;
    Ok(report)
}

fn scan(file: &mut File, base_offset: u64) -> Result<(OffsetIndex, RecoveryReport)> {
    let file_len = file.metadata()?.len();
    file.seek(SeekFrom::Start(0))?;

    let mut reader = BufReader::new(&mut *file);
    let mut index = OffsetIndex::new(base_offset);
    let mut payload = Vec::new();
    let mut position = 0u64;

    let defect = loop {
        let remaining = file_len - position;
        if remaining == 0 {
            break None;
        }
        if remaining < LEN_PREFIX_SIZE {
            break Some(TailDefect::PartialLength);
        }

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf);

        if len > MAX_PAYLOAD_SIZE {
            break Some(TailDefect::OversizedLength);
        }
        if remaining < LEN_PREFIX_SIZE + len as u64 {
            break Some(TailDefect::PartialPayload);
        }
        if remaining < frame::frame_len(len) {
            break Some(TailDefect::PartialChecksum);
        }

        payload.resize(len as usize, 0);
        reader.read_exact(&mut payload)?;

        let mut crc_buf = [0u8; CHECKSUM_SIZE as usize];
        reader.read_exact(&mut crc_buf)?;
        if u32::from_be_bytes(crc_buf) != frame::checksum(&payload) {
            break Some(TailDefect::ChecksumMismatch);
        }

        index.push(position);
        position += frame::frame_len(len);
    };

    let report = RecoveryReport {
        frames_recovered: index.len() as u64,
        valid_len: position,
        truncated_bytes: file_len - position,
        defect,
    };
    Ok((index, report))
}
