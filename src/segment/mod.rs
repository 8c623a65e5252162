//! Segment Module
//!
//! A segment is one file holding a contiguous run of records.
//!
//! ## Responsibilities
//! - Frame and append encoded records
//! - Map logical offsets to byte positions (in-memory index)
//! - Positional reads by offset
//! - Rebuild the index on open, truncating a torn tail
//!
//! ## File Layout
//! ```text
//! {base_offset:020}.log
//! ┌─────────────────────────────────────────┐
//! │ Frame (offset = base_offset)            │
//! │ ┌─────────┬────────────────┬─────────┐  │
//! │ │ Len (4) │ Payload        │ CRC (4) │  │
//! │ └─────────┴────────────────┴─────────┘  │
//! ├─────────────────────────────────────────┤
//! │ Frame (offset = base_offset + 1)        │
//! │ ...                                     │
//! └─────────────────────────────────────────┘
//! ```

pub mod frame;
mod index;
mod recovery;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{LogError, Result};
use crate::record::{BincodeCodec, Record, RecordCodec};

pub use index::OffsetIndex;
pub use recovery::{verify, RecoveryReport, TailDefect};

use frame::{CHECKSUM_SIZE, LEN_PREFIX_SIZE, MAX_PAYLOAD_SIZE};

/// Extension of segment files
pub const SEGMENT_EXTENSION: &str = "log";

/// Width of the zero-padded base offset in segment file names
pub const SEGMENT_NAME_WIDTH: usize = 20;

/// Point-in-time description of a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub base_offset: u64,
    pub next_offset: u64,
    /// File size in bytes
    pub size: u64,
    pub path: PathBuf,
}

/// One segment file and its offset index
///
/// ## Concurrency:
/// - `state`: Mutex over file handle, index, and byte counter
/// - The frame write and the index update happen under one lock hold, so a
///   reader never sees a position whose frame is incomplete
/// - Reads seek the shared handle, so they also take the lock
///
/// Note: Readers of the same segment are serialized by that lock, while
/// readers of different segments run in parallel. Future optimization:
/// positional reads (`FileExt::read_exact_at`) would let reads skip the
/// lock during file I/O.
pub struct Segment<C: RecordCodec = BincodeCodec> {
    /// First offset this segment holds
    base_offset: u64,

    /// Backing file path
    path: PathBuf,

    /// Rollover threshold in bytes
    max_size: u64,

    /// Payload encoder/decoder
    codec: C,

    state: Mutex<SegmentState>,
}

struct SegmentState {
    file: File,
    index: OffsetIndex,
    /// Current file length (bytes of valid frames)
    size: u64,
    closed: bool,
    /// Set when a partial frame could not be cut off after a failed write;
    /// the file no longer ends at `size`, so appends are refused
    failed: bool,
}

impl<C: RecordCodec> Segment<C> {
    /// Open or create a segment file
    ///
    /// An existing file is scanned to rebuild the index; a torn tail is
    /// truncated before this returns.
    pub fn open(path: impl AsRef<Path>, base_offset: u64, max_size: u64, codec: C) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let (index, report) = recovery::recover(&mut file, base_offset)?;

        if report.was_truncated() {
            tracing::warn!(
                "Segment {} recovery: {} frames recovered, truncated {} bytes ({:?})",
                path.display(),
                report.frames_recovered,
                report.truncated_bytes,
                report.defect
            );
        } else if report.frames_recovered > 0 {
            tracing::debug!(
                "Segment {} recovery: {} frames recovered",
                path.display(),
                report.frames_recovered
            );
        }

        Ok(Self {
            base_offset,
            path,
            max_size,
            codec,
            state: Mutex::new(SegmentState {
                file,
                index,
                size: report.valid_len,
                closed: false,
                failed: false,
            }),
        })
    }

    /// Create or open the segment for `base_offset` inside `dir`
    pub fn open_in(dir: &Path, base_offset: u64, max_size: u64, codec: C) -> Result<Self> {
        Self::open(segment_path(dir, base_offset), base_offset, max_size, codec)
    }

    /// Append a record, returning the offset assigned to it
    ///
    /// Steps:
    /// 1. Stamp the record with `next_offset`
    /// 2. Encode and frame it
    /// 3. Write the frame in one call
    /// 4. Publish the frame position in the index
    pub fn append(&self, mut record: Record) -> Result<u64> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LogError::Closed);
        }
        if state.failed {
            return Err(LogError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "segment {} holds a partial frame at position {} and refuses appends",
                    self.path.display(),
                    state.size
                ),
            )));
        }

        let offset = state.index.next_offset();
        record.offset = offset;

        let payload = self.codec.encode(&record)?;
        let frame = frame::encode_frame(&payload)?;
        let position = state.size;

        if let Err(e) = state.file.write_all(&frame) {
            // Drop whatever part of the frame made it to the file
            if let Err(rollback) = state.file.set_len(position) {
                state.failed = true;
                tracing::error!(
                    "Segment {}: failed to roll back partial frame at {}, refusing further appends: {}",
                    self.path.display(),
                    position,
                    rollback
                );
            }
            return Err(e.into());
        }

        state.size += frame.len() as u64;
        state.index.push(position);

        tracing::trace!(
            "Segment {}: offset {} at position {} ({} bytes)",
            self.base_offset,
            offset,
            position,
            frame.len()
        );
        Ok(offset)
    }

    /// Read the record stored at `offset`
    pub fn read_at(&self, offset: u64) -> Result<Record> {
        let payload = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(LogError::Closed);
            }
            if !state.index.contains(offset) {
                return Err(LogError::OffsetNotFound(offset));
            }
            let position = state
                .index
                .position(offset)
                .ok_or(LogError::OffsetNotFound(offset))?;
            state.read_frame(position)?
        };

        let record = self.codec.decode(&payload)?;
        if record.offset != offset {
            return Err(LogError::CorruptRecord(format!(
                "frame indexed at offset {} decodes to offset {}",
                offset, record.offset
            )));
        }
        Ok(record)
    }

    /// Whether the file has reached the rollover threshold
    pub fn is_full(&self) -> bool {
        self.state.lock().size >= self.max_size
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// The offset the next append will be assigned
    pub fn next_offset(&self) -> u64 {
        self.state.lock().index.next_offset()
    }

    /// Number of records in the segment
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    /// Current file size in bytes
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> SegmentInfo {
        let state = self.state.lock();
        SegmentInfo {
            base_offset: self.base_offset,
            next_offset: state.index.next_offset(),
            size: state.size,
            path: self.path.clone(),
        }
    }

    /// Flush file contents to disk
    pub fn sync(&self) -> Result<()> {
        let state = self.state.lock();
        if state.closed {
            return Err(LogError::Closed);
        }
        state.file.sync_data()?;
        Ok(())
    }

    /// Sync and refuse further appends and reads
    ///
    /// The file handle itself is released when the segment is dropped.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LogError::Closed);
        }
        state.closed = true;
        state.file.sync_all()?;
        Ok(())
    }
}

impl SegmentState {
    /// Read and checksum the payload of the frame starting at `position`
    fn read_frame(&mut self, position: u64) -> Result<Vec<u8>> {
        let available = self.size.saturating_sub(position);
        if available < LEN_PREFIX_SIZE {
            return Err(LogError::CorruptRecord(format!(
                "no length prefix at position {}",
                position
            )));
        }

        self.file.seek(SeekFrom::Start(position))?;

        let mut len_buf = [0u8; LEN_PREFIX_SIZE as usize];
        read_exact_or_corrupt(&mut self.file, &mut len_buf, position)?;
        let len = u32::from_be_bytes(len_buf);

        if len > MAX_PAYLOAD_SIZE || frame::frame_len(len) > available {
            return Err(LogError::CorruptRecord(format!(
                "length prefix {} at position {} exceeds the {} bytes remaining",
                len, position, available
            )));
        }

        let mut payload = vec![0u8; len as usize];
        read_exact_or_corrupt(&mut self.file, &mut payload, position)?;

        let mut crc_buf = [0u8; CHECKSUM_SIZE as usize];
        read_exact_or_corrupt(&mut self.file, &mut crc_buf, position)?;
        if u32::from_be_bytes(crc_buf) != frame::checksum(&payload) {
            return Err(LogError::CorruptRecord(format!(
                "checksum mismatch for frame at position {}",
                position
            )));
        }

        Ok(payload)
    }
}

/// `read_exact` that reports a short read as corruption rather than I/O failure
fn read_exact_or_corrupt(file: &mut File, buf: &mut [u8], position: u64) -> Result<()> {
    file.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => LogError::CorruptRecord(format!(
            "short read in frame at position {}",
            position
        )),
        _ => LogError::Io(e),
    })
}

// =============================================================================
// File Naming
// =============================================================================

/// "00000000000000000042.log" for base offset 42
pub fn segment_file_name(base_offset: u64) -> String {
    format!(
        "{:0width$}.{}",
        base_offset,
        SEGMENT_EXTENSION,
        width = SEGMENT_NAME_WIDTH
    )
}

/// Path of the segment for `base_offset` inside `dir`
pub fn segment_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(segment_file_name(base_offset))
}

/// Parse the base offset from a segment file name
/// "00000000000000000042.log" → Some(42)
pub fn parse_base_offset(path: &Path) -> Option<u64> {
    if path.extension()? != SEGMENT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.len() != SEGMENT_NAME_WIDTH || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// List the segment files in `dir`, ordered by name (and so by base offset)
///
/// Files without the segment extension are ignored; a `.log` file whose name
/// is not a base offset is an error.
pub fn list_segment_files(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        LogError::storage_init(format!("cannot list log directory {}", dir.display()), e)
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            LogError::storage_init(format!("cannot list log directory {}", dir.display()), e)
        })?;
        let path = entry.path();

        if !path.is_file() || path.extension().map_or(true, |ext| ext != SEGMENT_EXTENSION) {
            continue;
        }

        let base_offset = parse_base_offset(&path).ok_or_else(|| {
            LogError::StorageInit(format!("malformed segment file name: {}", path.display()))
        })?;
        files.push((base_offset, path));
    }

    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}
