//! Log Module
//!
//! The commit log that coordinates a directory of segments.
//!
//! ## Responsibilities
//! - Discover and recover segments on startup
//! - Assign offsets through the active segment
//! - Roll over to a new segment when the active one fills up
//! - Route reads to the segment owning an offset
//! - Flush and release segment files on close

mod iter;

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::config::{LogConfig, SyncStrategy};
use crate::error::{LogError, Result};
use crate::record::{BincodeCodec, Record, RecordCodec};
use crate::segment::{self, Segment, SegmentInfo};

pub use iter::LogIter;

/// Append-only, segmented commit log
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (append/roll/flush/close): exclusive `inner` write lock
///   - Offsets are handed out in one global order, no gaps or duplicates
///   - Segment creation never races with an append
///
/// - **Reads** (read/iter): shared `inner` read lock
///   - Many concurrent readers, excluded while a writer holds the lock
///   - Each segment serializes its own file access internally
pub struct Log<C: RecordCodec = BincodeCodec> {
    /// Log configuration
    config: LogConfig,

    /// Codec handed to every segment
    codec: C,

    inner: RwLock<LogInner<C>>,
}

struct LogInner<C: RecordCodec> {
    /// Segments sorted by base offset; the last one is active
    segments: Vec<Segment<C>>,

    closed: bool,

    /// Appends since the active segment was last synced
    unsynced: usize,
}

impl Log<BincodeCodec> {
    /// Open or create a log in `dir` with the default codec
    pub fn open(dir: impl AsRef<Path>, max_segment_size: u64) -> Result<Self> {
        let config = LogConfig::builder()
            .dir(dir.as_ref())
            .max_segment_size(max_segment_size)
            .build()?;
        Self::open_with_config(config)
    }

    /// Open or create a log from a full config with the default codec
    pub fn open_with_config(config: LogConfig) -> Result<Self> {
        Self::with_codec(config, BincodeCodec)
    }
}

impl<C: RecordCodec> Log<C> {
    /// Open or create a log with a custom record codec
    ///
    /// On startup:
    /// 1. Create the directory if it doesn't exist
    /// 2. Discover segment files, ordered by name
    /// 3. Open each one (recovers its index, truncates torn tails)
    /// 4. Bootstrap an empty segment at offset 0 if there were none
    pub fn with_codec(config: LogConfig, codec: C) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.dir).map_err(|e| {
            LogError::storage_init(
                format!("cannot create log directory {}", config.dir.display()),
                e,
            )
        })?;

        let mut segments = Vec::new();
        for (base_offset, path) in segment::list_segment_files(&config.dir)? {
            let segment = Segment::open(&path, base_offset, config.max_segment_size, codec.clone())
                .map_err(|e| segment_init_error(&path, e))?;
            segments.push(segment);
        }

        if segments.is_empty() {
            let path = segment::segment_path(&config.dir, 0);
            let segment = Segment::open(&path, 0, config.max_segment_size, codec.clone())
                .map_err(|e| segment_init_error(&path, e))?;
            segments.push(segment);
        }

        for pair in segments.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.next_offset() != next.base_offset() {
                tracing::warn!(
                    "Segments are not contiguous: {} ends at {} but {} starts at {}",
                    prev.path().display(),
                    prev.next_offset(),
                    next.path().display(),
                    next.base_offset()
                );
            }
        }

        let inner = LogInner {
            segments,
            closed: false,
            unsynced: 0,
        };

        let next_offset = inner.active()?.next_offset();
        tracing::info!(
            "Log opened at {}: {} segment(s), next offset {}",
            config.dir.display(),
            inner.segments.len(),
            next_offset
        );

        Ok(Self {
            config,
            codec,
            inner: RwLock::new(inner),
        })
    }

    /// Append a record, returning its logical offset
    ///
    /// Steps:
    /// 1. Acquire the write lock
    /// 2. Roll over if the active segment is full
    /// 3. Append to the active segment
    /// 4. Sync according to the configured strategy
    pub fn append(&self, record: Record) -> Result<u64> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;

        if inner.active()?.is_full() {
            inner.roll(&self.config, &self.codec)?;
        }

        let offset = inner.active()?.append(record)?;
        inner.after_append(self.config.sync_strategy)?;

        tracing::debug!("Appended offset {}", offset);
        Ok(offset)
    }

    /// Start a new active segment at the current tail, returning its base offset
    ///
    /// Does nothing (and returns the active base offset) when the active
    /// segment holds no records yet.
    pub fn roll(&self) -> Result<u64> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.roll(&self.config, &self.codec)
    }

    /// Read the record stored at `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        let segment = inner.find_segment(offset)?;
        let record = segment.read_at(offset)?;

        tracing::trace!("Read offset {} from segment {}", offset, segment.base_offset());
        Ok(record)
    }

    /// Iterate records from `offset` up to the tail
    pub fn iter_from(&self, offset: u64) -> LogIter<'_, C> {
        LogIter::new(self, offset)
    }

    /// Force the active segment to disk
    ///
    /// Sealed segments were synced when they were rolled.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.active()?.sync()?;
        inner.unsynced = 0;
        Ok(())
    }

    /// Sync and close every segment
    ///
    /// Any later call on this log, including another `close`, fails with
    /// `LogError::Closed`.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.closed = true;

        // Taking the segments out drops (and so closes) their files below
        let segments = std::mem::take(&mut inner.segments);
        let mut first_error = None;
        for segment in &segments {
            if let Err(e) = segment.close() {
                tracing::error!("Failed to close segment {}: {}", segment.path().display(), e);
                first_error.get_or_insert(e);
            }
        }

        tracing::info!(
            "Log at {} closed ({} segment(s))",
            self.config.dir.display(),
            segments.len()
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The offset the next append will be assigned
    pub fn next_offset(&self) -> Result<u64> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.active()?.next_offset())
    }

    /// The lowest offset held by the log
    pub fn base_offset(&self) -> Result<u64> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        inner
            .segments
            .first()
            .map(Segment::base_offset)
            .ok_or(LogError::Closed)
    }

    /// Number of segments (zero once closed)
    pub fn segment_count(&self) -> usize {
        self.inner.read().segments.len()
    }

    /// Snapshot of every segment, oldest first (empty once closed)
    pub fn segments(&self) -> Vec<SegmentInfo> {
        self.inner.read().segments.iter().map(Segment::info).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    /// Get the log directory
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Get the configuration
    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

impl<C: RecordCodec> Drop for Log<C> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.closed {
            return;
        }
        if let Ok(active) = inner.active() {
            if let Err(e) = active.sync() {
                tracing::warn!("Failed to sync unclosed log on drop: {}", e);
            }
        }
    }
}

impl<C: RecordCodec> LogInner<C> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(LogError::Closed);
        }
        Ok(())
    }

    fn active(&self) -> Result<&Segment<C>> {
        self.segments.last().ok_or(LogError::Closed)
    }

    /// Segment whose range holds `offset` (binary search on base offsets)
    fn find_segment(&self, offset: u64) -> Result<&Segment<C>> {
        if offset >= self.active()?.next_offset() {
            return Err(LogError::OffsetNotFound(offset));
        }

        // First segment with base_offset > offset; the owner is the one before it
        let idx = self.segments.partition_point(|s| s.base_offset() <= offset);
        if idx == 0 {
            return Err(LogError::OffsetNotFound(offset));
        }
        Ok(&self.segments[idx - 1])
    }

    fn roll(&mut self, config: &LogConfig, codec: &C) -> Result<u64> {
        let active = self.active()?;
        if active.is_empty() {
            return Ok(active.base_offset());
        }

        // Seal the outgoing segment before the new one takes writes
        active.sync()?;
        let new_base = active.next_offset();
        let sealed_size = active.size();

        let next = Segment::open_in(&config.dir, new_base, config.max_segment_size, codec.clone())?;
        self.segments.push(next);
        self.unsynced = 0;

        tracing::info!(
            "Rolled to segment {} (sealed segment holds {} bytes, {} segments total)",
            segment::segment_file_name(new_base),
            sealed_size,
            self.segments.len()
        );
        Ok(new_base)
    }

    fn after_append(&mut self, strategy: SyncStrategy) -> Result<()> {
        match strategy {
            SyncStrategy::Never => {}
            SyncStrategy::EveryWrite => self.active()?.sync()?,
            SyncStrategy::EveryNEntries { count } => {
                self.unsynced += 1;
                if self.unsynced >= count {
                    self.active()?.sync()?;
                    self.unsynced = 0;
                }
            }
        }
        Ok(())
    }
}

/// Report an I/O failure while opening a segment at startup as an init error
fn segment_init_error(path: &Path, err: LogError) -> LogError {
    match err {
        LogError::Io(e) => LogError::storage_init(format!("cannot open segment {}", path.display()), e),
        other => other,
    }
}
