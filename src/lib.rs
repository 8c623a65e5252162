//! # seglog
//!
//! An append-only, segmented commit log with:
//! - Monotonic logical offsets assigned on append
//! - Size-bounded segment files with automatic rollover
//! - Per-segment offset index for direct reads
//! - Crash recovery that truncates torn tails
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Log                                │
//! │        (RwLock: exclusive append/roll, shared read)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ binary search by base offset
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐    ┌─────────────┐
//!   │  Segment 0  │ │  Segment N  │... │   Active    │
//!   │  (sealed)   │ │  (sealed)   │    │  (append)   │
//!   └──────┬──────┘ └─────────────┘    └──────┬──────┘
//!          │                                  │
//!          ▼                                  ▼
//!   ┌─────────────┐                    ┌─────────────┐
//!   │ OffsetIndex │                    │ RecordCodec │
//!   │ offset→pos  │                    │ (bincode)   │
//!   └─────────────┘                    └─────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! use seglog::{Log, Record};
//!
//! let log = Log::open("./log", 1_000_000)?;
//! let offset = log.append(Record::new("t", "abc"))?;
//! assert_eq!(offset, 0);
//! assert_eq!(log.read(0)?.value, b"abc");
//! log.close()?;
//! # Ok::<(), seglog::LogError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod segment;
pub mod log;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{LogConfig, SyncStrategy};
pub use record::{BincodeCodec, Headers, Record, RecordCodec};
pub use segment::{Segment, SegmentInfo};
pub use log::{Log, LogIter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of seglog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
