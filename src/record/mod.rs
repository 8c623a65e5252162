//! Record Module
//!
//! The unit of data stored in the log, and the codec contract that turns it
//! into frame payload bytes.
//!
//! ## Responsibilities
//! - Hold a record's topic, value, headers, and timestamp
//! - Carry the logical offset assigned by the segment that stores it
//! - Keep header serialization deterministic (sorted by key)

mod codec;
mod headers;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use codec::{BincodeCodec, RecordCodec};
pub use headers::Headers;

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Logical offset - assigned on append, ignored when supplied by callers
    pub offset: u64,

    /// Topic the record was produced to
    pub topic: String,

    /// Opaque payload
    pub value: Vec<u8>,

    /// String key/value metadata
    pub headers: Headers,

    /// Timestamp (unix millis) when the record was created
    pub timestamp: u64,
}

impl Record {
    /// Create a record stamped with the current time
    pub fn new(topic: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            offset: 0,
            topic: topic.into(),
            value: value.into(),
            headers: Headers::new(),
            timestamp: now_millis(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Replace all headers
    pub fn with_headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Override the timestamp (unix millis)
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Current wall-clock time in unix milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
