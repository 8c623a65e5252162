//! Record codec
//!
//! Turns a [`Record`] into frame payload bytes and back. The log never looks
//! inside a payload; any codec that round-trips every field can be plugged in.

use crate::error::{LogError, Result};

use super::Record;

/// Encode/decode contract for frame payloads
///
/// `decode(&encode(r)?)?` must equal `r` in every field, headers and
/// timestamp included.
pub trait RecordCodec: Clone + Send + Sync + 'static {
    /// Serialize a record to payload bytes
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;

    /// Deserialize payload bytes back into a record
    fn decode(&self, bytes: &[u8]) -> Result<Record>;
}

/// Default codec: bincode over the serde derive of `Record`
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl RecordCodec for BincodeCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(|e| LogError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        bincode::deserialize(bytes)
            .map_err(|e| LogError::CorruptRecord(format!("payload failed to decode: {}", e)))
    }
}
