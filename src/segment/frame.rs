//! Frame encoding
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────────────────────┬──────────┐
//! │ Len (4)  │    Payload (Len bytes)   │ CRC (4)  │
//! └──────────┴──────────────────────────┴──────────┘
//! ```
//! Both integers are big-endian. The CRC32 covers the payload only.

use bytes::{BufMut, BytesMut};

use crate::error::{LogError, Result};

/// Size of the big-endian length prefix
pub const LEN_PREFIX_SIZE: u64 = 4;

/// Size of the trailing CRC32
pub const CHECKSUM_SIZE: u64 = 4;

/// Bytes a frame adds on top of its payload
pub const FRAME_OVERHEAD: u64 = LEN_PREFIX_SIZE + CHECKSUM_SIZE;

/// Largest payload a frame may carry (64 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Total on-disk size of a frame carrying `payload_len` bytes
#[inline]
pub fn frame_len(payload_len: u32) -> u64 {
    FRAME_OVERHEAD + payload_len as u64
}

/// CRC32 of a payload
#[inline]
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Build the complete frame for a payload
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len <= MAX_PAYLOAD_SIZE)
        .ok_or_else(|| {
            LogError::Serialization(format!(
                "record payload of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_PAYLOAD_SIZE
            ))
        })?;

    let mut frame = BytesMut::with_capacity(frame_len(len) as usize);
    frame.put_u32(len);
    frame.put_slice(payload);
    frame.put_u32(checksum(payload));
    Ok(frame)
}
