//! Tests for the record codec
//!
//! These tests verify:
//! - Every field survives encode → decode
//! - Encoded bytes do not depend on header insertion order
//! - Undecodable bytes surface as CorruptRecord
//! - A custom codec can be plugged into a Log

use seglog::{BincodeCodec, Headers, Log, LogConfig, LogError, Record, RecordCodec};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_record() -> Record {
    let mut record = Record::new("app-logs", "log data here")
        .with_header("env", "production")
        .with_header("region", "eu-west-1")
        .with_timestamp(1_700_000_000_123);
    record.offset = 1337;
    record
}

// =============================================================================
// BincodeCodec Tests
// =============================================================================

#[test]
fn test_codec_preserves_every_field() {
    let codec = BincodeCodec;
    let original = sample_record();

    let bytes = codec.encode(&original).unwrap();
    let decoded = codec.decode(&bytes).unwrap();

    assert_eq!(decoded.offset, 1337);
    assert_eq!(decoded.topic, "app-logs");
    assert_eq!(decoded.value, b"log data here".to_vec());
    assert_eq!(decoded.headers.get("env"), Some("production"));
    assert_eq!(decoded.headers.get("region"), Some("eu-west-1"));
    assert_eq!(decoded.timestamp, 1_700_000_000_123);
    assert_eq!(decoded, original);
}

#[test]
fn test_codec_empty_fields() {
    let codec = BincodeCodec;
    let original = Record::new("", Vec::<u8>::new()).with_timestamp(0);

    let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();

    assert_eq!(decoded, original);
}

#[test]
fn test_codec_output_is_deterministic_across_header_order() {
    let codec = BincodeCodec;
    let a = Record::new("t", "v")
        .with_timestamp(7)
        .with_headers([("x", "1"), ("y", "2"), ("z", "3")]);
    let b = Record::new("t", "v")
        .with_timestamp(7)
        .with_headers([("z", "3"), ("x", "1"), ("y", "2")]);

    assert_eq!(codec.encode(&a).unwrap(), codec.encode(&b).unwrap());
}

#[test]
fn test_codec_decode_garbage_is_corrupt_record() {
    let codec = BincodeCodec;

    let result = codec.decode(&[0xFF, 0x01]);

    assert!(matches!(result, Err(LogError::CorruptRecord(_))));
}

#[test]
fn test_codec_decode_truncated_payload_is_corrupt_record() {
    let codec = BincodeCodec;
    let bytes = codec.encode(&sample_record()).unwrap();

    let result = codec.decode(&bytes[..bytes.len() - 3]);

    assert!(matches!(result, Err(LogError::CorruptRecord(_))));
}

// =============================================================================
// Custom Codec Tests
// =============================================================================

/// Codec that prefixes bincode output with a version byte
#[derive(Clone)]
struct VersionedCodec;

impl RecordCodec for VersionedCodec {
    fn encode(&self, record: &Record) -> seglog::Result<Vec<u8>> {
        let mut bytes = vec![1u8];
        bytes.extend(BincodeCodec.encode(record)?);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> seglog::Result<Record> {
        match bytes.split_first() {
            Some((&1, rest)) => BincodeCodec.decode(rest),
            _ => Err(LogError::CorruptRecord("unknown version".to_string())),
        }
    }
}

#[test]
fn test_log_with_custom_codec() {
    let temp = TempDir::new().unwrap();
    let config = LogConfig::builder().dir(temp.path()).build().unwrap();
    let log = Log::with_codec(config, VersionedCodec).unwrap();

    let headers: Headers = [("h", "1")].into();
    let offset = log
        .append(Record::new("t", "custom").with_headers(headers.clone()))
        .unwrap();
    let record = log.read(offset).unwrap();

    assert_eq!(offset, 0);
    assert_eq!(record.value, b"custom".to_vec());
    assert_eq!(record.headers, headers);
    log.close().unwrap();
}
