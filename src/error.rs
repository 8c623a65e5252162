//! Error types for seglog
//!
//! Provides a unified error type for all log operations.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for seglog operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    /// Directory or segment file could not be created, listed, or parsed
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    // -------------------------------------------------------------------------
    // Read Errors
    // -------------------------------------------------------------------------
    #[error("Offset {0} not found")]
    OffsetNotFound(u64),

    /// Frame bytes are inconsistent or the payload does not decode
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Log is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Wrap an I/O failure hit while opening the log directory or its segments
    pub(crate) fn storage_init(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        LogError::StorageInit(format!("{}: {}", context, err))
    }
}
