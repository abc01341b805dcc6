//! Error types for talkwire
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TalkError
pub type Result<T> = std::result::Result<T, TalkError>;

/// Unified error type for talkwire operations
#[derive(Debug, Error)]
pub enum TalkError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    /// The peer could not be reached, or the write to it failed
    #[error("Connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reply had a length with no defined integer width
    #[error("Cannot decode reply of {len} bytes (expected 1, 2 or 4)")]
    Decode { len: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Request worker exited without reporting an outcome")]
    WorkerLost,
}

impl TalkError {
    /// Wrap an I/O error raised while talking to `addr`
    pub(crate) fn connection(addr: impl Into<String>, source: std::io::Error) -> Self {
        TalkError::Connection {
            addr: addr.into(),
            source,
        }
    }
}
