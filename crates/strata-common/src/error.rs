//! Error types for StrataDB.

use thiserror::Error;

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Errors that can occur in StrataDB operations.
#[derive(Debug, Error)]
pub enum StrataError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Buffer pool errors
    #[error("Buffer pool exhausted, no unpinned buffer available")]
    BufferPoolFull,

    // WAL errors
    #[error("WAL corrupted at LSN {lsn}: {reason}")]
    WalCorrupted { lsn: u64, reason: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// Returns true if the error signals buffer pool exhaustion.
    ///
    /// Exhaustion is non-exceptional flow control: the caller decides
    /// whether to retry, back off, or escalate.
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, StrataError::BufferPoolFull)
    }
}
