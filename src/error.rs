//! Error types for usnjrnl
//!
//! Decoding errors are split between recoverable conditions (a single record
//! could not be decoded) and fatal ones (the byte source itself failed).

use thiserror::Error;

/// Main error type for journal decoding
#[derive(Error, Debug)]
pub enum UsnJrnlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    #[error("Corrupted USN record: {0}")]
    CorruptedRecord(String),

    #[error("USN record version {major}.{minor} is not implemented")]
    UnsupportedVersion { major: i16, minor: i16 },

    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for usnjrnl operations
pub type Result<T> = std::result::Result<T, UsnJrnlError>;

impl UsnJrnlError {
    /// Create a corruption error with a formatted reason
    pub fn corrupted(reason: impl Into<String>) -> Self {
        UsnJrnlError::CorruptedRecord(reason.into())
    }

    /// Check if this error is recoverable (scan can continue past the record)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UsnJrnlError::CorruptedRecord(_) | UsnJrnlError::BufferTooSmall { .. }
        )
    }

    /// Check if this error comes from a recognized but unimplemented layout
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, UsnJrnlError::UnsupportedVersion { .. })
    }
}
