//! Error types for the embedded store reader
//!
//! Defines error types specific to opening and reading single-file stores.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::store::page::PageId;

/// Errors that can occur while reading an embedded store file
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another handle held a conflicting lock for longer than the open timeout
    #[error("Timed out after {0:?} waiting for the file lock")]
    Timeout(Duration),

    /// File is too small to hold both meta pages
    #[error("File size too small: {size} bytes, need at least {required}")]
    TooSmall {
        size: u64,
        required: u64,
    },

    /// Neither meta page passed validation
    #[error("Invalid meta pages: {0}")]
    InvalidMeta(String),

    /// A page reached during traversal has an unexpected type
    #[error("Invalid page type at page {pgid}: flags {flags:#06x}")]
    InvalidPage {
        pgid: PageId,
        flags: u16,
    },

    /// Structural damage inside a page
    #[error("Store corrupted: {0}")]
    Corrupt(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a new corruption error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    /// Create a new invalid meta error
    pub fn invalid_meta(message: impl Into<String>) -> Self {
        Self::InvalidMeta(message.into())
    }

    /// Check if this is a lock timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this error means the file content cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::TooSmall { .. } | Self::InvalidMeta(_) | Self::InvalidPage { .. } | Self::Corrupt(_)
        )
    }
}
