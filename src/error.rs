//! Error handling for shard inventory
//!
//! This module provides error types and result aliases for scanning and
//! classifying shards.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while building a shard inventory
#[derive(Error, Debug)]
pub enum Error {
    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O errors tied to a specific directory or shard
    #[error("I/O error for {path:?}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Errors opening or reading a single-file shard store
    #[error("Store error for {path:?}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// A shard record failed validation
    #[error("Invalid shard: {0}")]
    InvalidShard(String),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for shard inventory operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new path-scoped I/O error
    pub fn path(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Path {
            path: path.into(),
            source,
        }
    }

    /// Create a new store error
    pub fn store(path: impl Into<PathBuf>, source: StoreError) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }

    /// Create a new invalid shard error
    pub fn invalid_shard(message: impl Into<String>) -> Self {
        Self::InvalidShard(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        self.io_kind().is_some()
    }

    /// Kind of the underlying I/O error, wherever it was raised
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(err) | Self::Path { source: err, .. } => Some(err.kind()),
            Self::Store { source: StoreError::Io(err), .. } => Some(err.kind()),
            _ => None,
        }
    }

    /// Check if a store could not be opened because another process holds it
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_timeout())
    }

    /// Check if this is a corruption error
    pub fn is_corruption_error(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_corruption())
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Get a user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        if self.is_timeout() {
            return Some("The shard is locked; stop the database server before scanning".to_string());
        }
        if self.is_corruption_error() {
            return Some("The shard file is damaged. Consider restoring it from a backup".to_string());
        }
        match self.io_kind() {
            Some(io::ErrorKind::NotFound) => {
                Some("The specified file or directory does not exist".to_string())
            }
            Some(io::ErrorKind::PermissionDenied) => {
                Some("You don't have permission to access this file or directory".to_string())
            }
            _ => None,
        }
    }
}
