//! Storage engine detection for a single shard
//!
//! Current-engine shards are directories of segment files. Legacy shards are a
//! single embedded store file whose `meta` bucket, when present, records the
//! engine version that wrote it.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::shard::EngineFormat;
use crate::store::{StoreFile, StoreOptions, StoreResult, Tx};

/// Bucket holding engine metadata in single-file shards
pub const META_BUCKET: &[u8] = b"meta";

/// Key inside [`META_BUCKET`] naming the engine version
pub const FORMAT_KEY: &[u8] = b"format";

/// Format marker written by the original engine
const B1_FORMAT_MARKER: &[u8] = b"v1";

/// Classifies shards by the storage engine that wrote them
#[derive(Debug, Clone, Default)]
pub struct FormatDetector {
    options: StoreOptions,
}

impl FormatDetector {
    /// Create a detector with the default one second open timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with explicit store open options
    pub fn with_options(options: StoreOptions) -> Self {
        Self { options }
    }

    /// Create a detector from a scan configuration
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::with_options(config.store_options())
    }

    /// Options used when opening single-file shards
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Determine the format and on-disk size of the shard at `path`.
    ///
    /// Directories are reported with the size of the directory entry itself,
    /// not the sum of their contents.
    pub fn detect<P: AsRef<Path>>(&self, path: P) -> Result<(EngineFormat, u64)> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| Error::path(path, e))?;

        let format = if metadata.is_dir() {
            EngineFormat::Tsm1
        } else {
            let store = StoreFile::open(path, &self.options).map_err(|e| Error::store(path, e))?;
            store
                .view(single_file_format)
                .map_err(|e| Error::store(path, e))?
        };

        debug!(path = %path.display(), %format, size = metadata.len(), "classified shard");
        Ok((format, metadata.len()))
    }
}

fn single_file_format(tx: &Tx<'_>) -> StoreResult<EngineFormat> {
    let meta = match tx.bucket(META_BUCKET)? {
        Some(bucket) => bucket,
        // Stores predating the meta bucket are b1.
        None => return Ok(EngineFormat::B1),
    };

    match meta.get(FORMAT_KEY)? {
        Some(B1_FORMAT_MARKER) => Ok(EngineFormat::B1),
        _ => Ok(EngineFormat::Bz1),
    }
}
