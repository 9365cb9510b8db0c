//! Directory walking
//!
//! A data directory holds one sub-directory per database, each database one
//! sub-directory per retention policy, and each retention policy one entry per
//! shard. Traversal is sequential and eager: the first failure aborts the scan
//! and no partial results are returned.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::shard::{FormatDetector, ShardInfo, ShardInventory};

/// Lists and classifies the shards of one database directory
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    path: PathBuf,
    detector: FormatDetector,
}

impl DirectoryScanner {
    /// Bind to the database directory at `path`. No I/O is performed.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_detector(path, FormatDetector::new())
    }

    /// Bind to a database directory using the store options from `config`
    pub fn with_config<P: AsRef<Path>>(path: P, config: &ScanConfig) -> Self {
        Self::with_detector(path, FormatDetector::from_config(config))
    }

    /// Bind to a database directory using an existing detector
    pub fn with_detector<P: AsRef<Path>>(path: P, detector: FormatDetector) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            detector,
        }
    }

    /// Database name, taken from the final path segment
    pub fn name(&self) -> String {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.path.display().to_string(),
        }
    }

    /// Database directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Classify every shard of this database, sorted by retention policy and path.
    ///
    /// Listing failures come back as [`Error::Path`] naming the directory; the
    /// original `io::Error` is reachable through `source()`, and its kind via
    /// [`Error::io_kind`].
    pub fn list_shards(&self) -> Result<Vec<ShardInfo>> {
        let database = self.name();
        let mut shards = Vec::new();

        for policy in read_dir_names(&self.path)? {
            let policy_path = self.path.join(&policy);
            let policy = policy.to_string_lossy().into_owned();

            for shard in read_dir_names(&policy_path)? {
                let (format, size) = self.detector.detect(policy_path.join(&shard))?;
                shards.push(ShardInfo::new(
                    database.as_str(),
                    policy.as_str(),
                    shard.to_string_lossy(),
                    format,
                    size,
                )?);
            }
        }

        shards.sort();
        debug!(database = %database, shards = shards.len(), "listed shards");
        Ok(shards)
    }
}

/// Scan every database under the data directory `root`.
///
/// Databases not selected by `config` are skipped without touching them. The
/// merged result is sorted and, if `config.exclude_format` is set, filtered.
pub fn scan_data_dir<P: AsRef<Path>>(root: P, config: &ScanConfig) -> Result<ShardInventory> {
    config.validate()?;
    let root = root.as_ref();

    let mut inventory = ShardInventory::new();
    for name in read_dir_names(root)? {
        let scanner = DirectoryScanner::with_config(root.join(&name), config);
        if !config.selects_database(&scanner.name()) {
            debug!(database = %scanner.name(), "database not selected, skipping");
            continue;
        }

        let shards = scanner.list_shards()?;
        info!(database = %scanner.name(), shards = shards.len(), "scanned database");
        inventory.extend(shards);
    }

    inventory.sort();
    if let Some(excluded) = config.exclude_format {
        inventory = inventory.filter(excluded);
    }
    Ok(inventory)
}

/// Names of the immediate children of `path`, in filesystem order
fn read_dir_names(path: &Path) -> Result<Vec<OsString>> {
    let entries = fs::read_dir(path).map_err(|e| Error::path(path, e))?;
    entries
        .map(|entry| entry.map(|e| e.file_name()).map_err(|e| Error::path(path, e)))
        .collect()
}
