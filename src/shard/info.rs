//! Shard information and statistics data structures
//!
//! Provides the immutable per-shard record produced by a scan and aggregate
//! statistics over a set of them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::shard::EngineFormat;

/// Description of a shard on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ShardInfo {
    database: String,
    retention_policy: String,
    path: String,
    format: EngineFormat,
    size: u64,
}

impl ShardInfo {
    /// Create a new shard info, rejecting empty names
    pub fn new(
        database: impl Into<String>,
        retention_policy: impl Into<String>,
        path: impl Into<String>,
        format: EngineFormat,
        size: u64,
    ) -> Result<Self> {
        let info = Self {
            database: database.into(),
            retention_policy: retention_policy.into(),
            path: path.into(),
            format,
            size,
        };

        for (field, value) in [
            ("database", &info.database),
            ("retention policy", &info.retention_policy),
            ("path", &info.path),
        ] {
            if value.is_empty() {
                return Err(Error::invalid_shard(format!("{} name must not be empty", field)));
            }
        }

        Ok(info)
    }

    /// Name of the owning database
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Name of the owning retention policy
    pub fn retention_policy(&self) -> &str {
        &self.retention_policy
    }

    /// Shard name within its retention policy
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Engine that wrote the shard
    pub fn format(&self) -> EngineFormat {
        self.format
    }

    /// Size on disk in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Canonical format tag
    pub fn format_label(&self) -> &'static str {
        self.format.label()
    }

    /// Path of the shard relative to the data directory
    pub fn relative_path(&self) -> String {
        format!("{}/{}/{}", self.database, self.retention_policy, self.path)
    }
}

impl Ord for ShardInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.database
            .cmp(&other.database)
            .then_with(|| self.retention_policy.cmp(&other.retention_policy))
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.format.cmp(&other.format))
            .then_with(|| self.size.cmp(&other.size))
    }
}

impl PartialOrd for ShardInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ShardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {} bytes]",
            self.relative_path(),
            self.format,
            self.size
        )
    }
}

/// Shard count and byte total for one format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormatTotals {
    pub shards: usize,
    pub size_bytes: u64,
}

/// Statistics about a set of shards
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShardStats {
    /// Number of shards
    pub shard_count: usize,
    /// Number of distinct databases
    pub database_count: usize,
    /// Number of distinct (database, retention policy) pairs
    pub retention_policy_count: usize,
    /// Total size of all shards in bytes
    pub total_size_bytes: u64,
    /// Totals broken down by engine format
    pub per_format: BTreeMap<EngineFormat, FormatTotals>,
}

impl ShardStats {
    /// Create new empty shard stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute statistics over `shards`
    pub fn from_shards<'a, I>(shards: I) -> Self
    where
        I: IntoIterator<Item = &'a ShardInfo>,
    {
        let mut stats = Self::new();
        let mut databases = BTreeSet::new();
        let mut policies = BTreeSet::new();

        for shard in shards {
            stats.shard_count += 1;
            stats.total_size_bytes += shard.size;
            let totals = stats.per_format.entry(shard.format).or_default();
            totals.shards += 1;
            totals.size_bytes += shard.size;
            databases.insert(shard.database.as_str());
            policies.insert((shard.database.as_str(), shard.retention_policy.as_str()));
        }

        stats.database_count = databases.len();
        stats.retention_policy_count = policies.len();
        stats
    }

    /// Totals for a single format
    pub fn totals(&self, format: EngineFormat) -> FormatTotals {
        self.per_format.get(&format).copied().unwrap_or_default()
    }

    /// Number of shards still written by a legacy engine
    pub fn convertible_shards(&self) -> usize {
        self.per_format
            .iter()
            .filter(|(format, _)| format.needs_conversion())
            .map(|(_, totals)| totals.shards)
            .sum()
    }

    /// Check if there are any shards
    pub fn has_shards(&self) -> bool {
        self.shard_count > 0
    }

    /// Create a human-readable report of statistics
    pub fn report(&self) -> String {
        let mut result = String::new();

        result.push_str("=== Shard Inventory ===\n\n");

        result.push_str(&format!("Total Shards: {}\n", self.shard_count));
        for format in EngineFormat::all() {
            let totals = self.totals(format);
            result.push_str(&format!(
                "  - {}: {} ({} bytes)\n",
                format, totals.shards, totals.size_bytes
            ));
        }

        result.push_str(&format!("Databases: {}\n", self.database_count));
        result.push_str(&format!("Retention Policies: {}\n", self.retention_policy_count));
        result.push_str(&format!("Total Size: {} bytes\n", self.total_size_bytes));

        if self.has_shards() {
            result.push_str(&format!("Shards Needing Conversion: {}\n", self.convertible_shards()));
        }

        result
    }
}
