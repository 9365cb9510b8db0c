//! Configuration for shard scans
//!
//! This module provides the options controlling how a data directory is
//! scanned and which shards end up in the resulting inventory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shard::EngineFormat;
use crate::store::StoreOptions;

/// Configuration options for a shard scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ScanConfig {
    /// Milliseconds to wait for a locked shard file before failing
    pub open_timeout_ms: u64,
    /// Milliseconds between lock attempts while waiting
    pub lock_retry_interval_ms: u64,
    /// Format dropped from data directory scan results
    pub exclude_format: Option<EngineFormat>,
    /// Databases to include; empty means all
    pub databases: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            open_timeout_ms: 1000,
            lock_retry_interval_ms: 50,
            exclude_format: Some(EngineFormat::Tsm1),
            databases: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Create a new scan configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store open timeout in milliseconds
    pub fn with_open_timeout_ms(mut self, ms: u64) -> Self {
        self.open_timeout_ms = ms;
        self
    }

    /// Set the lock retry interval in milliseconds
    pub fn with_lock_retry_interval_ms(mut self, ms: u64) -> Self {
        self.lock_retry_interval_ms = ms;
        self
    }

    /// Set the format to drop from scan results, or `None` to keep everything
    pub fn with_exclude_format(mut self, format: Option<EngineFormat>) -> Self {
        self.exclude_format = format;
        self
    }

    /// Restrict the scan to the given databases
    pub fn with_databases<I, S>(mut self, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.databases = databases.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the scan to a comma-delimited list of databases
    pub fn with_databases_csv(self, list: &str) -> Self {
        self.with_databases(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.open_timeout_ms == 0 {
            return Err(Error::config("Open timeout must be at least 1ms"));
        }

        if self.lock_retry_interval_ms == 0 {
            return Err(Error::config("Lock retry interval must be at least 1ms"));
        }

        if self.lock_retry_interval_ms > self.open_timeout_ms {
            return Err(Error::config(
                "Lock retry interval must not exceed the open timeout",
            ));
        }

        if let Some(name) = self.databases.iter().find(|name| name.trim().is_empty()) {
            return Err(Error::config(format!("Invalid database name: {:?}", name)));
        }

        Ok(())
    }

    /// Whether a database with this name should be scanned
    pub fn selects_database(&self, name: &str) -> bool {
        self.databases.is_empty() || self.databases.iter().any(|db| db == name)
    }

    /// Get the open timeout as a Duration
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Get the lock retry interval as a Duration
    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms)
    }

    /// Options used to open single-file shard stores
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default()
            .with_timeout(self.open_timeout())
            .with_retry_interval(self.lock_retry_interval())
    }

    /// Create a human-readable string representation of the configuration
    pub fn to_string_pretty(&self) -> String {
        let mut result = String::new();

        result.push_str("=== Scan Configuration ===\n\n");

        result.push_str("Store Access:\n");
        result.push_str(&format!("  Open Timeout: {} ms\n", self.open_timeout_ms));
        result.push_str(&format!("  Lock Retry Interval: {} ms\n", self.lock_retry_interval_ms));

        result.push_str("\nSelection:\n");
        match self.exclude_format {
            Some(format) => result.push_str(&format!("  Excluded Format: {}\n", format)),
            None => result.push_str("  Excluded Format: none\n"),
        }
        if self.databases.is_empty() {
            result.push_str("  Databases: all\n");
        } else {
            result.push_str(&format!("  Databases: {}\n", self.databases.join(", ")));
        }

        result
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::path(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::path(path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();

        assert_eq!(config.open_timeout_ms, 1000);
        assert_eq!(config.lock_retry_interval_ms, 50);
        assert_eq!(config.exclude_format, Some(EngineFormat::Tsm1));
        assert!(config.databases.is_empty());
        assert_eq!(config.open_timeout(), Duration::from_secs(1));
        assert_eq!(config.store_options(), StoreOptions::default());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new()
            .with_open_timeout_ms(250)
            .with_lock_retry_interval_ms(25)
            .with_exclude_format(None)
            .with_databases_csv("telegraf, _internal,,stats");

        assert_eq!(config.open_timeout(), Duration::from_millis(250));
        assert_eq!(config.lock_retry_interval(), Duration::from_millis(25));
        assert_eq!(config.exclude_format, None);
        assert_eq!(config.databases, vec!["telegraf", "_internal", "stats"]);

        assert!(config.selects_database("stats"));
        assert!(!config.selects_database("other"));
        assert!(ScanConfig::new().selects_database("anything"));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let invalid_configs = vec![
            ScanConfig::new().with_open_timeout_ms(0),
            ScanConfig::new().with_lock_retry_interval_ms(0),
            ScanConfig::new().with_open_timeout_ms(10).with_lock_retry_interval_ms(20),
            ScanConfig::new().with_databases(vec!["db", " "]),
        ];

        for config in invalid_configs {
            assert!(config.validate().unwrap_err().is_config_error());
        }
    }

    #[test]
    fn test_config_pretty_string() {
        let pretty = ScanConfig::new().with_databases(vec!["a", "b"]).to_string_pretty();

        assert!(pretty.contains("Store Access:"));
        assert!(pretty.contains("Open Timeout: 1000 ms"));
        assert!(pretty.contains("Excluded Format: tsm1"));
        assert!(pretty.contains("Databases: a, b"));
    }

    #[test]
    fn test_json_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.json");

        let config = ScanConfig::new()
            .with_open_timeout_ms(500)
            .with_exclude_format(Some(EngineFormat::B1))
            .with_databases(vec!["telegraf"]);
        config.to_json_file(&path)?;

        let loaded = ScanConfig::from_json_file(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_json_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.json");
        fs::write(&path, r#"{ "exclude_format": "bz1" }"#)?;

        let loaded = ScanConfig::from_json_file(&path)?;
        assert_eq!(loaded.exclude_format, Some(EngineFormat::Bz1));
        assert_eq!(loaded.open_timeout_ms, 1000);

        fs::write(&path, r#"{ "open_timeout_ms": 0 }"#)?;
        assert!(ScanConfig::from_json_file(&path).unwrap_err().is_config_error());

        fs::write(&path, r#"{ "exclude_format": "tsm9" }"#)?;
        assert!(matches!(
            ScanConfig::from_json_file(&path),
            Err(Error::Serialization(_))
        ));
        Ok(())
    }
}
