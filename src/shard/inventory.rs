//! Ordered collections of shard records
//!
//! A [`ShardInventory`] is built once from scan output and then queried.
//! Query methods never modify the inventory they are called on.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::shard::{EngineFormat, ShardInfo, ShardStats};

/// An ordered set of shard records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShardInventory {
    shards: Vec<ShardInfo>,
}

impl ShardInventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by database, retention policy, then shard path
    pub fn sort(&mut self) {
        self.shards.sort();
    }

    /// Copy of the inventory without shards of the `excluded` format
    pub fn filter(&self, excluded: EngineFormat) -> Self {
        self.select(|shard| shard.format() != excluded)
    }

    /// Copy of the inventory holding only shards of `format`
    pub fn by_format(&self, format: EngineFormat) -> Self {
        self.select(|shard| shard.format() == format)
    }

    /// Copy of the inventory holding only shards from the named databases
    pub fn retain_databases<S: AsRef<str>>(&self, databases: &[S]) -> Self {
        self.select(|shard| databases.iter().any(|db| db.as_ref() == shard.database()))
    }

    fn select<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&ShardInfo) -> bool,
    {
        Self {
            shards: self.shards.iter().filter(|shard| keep(*shard)).cloned().collect(),
        }
    }

    /// Sorted, de-duplicated database names
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shards.iter().map(|s| s.database().to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Shards grouped by database, preserving inventory order within each group
    pub fn group_by_database(&self) -> BTreeMap<&str, Vec<&ShardInfo>> {
        let mut groups: BTreeMap<&str, Vec<&ShardInfo>> = BTreeMap::new();
        for shard in &self.shards {
            groups.entry(shard.database()).or_default().push(shard);
        }
        groups
    }

    /// Aggregate statistics
    pub fn stats(&self) -> ShardStats {
        ShardStats::from_shards(&self.shards)
    }

    /// Total size of all shards in bytes
    pub fn total_size(&self) -> u64 {
        self.shards.iter().map(ShardInfo::size).sum()
    }

    /// Number of shards
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Check if the inventory holds no shards
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Iterate over shards in inventory order
    pub fn iter(&self) -> std::slice::Iter<'_, ShardInfo> {
        self.shards.iter()
    }

    /// Borrow the shards as a slice
    pub fn as_slice(&self) -> &[ShardInfo] {
        &self.shards
    }

    /// Consume the inventory, returning its shards
    pub fn into_vec(self) -> Vec<ShardInfo> {
        self.shards
    }
}

impl From<Vec<ShardInfo>> for ShardInventory {
    fn from(shards: Vec<ShardInfo>) -> Self {
        Self { shards }
    }
}

impl FromIterator<ShardInfo> for ShardInventory {
    fn from_iter<I: IntoIterator<Item = ShardInfo>>(iter: I) -> Self {
        Self {
            shards: iter.into_iter().collect(),
        }
    }
}

impl Extend<ShardInfo> for ShardInventory {
    fn extend<I: IntoIterator<Item = ShardInfo>>(&mut self, iter: I) {
        self.shards.extend(iter);
    }
}

impl IntoIterator for ShardInventory {
    type Item = ShardInfo;
    type IntoIter = std::vec::IntoIter<ShardInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.into_iter()
    }
}

impl<'a> IntoIterator for &'a ShardInventory {
    type Item = &'a ShardInfo;
    type IntoIter = std::slice::Iter<'a, ShardInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.iter()
    }
}
