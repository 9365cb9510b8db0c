//! Storage engine formats
//!
//! Shards on disk were written by one of three successive storage engines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage engine that produced a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineFormat {
    /// Original single-file layout
    B1,
    /// Compressed single-file successor of b1
    Bz1,
    /// Directory-based columnar layout
    Tsm1,
}

impl fmt::Display for EngineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EngineFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "b1" => Ok(Self::B1),
            "bz1" => Ok(Self::Bz1),
            "tsm1" => Ok(Self::Tsm1),
            _ => Err(Error::config(format!("Unknown engine format: {}", s))),
        }
    }
}

impl EngineFormat {
    /// Canonical lowercase tag
    pub fn label(&self) -> &'static str {
        match self {
            Self::B1 => "b1",
            Self::Bz1 => "bz1",
            Self::Tsm1 => "tsm1",
        }
    }

    /// Whether shards in this format live in a single embedded store file
    pub fn is_single_file(&self) -> bool {
        matches!(self, Self::B1 | Self::Bz1)
    }

    /// Whether a shard in this format needs converting to the current engine
    pub fn needs_conversion(&self) -> bool {
        *self != Self::current()
    }

    /// Format written by the current engine
    pub fn current() -> Self {
        Self::Tsm1
    }

    /// Get all engine formats, oldest first
    pub fn all() -> [Self; 3] {
        [Self::B1, Self::Bz1, Self::Tsm1]
    }
}
