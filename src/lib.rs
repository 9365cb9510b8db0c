//! Shard inventory for time-series data directories
//!
//! Walks a `<database>/<retention policy>/<shard>` tree and reports, for every
//! shard, which storage engine wrote it: the directory-based `tsm1` engine or
//! one of the single-file `b1` and `bz1` engines. Single-file shards are
//! inspected through a read-only reader for the embedded B+tree store they are
//! kept in.
//!
//! ```no_run
//! use shard_inventory::{scan_data_dir, ScanConfig};
//!
//! # fn main() -> shard_inventory::Result<()> {
//! let inventory = scan_data_dir("/var/lib/influxdb/data", &ScanConfig::new())?;
//! for shard in &inventory {
//!     println!("{}", shard);
//! }
//! println!("{}", inventory.stats().report());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod shard;
pub mod store;

pub use config::ScanConfig;
pub use error::{Error, Result};
pub use shard::{
    scan_data_dir, DirectoryScanner, EngineFormat, FormatDetector, FormatTotals, ShardInfo,
    ShardInventory, ShardStats,
};
