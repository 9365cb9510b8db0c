//! Shard discovery and classification
//!
//! This module walks a data directory laid out as
//! `<database>/<retention policy>/<shard>`, determines the storage engine
//! of every shard it finds, and collects the results into an ordered
//! [`ShardInventory`].

mod detect;
mod format;
mod info;
mod inventory;
mod scanner;

pub use detect::{FormatDetector, FORMAT_KEY, META_BUCKET};
pub use format::EngineFormat;
pub use info::{FormatTotals, ShardInfo, ShardStats};
pub use inventory::ShardInventory;
pub use scanner::{scan_data_dir, DirectoryScanner};
