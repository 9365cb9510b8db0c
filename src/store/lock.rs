//! Advisory file locking with a bounded wait
//!
//! A live server keeps its shard files exclusively locked. Readers poll for a
//! shared lock and give up once the timeout expires instead of blocking.

use std::fs::File;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::store::error::{StoreError, StoreResult};

/// Lower bound on the delay between lock attempts
const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Acquire a shared lock on `file`, polling every `retry_interval` until `timeout`.
pub(crate) fn lock_shared(file: &File, timeout: Duration, retry_interval: Duration) -> StoreResult<()> {
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match FileExt::try_lock_shared(file) {
            Ok(()) => {
                debug!(attempts, "acquired shared lock");
                return Ok(());
            }
            Err(err) if is_contended(&err) => {}
            Err(err) => return Err(StoreError::Io(err)),
        }

        let waited = start.elapsed();
        if waited >= timeout {
            return Err(StoreError::Timeout(timeout));
        }
        if attempts == 1 {
            warn!(?timeout, "file is locked by another process, waiting");
        }
        thread::sleep(poll_delay(retry_interval, timeout - waited));
    }
}

/// Delay before the next attempt, never zero and never past the deadline
fn poll_delay(retry_interval: Duration, remaining: Duration) -> Duration {
    retry_interval.max(MIN_RETRY_INTERVAL).min(remaining)
}

pub(crate) fn unlock(file: &File) -> io::Result<()> {
    FileExt::unlock(file)
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
