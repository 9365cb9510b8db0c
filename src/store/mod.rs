//! Read-only access to single-file embedded stores
//!
//! Legacy shards keep their data in one memory-mapped B+tree file made of
//! fixed-size pages. Top-level buckets hang off a root bucket named in the
//! meta pages; each bucket is itself a B+tree or, when small, an inline leaf
//! page stored directly inside its parent's value.
//!
//! Only the operations needed to inspect shard metadata are provided: open
//! with a bounded lock wait, a read-only transaction, top-level and nested
//! bucket lookup, and key lookup. The reader never writes to the file.

mod error;
mod lock;
mod meta;
mod page;

#[cfg(test)]
pub(crate) mod fixture;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use tracing::{debug, warn};

pub use error::{StoreError, StoreResult};
pub use page::PageId;

use meta::Meta;
use page::{Page, BUCKET_HEADER_SIZE};

/// Page size assumed when meta page 0 cannot be read
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page that can hold a meta record
const MIN_PAGE_SIZE: usize = page::PAGE_HEADER_SIZE + meta::META_SIZE;

/// Guard against reference cycles in a damaged tree
const MAX_TREE_DEPTH: usize = 64;

/// Options controlling how a store file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long to wait for a conflicting lock to be released
    pub timeout: Duration,
    /// Delay between lock attempts
    pub retry_interval: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            retry_interval: Duration::from_millis(50),
        }
    }
}

impl StoreOptions {
    /// Set the lock timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the lock retry interval
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// An open, shared-locked store file
///
/// The lock and the mapping are released when the value is dropped.
pub struct StoreFile {
    path: PathBuf,
    file: File,
    mmap: Mmap,
    page_size: usize,
}

impl StoreFile {
    /// Open the store at `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P, options: &StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        lock::lock_shared(&file, options.timeout, options.retry_interval)?;

        // From here on the lock must be released on every error path.
        match Self::map(path, &file) {
            Ok((mmap, page_size)) => {
                debug!(path = %path.display(), page_size, "opened store");
                Ok(Self {
                    path: path.to_path_buf(),
                    file,
                    mmap,
                    page_size,
                })
            }
            Err(err) => {
                let _ = lock::unlock(&file);
                Err(err)
            }
        }
    }

    fn map(path: &Path, file: &File) -> StoreResult<(Mmap, usize)> {
        let size = file.metadata()?.len();
        let minimum = (DEFAULT_PAGE_SIZE * 2) as u64;
        if size == 0 {
            return Err(StoreError::TooSmall { size, required: minimum });
        }

        // Safety: the shared lock keeps cooperating writers out while mapped.
        let mmap = unsafe { Mmap::map(file)? };

        let page_size = match Page::new(&mmap).and_then(Meta::decode) {
            Ok(meta) if meta.validate().is_ok() && meta.page_size as usize >= MIN_PAGE_SIZE => {
                meta.page_size as usize
            }
            _ => {
                debug!(path = %path.display(), "meta page 0 unreadable, assuming default page size");
                DEFAULT_PAGE_SIZE
            }
        };

        let required = (page_size * 2) as u64;
        if size < required {
            return Err(StoreError::TooSmall { size, required });
        }

        Ok((mmap, page_size))
    }

    /// Path the store was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Page size recorded in the file
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Run `f` inside a read-only transaction.
    pub fn view<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Tx<'_>) -> StoreResult<T>,
    {
        let tx = self.begin()?;
        f(&tx)
    }

    /// Start a read-only transaction against the newest valid meta page.
    pub fn begin(&self) -> StoreResult<Tx<'_>> {
        let first = self.page(0).and_then(Meta::decode);
        let second = self.page(1).and_then(Meta::decode);
        let meta = meta::select(first, second)?;
        Ok(Tx { store: self, meta })
    }

    /// Borrow page `id` together with its overflow pages.
    fn page(&self, id: PageId) -> StoreResult<Page<'_>> {
        let start = usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_mul(self.page_size))
            .filter(|&start| fits(start, self.page_size, self.mmap.len()))
            .ok_or_else(|| {
                StoreError::corrupt(format!("page {} lies beyond the end of the file", id))
            })?;

        let header = Page::new(&self.mmap[start..start + self.page_size])?;
        let span = (header.overflow() as usize + 1)
            .checked_mul(self.page_size)
            .filter(|&span| fits(start, span, self.mmap.len()))
            .ok_or_else(|| {
                StoreError::corrupt(format!(
                    "page {} with {} overflow pages runs past the end of the file",
                    id,
                    header.overflow()
                ))
            })?;

        Page::new(&self.mmap[start..start + span])
    }
}

fn fits(start: usize, len: usize, total: usize) -> bool {
    start.checked_add(len).map_or(false, |end| end <= total)
}

impl Drop for StoreFile {
    fn drop(&mut self) {
        if let Err(err) = lock::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

impl std::fmt::Debug for StoreFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFile")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("len", &self.mmap.len())
            .finish()
    }
}

/// A read-only transaction
#[derive(Debug)]
pub struct Tx<'a> {
    store: &'a StoreFile,
    meta: Meta,
}

impl<'a> Tx<'a> {
    /// Transaction id of the meta page this transaction reads from
    pub fn id(&self) -> u64 {
        self.meta.txid
    }

    /// Look up a top-level bucket by name.
    pub fn bucket(&self, name: &[u8]) -> StoreResult<Option<Bucket<'a>>> {
        self.root().bucket(name)
    }

    fn root(&self) -> Bucket<'a> {
        Bucket {
            store: self.store,
            root: BucketRoot::Page(self.meta.root),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BucketRoot<'a> {
    Page(PageId),
    Inline(Page<'a>),
}

/// A bucket inside a transaction
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'a> {
    store: &'a StoreFile,
    root: BucketRoot<'a>,
}

impl<'a> Bucket<'a> {
    /// Value stored under `key`, or `None` if absent or if `key` names a nested bucket.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<&'a [u8]>> {
        Ok(self
            .seek(key)?
            .filter(|element| !element.is_bucket())
            .map(|element| element.value))
    }

    /// Look up a nested bucket by name.
    pub fn bucket(&self, name: &[u8]) -> StoreResult<Option<Bucket<'a>>> {
        let element = match self.seek(name)? {
            Some(element) if element.is_bucket() => element,
            _ => return Ok(None),
        };

        let value = element.value;
        if value.len() < BUCKET_HEADER_SIZE {
            return Err(StoreError::corrupt(format!(
                "bucket header for {:?} is {} bytes",
                String::from_utf8_lossy(name),
                value.len()
            )));
        }

        let root = LittleEndian::read_u64(&value[0..8]);
        let root = if root == 0 {
            BucketRoot::Inline(Page::new(&value[BUCKET_HEADER_SIZE..])?)
        } else {
            BucketRoot::Page(root)
        };

        Ok(Some(Bucket {
            store: self.store,
            root,
        }))
    }

    fn seek(&self, key: &[u8]) -> StoreResult<Option<page::LeafElement<'a>>> {
        let mut page = match self.root {
            BucketRoot::Inline(page) => page,
            BucketRoot::Page(id) => self.store.page(id)?,
        };

        for _ in 0..MAX_TREE_DEPTH {
            if page.is_leaf() {
                return page.find_leaf(key);
            }
            if !page.is_branch() || matches!(self.root, BucketRoot::Inline(_)) {
                return Err(StoreError::InvalidPage {
                    pgid: page.id(),
                    flags: page.flags(),
                });
            }
            page = self.store.page(page.find_child(key)?)?;
        }

        Err(StoreError::corrupt(format!(
            "tree deeper than {} levels",
            MAX_TREE_DEPTH
        )))
    }
}
