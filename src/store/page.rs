//! Page layout of the embedded store file
//!
//! Pages are read in place from the memory map. Every offset is bounds checked,
//! so a damaged file yields a [`StoreError`] instead of a panic.

use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};

use crate::store::error::{StoreError, StoreResult};

/// Page number within the store file
pub type PageId = u64;

pub(crate) const PAGE_HEADER_SIZE: usize = 16;
pub(crate) const LEAF_ELEMENT_SIZE: usize = 16;
pub(crate) const BRANCH_ELEMENT_SIZE: usize = 16;
pub(crate) const BUCKET_HEADER_SIZE: usize = 16;

pub(crate) const BRANCH_PAGE_FLAG: u16 = 0x01;
pub(crate) const LEAF_PAGE_FLAG: u16 = 0x02;

/// Leaf element flag marking a nested bucket
pub(crate) const BUCKET_LEAF_FLAG: u32 = 0x01;

/// A borrowed page, including any overflow pages that follow it
#[derive(Debug, Clone, Copy)]
pub(crate) struct Page<'a> {
    buf: &'a [u8],
}

/// A key/value pair stored on a leaf page
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeafElement<'a> {
    pub flags: u32,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl LeafElement<'_> {
    pub fn is_bucket(&self) -> bool {
        self.flags & BUCKET_LEAF_FLAG != 0
    }
}

/// A separator key and child pointer stored on a branch page
#[derive(Debug, Clone, Copy)]
pub(crate) struct BranchElement<'a> {
    pub key: &'a [u8],
    pub pgid: PageId,
}

impl<'a> Page<'a> {
    pub fn new(buf: &'a [u8]) -> StoreResult<Self> {
        if buf.len() < PAGE_HEADER_SIZE {
            return Err(StoreError::corrupt(format!(
                "page of {} bytes is shorter than its header",
                buf.len()
            )));
        }
        Ok(Self { buf })
    }

    pub fn id(&self) -> PageId {
        LittleEndian::read_u64(&self.buf[0..8])
    }

    pub fn flags(&self) -> u16 {
        LittleEndian::read_u16(&self.buf[8..10])
    }

    pub fn count(&self) -> usize {
        LittleEndian::read_u16(&self.buf[10..12]) as usize
    }

    pub fn overflow(&self) -> u32 {
        LittleEndian::read_u32(&self.buf[12..16])
    }

    pub fn is_leaf(&self) -> bool {
        self.flags() & LEAF_PAGE_FLAG != 0
    }

    pub fn is_branch(&self) -> bool {
        self.flags() & BRANCH_PAGE_FLAG != 0
    }

    /// Bytes following the page header
    pub fn body(&self) -> &'a [u8] {
        &self.buf[PAGE_HEADER_SIZE..]
    }

    pub fn leaf_element(&self, index: usize) -> StoreResult<LeafElement<'a>> {
        let offset = self.element_offset(index, LEAF_ELEMENT_SIZE)?;
        let header = range(self.buf, offset, LEAF_ELEMENT_SIZE)?;
        let flags = LittleEndian::read_u32(&header[0..4]);
        let pos = LittleEndian::read_u32(&header[4..8]) as usize;
        let ksize = LittleEndian::read_u32(&header[8..12]) as usize;
        let vsize = LittleEndian::read_u32(&header[12..16]) as usize;

        let key_start = add(offset, pos)?;
        let key = range(self.buf, key_start, ksize)?;
        let value = range(self.buf, add(key_start, ksize)?, vsize)?;

        Ok(LeafElement { flags, key, value })
    }

    pub fn branch_element(&self, index: usize) -> StoreResult<BranchElement<'a>> {
        let offset = self.element_offset(index, BRANCH_ELEMENT_SIZE)?;
        let header = range(self.buf, offset, BRANCH_ELEMENT_SIZE)?;
        let pos = LittleEndian::read_u32(&header[0..4]) as usize;
        let ksize = LittleEndian::read_u32(&header[4..8]) as usize;
        let pgid = LittleEndian::read_u64(&header[8..16]);

        let key = range(self.buf, add(offset, pos)?, ksize)?;

        Ok(BranchElement { key, pgid })
    }

    /// Binary search for `key` on a leaf page.
    pub fn find_leaf(&self, key: &[u8]) -> StoreResult<Option<LeafElement<'a>>> {
        let (index, exact) = self.search(key, |i| Ok(self.leaf_element(i)?.key))?;
        if exact {
            Ok(Some(self.leaf_element(index)?))
        } else {
            Ok(None)
        }
    }

    /// Child page that would contain `key` on a branch page.
    pub fn find_child(&self, key: &[u8]) -> StoreResult<PageId> {
        if self.count() == 0 {
            return Err(StoreError::corrupt(format!("branch page {} has no elements", self.id())));
        }
        let (mut index, exact) = self.search(key, |i| Ok(self.branch_element(i)?.key))?;
        if !exact && index > 0 {
            index -= 1;
        }
        let index = index.min(self.count() - 1);
        Ok(self.branch_element(index)?.pgid)
    }

    /// First index whose key is >= `target`, and whether it matched exactly.
    fn search<F>(&self, target: &[u8], key_at: F) -> StoreResult<(usize, bool)>
    where
        F: Fn(usize) -> StoreResult<&'a [u8]>,
    {
        let (mut lo, mut hi) = (0, self.count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match key_at(mid)?.cmp(target) {
                Ordering::Less => lo = mid + 1,
                Ordering::Equal => return Ok((mid, true)),
                Ordering::Greater => hi = mid,
            }
        }
        Ok((lo, false))
    }

    fn element_offset(&self, index: usize, size: usize) -> StoreResult<usize> {
        if index >= self.count() {
            return Err(StoreError::corrupt(format!(
                "element {} out of range on page {} with {} elements",
                index,
                self.id(),
                self.count()
            )));
        }
        Ok(PAGE_HEADER_SIZE + index * size)
    }
}

fn add(base: usize, delta: usize) -> StoreResult<usize> {
    base.checked_add(delta).ok_or_else(|| {
        StoreError::corrupt(format!("element offset {} + {} overflows", base, delta))
    })
}

fn range(buf: &[u8], start: usize, len: usize) -> StoreResult<&[u8]> {
    start
        .checked_add(len)
        .and_then(|end| buf.get(start..end))
        .ok_or_else(|| {
            StoreError::corrupt(format!(
                "range {}..{} exceeds page bounds of {} bytes",
                start,
                start.saturating_add(len),
                buf.len()
            ))
        })
}
