//! Test-only writer producing real store files
//!
//! Lays out two meta pages, an empty freelist page and a root tree holding
//! the requested top-level buckets.

use std::fs;
use std::io;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::store::meta::{Meta, MAGIC, VERSION};
use crate::store::page::{
    PageId, BRANCH_ELEMENT_SIZE, BRANCH_PAGE_FLAG, BUCKET_LEAF_FLAG, LEAF_ELEMENT_SIZE,
    LEAF_PAGE_FLAG, PAGE_HEADER_SIZE,
};
use crate::store::DEFAULT_PAGE_SIZE;

const META_PAGE_FLAG: u16 = 0x04;
const FREELIST_PAGE_FLAG: u16 = 0x10;

struct FixtureBucket {
    name: String,
    entries: Vec<(String, String)>,
    inline: bool,
}

/// Builder for a store file with a handful of top-level buckets
pub(crate) struct StoreFixture {
    page_size: usize,
    buckets: Vec<FixtureBucket>,
    branch_root: bool,
    corrupt_meta: [bool; 2],
}

impl StoreFixture {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buckets: Vec::new(),
            branch_root: false,
            corrupt_meta: [false; 2],
        }
    }

    /// Add a bucket stored inline in the root leaf.
    pub fn bucket(self, name: &str, entries: &[(&str, &str)]) -> Self {
        self.push(name, entries, true)
    }

    /// Add a bucket stored on its own leaf page.
    pub fn paged_bucket(self, name: &str, entries: &[(&str, &str)]) -> Self {
        self.push(name, entries, false)
    }

    /// Split the root into a branch page over one leaf per bucket.
    pub fn branch_root(mut self) -> Self {
        self.branch_root = true;
        self
    }

    /// Break the checksum of meta page `index` (0 or 1).
    pub fn corrupt_meta(mut self, index: usize) -> Self {
        self.corrupt_meta[index] = true;
        self
    }

    fn push(mut self, name: &str, entries: &[(&str, &str)], inline: bool) -> Self {
        let mut entries: Vec<(String, String)> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        entries.sort();
        self.buckets.push(FixtureBucket {
            name: name.to_string(),
            entries,
            inline,
        });
        self
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.bytes())
    }

    pub fn bytes(&self) -> Vec<u8> {
        // Pages 0 and 1 are meta, page 2 the freelist.
        let mut pages: Vec<Vec<u8>> = vec![Vec::new(), Vec::new(), header(2, FREELIST_PAGE_FLAG, 0)];

        let mut buckets: Vec<&FixtureBucket> = self.buckets.iter().collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));

        let mut root_elements = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let entries: Vec<(u32, &str, &str)> = bucket
                .entries
                .iter()
                .map(|(k, v)| (0, k.as_str(), v.as_str()))
                .collect();

            let mut value = vec![0u8; 16];
            if bucket.inline {
                value.extend(encode_leaf(0, &entries));
            } else {
                let pgid = pages.len() as PageId;
                pages.push(encode_leaf(pgid, &entries));
                LittleEndian::write_u64(&mut value[0..8], pgid);
            }
            root_elements.push((bucket.name.clone(), value));
        }

        let root = if self.branch_root && !root_elements.is_empty() {
            let mut separators = Vec::with_capacity(root_elements.len());
            for (name, value) in &root_elements {
                let pgid = pages.len() as PageId;
                pages.push(encode_leaf(pgid, &[(BUCKET_LEAF_FLAG, name.as_bytes(), value.as_slice())]));
                separators.push((name.as_bytes(), pgid));
            }
            let pgid = pages.len() as PageId;
            pages.push(encode_branch(pgid, &separators));
            pgid
        } else {
            let elements: Vec<(u32, &[u8], &[u8])> = root_elements
                .iter()
                .map(|(name, value)| (BUCKET_LEAF_FLAG, name.as_bytes(), value.as_slice()))
                .collect();
            let pgid = pages.len() as PageId;
            pages.push(encode_leaf(pgid, &elements));
            pgid
        };

        let high_water = pages.len() as PageId;
        for (index, txid) in [(0usize, 0u64), (1, 1)] {
            let mut page = header(index as PageId, META_PAGE_FLAG, 0);
            page.resize(PAGE_HEADER_SIZE + 64, 0);
            let meta = Meta {
                magic: MAGIC,
                version: VERSION,
                page_size: self.page_size as u32,
                flags: 0,
                root,
                sequence: 0,
                freelist: 2,
                pgid: high_water,
                txid,
                checksum: 0,
            };
            meta.encode(&mut page[PAGE_HEADER_SIZE..]);
            if self.corrupt_meta[index] {
                page[PAGE_HEADER_SIZE + 56] ^= 0xFF;
            }
            pages[index] = page;
        }

        let mut out = Vec::with_capacity(pages.len() * self.page_size);
        for page in pages {
            assert!(page.len() <= self.page_size, "fixture page overflows a single page");
            out.extend_from_slice(&page);
            out.resize(out.len() + self.page_size - page.len(), 0);
        }
        out
    }
}

fn header(id: PageId, flags: u16, count: usize) -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_HEADER_SIZE];
    LittleEndian::write_u64(&mut buf[0..8], id);
    LittleEndian::write_u16(&mut buf[8..10], flags);
    LittleEndian::write_u16(&mut buf[10..12], count as u16);
    buf
}

/// Encode a leaf page: element headers first, then packed keys and values.
pub(crate) fn encode_leaf<K, V>(id: PageId, elements: &[(u32, K, V)]) -> Vec<u8>
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let mut buf = header(id, LEAF_PAGE_FLAG, elements.len());
    buf.resize(PAGE_HEADER_SIZE + elements.len() * LEAF_ELEMENT_SIZE, 0);

    for (i, (flags, key, value)) in elements.iter().enumerate() {
        let (key, value) = (key.as_ref(), value.as_ref());
        let offset = PAGE_HEADER_SIZE + i * LEAF_ELEMENT_SIZE;
        let pos = buf.len() - offset;
        LittleEndian::write_u32(&mut buf[offset..offset + 4], *flags);
        LittleEndian::write_u32(&mut buf[offset + 4..offset + 8], pos as u32);
        LittleEndian::write_u32(&mut buf[offset + 8..offset + 12], key.len() as u32);
        LittleEndian::write_u32(&mut buf[offset + 12..offset + 16], value.len() as u32);
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);
    }
    buf
}

/// Encode a branch page of separator keys and child page ids.
pub(crate) fn encode_branch<K>(id: PageId, elements: &[(K, PageId)]) -> Vec<u8>
where
    K: AsRef<[u8]>,
{
    let mut buf = header(id, BRANCH_PAGE_FLAG, elements.len());
    buf.resize(PAGE_HEADER_SIZE + elements.len() * BRANCH_ELEMENT_SIZE, 0);

    for (i, (key, pgid)) in elements.iter().enumerate() {
        let key = key.as_ref();
        let offset = PAGE_HEADER_SIZE + i * BRANCH_ELEMENT_SIZE;
        let pos = buf.len() - offset;
        LittleEndian::write_u32(&mut buf[offset..offset + 4], pos as u32);
        LittleEndian::write_u32(&mut buf[offset + 4..offset + 8], key.len() as u32);
        LittleEndian::write_u64(&mut buf[offset + 8..offset + 16], *pgid);
        buf.extend_from_slice(key);
    }
    buf
}
