//! Meta pages
//!
//! The first two pages of a store file each hold a copy of the meta record.
//! Writers alternate between them, so the valid copy with the highest
//! transaction id describes the current tree.

use byteorder::{ByteOrder, LittleEndian};

use crate::store::error::{StoreError, StoreResult};
use crate::store::page::{Page, PageId};

/// Magic number identifying a store file
pub(crate) const MAGIC: u32 = 0xED0C_DAED;

/// On-disk format version understood by this reader
pub(crate) const VERSION: u32 = 2;

/// Encoded size of the meta record, excluding the page header
pub(crate) const META_SIZE: usize = 64;

/// Bytes covered by the checksum
const CHECKSUM_OFFSET: usize = 56;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Decoded meta record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Meta {
    pub magic: u32,
    pub version: u32,
    pub page_size: u32,
    pub flags: u32,
    /// Root page of the top-level bucket
    pub root: PageId,
    pub sequence: u64,
    pub freelist: PageId,
    /// High water mark of allocated pages
    pub pgid: PageId,
    pub txid: u64,
    pub checksum: u64,
}

impl Meta {
    /// Decode the meta record that follows the header of `page`.
    pub fn decode(page: Page<'_>) -> StoreResult<Self> {
        let body = page.body();
        if body.len() < META_SIZE {
            return Err(StoreError::invalid_meta(format!(
                "meta page {} holds {} bytes, expected {}",
                page.id(),
                body.len(),
                META_SIZE
            )));
        }

        Ok(Self {
            magic: LittleEndian::read_u32(&body[0..4]),
            version: LittleEndian::read_u32(&body[4..8]),
            page_size: LittleEndian::read_u32(&body[8..12]),
            flags: LittleEndian::read_u32(&body[12..16]),
            root: LittleEndian::read_u64(&body[16..24]),
            sequence: LittleEndian::read_u64(&body[24..32]),
            freelist: LittleEndian::read_u64(&body[32..40]),
            pgid: LittleEndian::read_u64(&body[40..48]),
            txid: LittleEndian::read_u64(&body[48..56]),
            checksum: LittleEndian::read_u64(&body[56..64]),
        })
    }

    /// Encode into the first [`META_SIZE`] bytes of `buf`, checksum included.
    pub fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.magic);
        LittleEndian::write_u32(&mut buf[4..8], self.version);
        LittleEndian::write_u32(&mut buf[8..12], self.page_size);
        LittleEndian::write_u32(&mut buf[12..16], self.flags);
        LittleEndian::write_u64(&mut buf[16..24], self.root);
        LittleEndian::write_u64(&mut buf[24..32], self.sequence);
        LittleEndian::write_u64(&mut buf[32..40], self.freelist);
        LittleEndian::write_u64(&mut buf[40..48], self.pgid);
        LittleEndian::write_u64(&mut buf[48..56], self.txid);
        let checksum = fnv1a64(&buf[..CHECKSUM_OFFSET]);
        LittleEndian::write_u64(&mut buf[56..64], checksum);
    }

    /// Checksum computed over the decoded fields.
    pub fn sum64(&self) -> u64 {
        let mut buf = [0u8; META_SIZE];
        self.encode(&mut buf);
        LittleEndian::read_u64(&buf[CHECKSUM_OFFSET..])
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.magic != MAGIC {
            return Err(StoreError::invalid_meta(format!("bad magic {:#010x}", self.magic)));
        }
        if self.version != VERSION {
            return Err(StoreError::invalid_meta(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.checksum != self.sum64() {
            return Err(StoreError::invalid_meta("checksum mismatch"));
        }
        Ok(())
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(FNV_PRIME)
    })
}

/// Pick the meta record to read from.
///
/// The copy with the higher txid is preferred; the other one is used only when
/// the preferred copy fails validation.
pub(crate) fn select(first: StoreResult<Meta>, second: StoreResult<Meta>) -> StoreResult<Meta> {
    let first = first.and_then(|m| m.validate().map(|_| m));
    let second = second.and_then(|m| m.validate().map(|_| m));

    match (first, second) {
        (Ok(a), Ok(b)) => Ok(if b.txid > a.txid { b } else { a }),
        (Ok(a), Err(_)) => Ok(a),
        (Err(_), Ok(b)) => Ok(b),
        (Err(a), Err(b)) => Err(StoreError::invalid_meta(format!(
            "both meta pages failed validation ({}; {})",
            a, b
        ))),
    }
}
