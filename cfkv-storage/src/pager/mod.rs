//! Blob storage beneath the array store.
//!
//! A pager maps [`PhysicalKey`]s to immutable byte blobs. The key
//! [`CATALOG_ROOT_PKEY`] belongs to the array store's catalog and is never
//! returned by [`Pager::alloc_many`]. Every change goes through one
//! [`BlobBatch`], so a new stacked block, the catalog naming it and the
//! release of the blobs it replaces are applied together.

use crate::constants::CATALOG_ROOT_PKEY;
use crate::types::PhysicalKey;
use cfkv_result::Result;

mod mem_pager;
pub use mem_pager::{MemPager, MemPagerStats};

/// Writes and frees applied by [`Pager::commit`] as one unit.
#[derive(Clone, Debug, Default)]
pub struct BlobBatch {
    writes: Vec<(PhysicalKey, Vec<u8>)>,
    frees: Vec<PhysicalKey>,
}

impl BlobBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` at `key`, replacing any previous blob.
    pub fn put(&mut self, key: PhysicalKey, bytes: Vec<u8>) -> &mut Self {
        self.writes.push((key, bytes));
        self
    }

    /// Stores the array store's catalog.
    pub fn put_catalog(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.put(CATALOG_ROOT_PKEY, bytes)
    }

    /// Releases `keys` after this batch's writes are applied.
    pub fn free(&mut self, keys: impl IntoIterator<Item = PhysicalKey>) -> &mut Self {
        self.frees.extend(keys);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.frees.is_empty()
    }

    pub fn writes(&self) -> &[(PhysicalKey, Vec<u8>)] {
        &self.writes
    }

    pub fn frees(&self) -> &[PhysicalKey] {
        &self.frees
    }

    pub fn into_parts(self) -> (Vec<(PhysicalKey, Vec<u8>)>, Vec<PhysicalKey>) {
        (self.writes, self.frees)
    }
}

/// Key/blob store backing the array store.
///
/// Pagers serialize their own state. Ordering between writers of the same
/// field path is the array store's concern.
pub trait Pager: Send + Sync + 'static {
    /// Blob handle returned by reads; cheap to clone.
    type Blob: AsRef<[u8]> + Clone + Send + Sync + 'static;

    /// Reserves `n` fresh keys. Keys are never reused.
    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>>;

    /// One entry per key, in request order; `None` where nothing is stored.
    fn read_many(&self, keys: &[PhysicalKey]) -> Result<Vec<Option<Self::Blob>>>;

    /// Applies the batch's writes, then its frees, or nothing at all.
    /// Writing a key that was never allocated, other than the catalog
    /// root, fails. Freeing an unknown key is a no-op.
    fn commit(&self, batch: BlobBatch) -> Result<()>;

    fn read(&self, key: PhysicalKey) -> Result<Option<Self::Blob>> {
        Ok(self.read_many(&[key])?.pop().flatten())
    }

    fn read_catalog(&self) -> Result<Option<Self::Blob>> {
        self.read(CATALOG_ROOT_PKEY)
    }
}
