use super::{BlobBatch, Pager};
use crate::constants::{CATALOG_ROOT_PKEY, FIRST_DATA_PKEY};
use crate::types::PhysicalKey;
use bytes::Bytes;
use cfkv_result::{Error, Result};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

/// Blob and byte counts of a [`MemPager`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemPagerStats {
    /// Live blobs, the catalog included.
    pub blobs: usize,
    /// Total payload bytes of live blobs.
    pub bytes: usize,
    /// Keys handed out so far.
    pub allocated: u64,
}

struct MemState {
    next_key: PhysicalKey,
    blobs: FxHashMap<PhysicalKey, Bytes>,
    bytes: usize,
}

impl MemState {
    fn is_writable(&self, key: PhysicalKey) -> bool {
        key == CATALOG_ROOT_PKEY || (FIRST_DATA_PKEY..self.next_key).contains(&key)
    }

    fn remove(&mut self, key: PhysicalKey) {
        if let Some(old) = self.blobs.remove(&key) {
            self.bytes -= old.len();
        }
    }
}

/// In-memory pager for tests and ephemeral databases.
///
/// Blobs are kept as [`Bytes`], so reads hand out shared views of the
/// stored memory.
pub struct MemPager {
    state: RwLock<MemState>,
}

impl Default for MemPager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemPager {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemState {
                next_key: FIRST_DATA_PKEY,
                blobs: FxHashMap::default(),
                bytes: 0,
            }),
        }
    }

    pub fn stats(&self) -> MemPagerStats {
        let state = self.state.read().expect("MemPager state lock poisoned");
        MemPagerStats {
            blobs: state.blobs.len(),
            bytes: state.bytes,
            allocated: state.next_key - FIRST_DATA_PKEY,
        }
    }
}

impl Pager for MemPager {
    type Blob = Bytes;

    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>> {
        let mut state = self.state.write().expect("MemPager state lock poisoned");
        let start = state.next_key;
        let end = start
            .checked_add(n as u64)
            .ok_or_else(|| Error::Internal("pager key space exhausted".into()))?;
        state.next_key = end;
        Ok((start..end).collect())
    }

    fn read_many(&self, keys: &[PhysicalKey]) -> Result<Vec<Option<Bytes>>> {
        let state = self.state.read().expect("MemPager state lock poisoned");
        Ok(keys.iter().map(|k| state.blobs.get(k).cloned()).collect())
    }

    fn commit(&self, batch: BlobBatch) -> Result<()> {
        let mut state = self.state.write().expect("MemPager state lock poisoned");
        if let Some((key, _)) = batch.writes().iter().find(|(k, _)| !state.is_writable(*k)) {
            return Err(Error::InvalidArgumentError(format!(
                "blob key {key} was never allocated"
            )));
        }
        let (writes, frees) = batch.into_parts();
        for (key, bytes) in writes {
            state.remove(key);
            state.bytes += bytes.len();
            state.blobs.insert(key, Bytes::from(bytes));
        }
        for key in frees {
            state.remove(key);
        }
        Ok(())
    }
}
