use super::catalog::{ArrayCatalog, BlockEntry, BlockRow, FieldGroup, GroupLayout, LeafEntry};
use super::config::ArrayStoreConfig;
use crate::stack::{RowLayout, concat_flat};
use arrow::array::ArrayRef;
use bytes::Bytes;
use cfkv_result::{Error, Result};
use cfkv_storage::pager::{BlobBatch, Pager};
use cfkv_storage::serialization::{deserialize_array, serialize_array};
use cfkv_storage::PhysicalKey;
use cfkv_types::{NdArray, RecordKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, RwLock};

/// Observable state of one field group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupState {
    /// Every record is its own leaf.
    Uncollapsed { records: usize },
    /// `stacked` records live in one block; `pending` were appended since.
    Collapsed { stacked: usize, pending: usize },
}

pub struct ArrayStore<P: Pager> {
    pub(crate) pager: Arc<P>,
    pub(crate) catalog: Arc<RwLock<ArrayCatalog>>,
    pub(crate) cfg: ArrayStoreConfig,
}

impl<P> ArrayStore<P>
where
    P: Pager<Blob = Bytes>,
{
    pub fn open(pager: Arc<P>) -> Result<Self> {
        Self::open_with_config(pager, ArrayStoreConfig::default())
    }

    /// Opens the store, loading the catalog from the pager's root key when
    /// one was persisted.
    pub fn open_with_config(pager: Arc<P>, cfg: ArrayStoreConfig) -> Result<Self> {
        let catalog = match pager.read_catalog()? {
            Some(bytes) => ArrayCatalog::from_bytes(bytes.as_ref())?,
            None => ArrayCatalog::default(),
        };
        tracing::debug!(groups = catalog.groups.len(), "array store opened");

        Ok(Self {
            pager,
            catalog: Arc::new(RwLock::new(catalog)),
            cfg,
        })
    }

    #[inline]
    pub fn config(&self) -> &ArrayStoreConfig {
        &self.cfg
    }

    #[inline]
    pub fn pager(&self) -> &Arc<P> {
        &self.pager
    }

    /// Appends one record to `path`, creating the group on first use.
    pub fn append(&self, path: &str, id: RecordKey, value: &NdArray) -> Result<()> {
        self.append_many(path, [(id, value)])
    }

    /// Appends records to `path` in iteration order.
    ///
    /// Each value becomes its own leaf blob; existing leaves and any stacked
    /// block are left untouched. The leaf blobs and the updated catalog are
    /// written in one pager batch. Appending an ID the group already holds
    /// is an error.
    pub fn append_many<'a, I>(&self, path: &str, records: I) -> Result<()>
    where
        I: IntoIterator<Item = (RecordKey, &'a NdArray)>,
    {
        let records: Vec<(RecordKey, &NdArray)> = records.into_iter().collect();
        if records.is_empty() {
            return Ok(());
        }

        let mut catalog = self.catalog.write().unwrap();

        let mut seen = FxHashSet::default();
        for (id, _) in &records {
            let exists = catalog
                .groups
                .get(path)
                .is_some_and(|g| g.index.contains_key(id));
            if exists || !seen.insert(*id) {
                return Err(Error::InvalidArgumentError(format!(
                    "record {id} already present under '{path}'"
                )));
            }
        }

        let keys = self.pager.alloc_many(records.len())?;
        let mut batch = BlobBatch::new();
        let mut leaves = Vec::with_capacity(records.len());
        for ((id, value), pkey) in records.iter().zip(keys) {
            batch.put(pkey, serialize_array(value.values().as_ref())?);
            leaves.push(LeafEntry {
                id: *id,
                pkey,
                dtype: value.dtype(),
                shape: value.shape().to_vec(),
            });
        }

        let created = !catalog.groups.contains_key(path);
        let group = catalog
            .groups
            .entry(path.to_string())
            .or_insert_with(FieldGroup::new);
        let before = group.pending().len();
        group.pending_mut().extend(leaves);
        group.reindex();

        let persisted = catalog.to_bytes().and_then(|bytes| {
            batch.put_catalog(bytes);
            self.pager.commit(batch)
        });
        if let Err(err) = persisted {
            if created {
                catalog.groups.remove(path);
            } else if let Some(group) = catalog.groups.get_mut(path) {
                group.pending_mut().truncate(before);
                group.reindex();
            }
            return Err(err);
        }

        tracing::trace!(path, appended = records.len(), "array store append");
        Ok(())
    }

    /// Stacks every pending record of `path` into the group's block.
    ///
    /// On the first call the leaves become a new block. Later calls extend
    /// the existing block with records appended since; offsets of already
    /// stacked records never change. With nothing pending the call is a
    /// no-op. Returns the number of records newly stacked. The block, the
    /// catalog and the release of the replaced blobs commit as one batch.
    ///
    /// A member whose element type, scalar-ness or trailing extents differ
    /// from the group fails with [`Error::Concatenation`] and leaves the
    /// group as it was.
    pub fn concatenate_group(&self, path: &str) -> Result<usize> {
        let mut catalog = self.catalog.write().unwrap();
        let group = catalog.group(path)?;

        let pending = group.pending();
        let Some(first) = pending.first() else {
            tracing::debug!(path, "concatenate: nothing pending");
            return Ok(0);
        };
        let block = group.block();
        let layout = block.map_or_else(
            || RowLayout::of(first.dtype, &first.shape),
            |b| b.layout.clone(),
        );
        for leaf in pending {
            if let Err(err) = layout.check_member(path, leaf.id, leaf.dtype, &leaf.shape) {
                tracing::warn!(path, error = %err, "concatenation refused");
                return Err(err);
            }
        }

        let mut old_keys: Vec<PhysicalKey> = Vec::with_capacity(pending.len() + 1);
        old_keys.extend(block.map(|b| b.pkey));
        old_keys.extend(pending.iter().map(|l| l.pkey));
        let arrays = self.fetch_arrays(&old_keys)?;
        let parts: Vec<ArrayRef> = old_keys
            .iter()
            .map(|k| {
                arrays
                    .get(k)
                    .cloned()
                    .ok_or_else(|| Error::Internal(format!("missing blob {k} under '{path}'")))
            })
            .collect::<Result<_>>()?;
        let flat = concat_flat(layout.dtype, &parts)?;

        let (mut rows, mut total_rows) = block.map_or_else(
            || (Vec::with_capacity(pending.len()), 0),
            |b| (b.rows.clone(), b.total_rows),
        );
        for leaf in pending {
            let n = RowLayout::rows_of(&leaf.shape);
            rows.push(BlockRow {
                id: leaf.id,
                offset: total_rows,
                rows: n,
                shape: leaf.shape.clone(),
            });
            total_rows += n;
        }
        if flat.len() != total_rows * layout.row_width() {
            return Err(Error::Internal(format!(
                "stacked block for '{path}' has {} elements, index expects {}",
                flat.len(),
                total_rows * layout.row_width()
            )));
        }

        let appended = pending.len();
        let stacked = rows.len();
        let block_key = self
            .pager
            .alloc_many(1)?
            .pop()
            .ok_or_else(|| Error::Internal("pager allocated no key".into()))?;
        let block_bytes = serialize_array(flat.as_ref())?;

        let group = catalog.groups.get_mut(path).ok_or(Error::NotFound)?;
        let previous = std::mem::replace(
            &mut group.layout,
            GroupLayout::Collapsed {
                block: BlockEntry {
                    pkey: block_key,
                    layout,
                    total_rows,
                    rows,
                },
                tail: Vec::new(),
            },
        );
        group.reindex();

        let persisted = catalog.to_bytes().and_then(|catalog_bytes| {
            let mut batch = BlobBatch::new();
            batch
                .put(block_key, block_bytes)
                .put_catalog(catalog_bytes)
                .free(old_keys);
            self.pager.commit(batch)
        });
        if let Err(err) = persisted {
            if let Some(group) = catalog.groups.get_mut(path) {
                group.layout = previous;
                group.reindex();
            }
            return Err(err);
        }

        tracing::debug!(path, appended, stacked, total_rows, "group concatenated");
        Ok(appended)
    }

    /// Field paths holding at least one record, sorted.
    pub fn field_paths(&self) -> Vec<String> {
        let catalog = self.catalog.read().unwrap();
        catalog.groups.keys().cloned().collect()
    }

    pub fn group_state(&self, path: &str) -> Option<GroupState> {
        let catalog = self.catalog.read().unwrap();
        let group = catalog.groups.get(path)?;
        Some(match &group.layout {
            GroupLayout::Uncollapsed { leaves } => GroupState::Uncollapsed {
                records: leaves.len(),
            },
            GroupLayout::Collapsed { block, tail } => GroupState::Collapsed {
                stacked: block.rows.len(),
                pending: tail.len(),
            },
        })
    }

    /// Record IDs of `path` in insertion order.
    pub fn record_ids(&self, path: &str) -> Result<Vec<RecordKey>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog.group(path)?.ids())
    }

    pub fn contains(&self, path: &str, id: RecordKey) -> bool {
        let catalog = self.catalog.read().unwrap();
        catalog
            .groups
            .get(path)
            .is_some_and(|g| g.index.contains_key(&id))
    }

    /// Loads and decodes each distinct key once.
    pub(crate) fn fetch_arrays(
        &self,
        keys: &[PhysicalKey],
    ) -> Result<FxHashMap<PhysicalKey, ArrayRef>> {
        fetch_arrays(self.pager.as_ref(), keys)
    }
}

pub(crate) fn fetch_arrays<P>(pager: &P, keys: &[PhysicalKey]) -> Result<FxHashMap<PhysicalKey, ArrayRef>>
where
    P: Pager<Blob = Bytes>,
{
    let mut distinct: Vec<PhysicalKey> = keys.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let blobs = pager.read_many(&distinct)?;
    let mut out = FxHashMap::with_capacity_and_hasher(distinct.len(), Default::default());
    for (key, blob) in distinct.into_iter().zip(blobs) {
        let bytes = blob.ok_or_else(|| Error::Internal(format!("array blob {key} is missing")))?;
        out.insert(key, deserialize_array(bytes)?);
    }
    Ok(out)
}
