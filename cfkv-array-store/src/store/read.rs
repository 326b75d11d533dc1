//! Read paths: stacked blocks, per-record maps and lazy sequences.

use super::catalog::{ArrayCatalog, FieldGroup, Locator};
use super::core::{ArrayStore, fetch_arrays};
use crate::stack::{RowLayout, concat_flat};
use arrow::array::{Array, ArrayRef};
use bytes::Bytes;
use cfkv_result::{Error, Result};
use cfkv_storage::PhysicalKey;
use cfkv_storage::pager::Pager;
use cfkv_types::{DType, NdArray, RecordKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Where one selected record's elements live.
#[derive(Clone, Debug)]
enum Source {
    Leaf { pkey: PhysicalKey },
    Block { pkey: PhysicalKey, start: usize, len: usize },
}

#[derive(Clone, Debug)]
struct PlannedRead {
    id: RecordKey,
    dtype: DType,
    shape: Vec<usize>,
    source: Source,
}

fn plan_reads(path: &str, group: &FieldGroup, ids: Option<&[RecordKey]>) -> Result<Vec<PlannedRead>> {
    let selected;
    let ids = match ids {
        Some(ids) => ids,
        None => {
            selected = group.ids();
            &selected
        }
    };
    ids.iter()
        .map(|&id| {
            let Some(&loc) = group.index.get(&id) else {
                tracing::debug!(path, id, "record not found");
                return Err(Error::NotFound);
            };
            Ok(match loc {
                Locator::Leaf(i) => {
                    let l = &group.pending()[i];
                    PlannedRead {
                        id,
                        dtype: l.dtype,
                        shape: l.shape.clone(),
                        source: Source::Leaf { pkey: l.pkey },
                    }
                }
                Locator::Block(i) => {
                    let b = group
                        .block()
                        .ok_or_else(|| Error::Internal(format!("'{path}' has no block")))?;
                    let row = &b.rows[i];
                    let (start, len) = b.element_range(row);
                    PlannedRead {
                        id,
                        dtype: b.layout.dtype,
                        shape: row.shape.clone(),
                        source: Source::Block {
                            pkey: b.pkey,
                            start,
                            len,
                        },
                    }
                }
            })
        })
        .collect()
}

/// Decodes `reads`, keeping decoded block blobs in `blocks` for reuse.
fn materialize<P>(
    pager: &P,
    reads: &[PlannedRead],
    blocks: &mut FxHashMap<PhysicalKey, ArrayRef>,
) -> Result<Vec<(RecordKey, NdArray)>>
where
    P: Pager<Blob = Bytes>,
{
    let mut wanted: Vec<PhysicalKey> = Vec::new();
    for r in reads {
        match r.source {
            Source::Leaf { pkey } => wanted.push(pkey),
            Source::Block { pkey, .. } if !blocks.contains_key(&pkey) => wanted.push(pkey),
            Source::Block { .. } => {}
        }
    }
    let mut leaves = fetch_arrays(pager, &wanted)?;
    for r in reads {
        if let Source::Block { pkey, .. } = r.source {
            if let Some(arr) = leaves.remove(&pkey) {
                blocks.insert(pkey, arr);
            }
        }
    }

    reads
        .iter()
        .map(|r| {
            let values = match r.source {
                Source::Leaf { pkey } => leaves.get(&pkey).cloned(),
                Source::Block { pkey, start, len } => {
                    blocks.get(&pkey).map(|b| b.slice(start, len))
                }
            }
            .ok_or_else(|| Error::Internal(format!("record {} has no loaded blob", r.id)))?;
            if values.data_type() != &r.dtype.arrow_type() {
                return Err(Error::Internal(format!(
                    "record {} decoded as {}, catalog says {}",
                    r.id,
                    values.data_type(),
                    r.dtype.name()
                )));
            }
            Ok((r.id, NdArray::try_new(r.shape.clone(), values)?))
        })
        .collect()
}

/// Result of [`ArrayStore::get_data`].
pub enum FieldData<P: Pager<Blob = Bytes>> {
    /// All selected records stacked along axis 0, in selection order.
    Stacked(NdArray),
    /// Each selected record with its original shape, in selection order.
    PerRecord(Vec<(RecordKey, NdArray)>),
    /// Per-record view of a large selection, decoded on demand.
    Lazy(LazyRecords<P>),
}

impl<P: Pager<Blob = Bytes>> std::fmt::Debug for FieldData<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldData::Stacked(v) => f.debug_tuple("Stacked").field(&v.shape()).finish(),
            FieldData::PerRecord(v) => f.debug_tuple("PerRecord").field(&v.len()).finish(),
            FieldData::Lazy(l) => f.debug_tuple("Lazy").field(&l.len()).finish(),
        }
    }
}

impl<P: Pager<Blob = Bytes>> FieldData<P> {
    pub fn into_stacked(self) -> Option<NdArray> {
        match self {
            FieldData::Stacked(v) => Some(v),
            _ => None,
        }
    }

    /// Per-record values, draining a lazy sequence if needed.
    pub fn into_records(self) -> Result<Vec<(RecordKey, NdArray)>> {
        match self {
            FieldData::PerRecord(v) => Ok(v),
            FieldData::Lazy(l) => l.iter().collect(),
            FieldData::Stacked(_) => Err(Error::InvalidArgumentError(
                "stacked data has no per-record view".into(),
            )),
        }
    }
}

/// A finite, restartable sequence of records.
///
/// Every call to [`LazyRecords::iter`] starts from the first record. Only
/// the selected IDs are kept; each batch is located against the catalog
/// when it is read, so the sequence stays readable across concatenation of
/// its group.
pub struct LazyRecords<P: Pager<Blob = Bytes>> {
    pager: Arc<P>,
    catalog: Arc<RwLock<ArrayCatalog>>,
    path: Arc<str>,
    ids: Arc<[RecordKey]>,
    batch: usize,
}

impl<P: Pager<Blob = Bytes>> Clone for LazyRecords<P> {
    fn clone(&self) -> Self {
        Self {
            pager: Arc::clone(&self.pager),
            catalog: Arc::clone(&self.catalog),
            path: Arc::clone(&self.path),
            ids: Arc::clone(&self.ids),
            batch: self.batch,
        }
    }
}

impl<P: Pager<Blob = Bytes>> LazyRecords<P> {
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordKey> + '_ {
        self.ids.iter().copied()
    }

    pub fn iter(&self) -> LazyRecordIter<P> {
        LazyRecordIter {
            records: self.clone(),
            pos: 0,
            buffered: VecDeque::new(),
            blocks: FxHashMap::default(),
            failed: false,
        }
    }

    /// Locates and decodes `ids[range]` under one catalog read lock, so a
    /// concurrent concatenation cannot free blobs between planning and
    /// reading.
    fn read_batch(
        &self,
        range: std::ops::Range<usize>,
        blocks: &mut FxHashMap<PhysicalKey, ArrayRef>,
    ) -> Result<Vec<(RecordKey, NdArray)>> {
        let catalog = self.catalog.read().unwrap();
        let group = catalog.group(&self.path)?;
        let reads = plan_reads(&self.path, group, Some(&self.ids[range]))?;
        let live: FxHashSet<PhysicalKey> = reads
            .iter()
            .filter_map(|r| match r.source {
                Source::Block { pkey, .. } => Some(pkey),
                Source::Leaf { .. } => None,
            })
            .collect();
        blocks.retain(|k, _| live.contains(k));
        materialize(self.pager.as_ref(), &reads, blocks)
    }
}

impl<'a, P: Pager<Blob = Bytes>> IntoIterator for &'a LazyRecords<P> {
    type Item = Result<(RecordKey, NdArray)>;
    type IntoIter = LazyRecordIter<P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct LazyRecordIter<P: Pager<Blob = Bytes>> {
    records: LazyRecords<P>,
    pos: usize,
    buffered: VecDeque<(RecordKey, NdArray)>,
    blocks: FxHashMap<PhysicalKey, ArrayRef>,
    failed: bool,
}

impl<P: Pager<Blob = Bytes>> Iterator for LazyRecordIter<P> {
    type Item = Result<(RecordKey, NdArray)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(rec) = self.buffered.pop_front() {
            return Some(Ok(rec));
        }
        let total = self.records.len();
        if self.failed || self.pos >= total {
            return None;
        }
        let end = (self.pos + self.records.batch).min(total);
        match self.records.read_batch(self.pos..end, &mut self.blocks) {
            Ok(recs) => {
                self.pos = end;
                self.buffered.extend(recs);
                self.buffered.pop_front().map(Ok)
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.buffered.len() + self.records.len().saturating_sub(self.pos);
        if self.failed { (0, Some(self.buffered.len())) } else { (n, Some(n)) }
    }
}

impl<P> ArrayStore<P>
where
    P: Pager<Blob = Bytes>,
{
    /// Reads records of `path`.
    ///
    /// `ids` selects and orders records; `None` means every record in
    /// insertion order. With `concatenate` the selection is returned as one
    /// stacked value: a fully collapsed group is served straight from its
    /// block, anything else is stacked in memory without touching stored
    /// state, and a ragged selection fails with [`Error::Concatenation`].
    /// Without `concatenate` each record keeps its own shape; selections
    /// larger than the configured threshold come back lazily.
    pub fn get_data(
        &self,
        path: &str,
        ids: Option<&[RecordKey]>,
        concatenate: bool,
    ) -> Result<FieldData<P>> {
        let catalog = self.catalog.read().unwrap();
        let group = catalog.group(path)?;

        if concatenate {
            if let (None, Some(block), true) = (ids, group.block(), group.pending().is_empty()) {
                let arrays = self.fetch_arrays(&[block.pkey])?;
                let flat = arrays
                    .get(&block.pkey)
                    .cloned()
                    .ok_or_else(|| Error::Internal(format!("block of '{path}' is missing")))?;
                return Ok(FieldData::Stacked(NdArray::try_new(
                    block.layout.stacked_shape(block.total_rows),
                    flat,
                )?));
            }

            let reads = plan_reads(path, group, ids)?;
            let layout = match (reads.first(), group.block(), group.pending().first()) {
                (Some(r), _, _) => RowLayout::of(r.dtype, &r.shape),
                (None, Some(b), _) => b.layout.clone(),
                (None, None, Some(l)) => RowLayout::of(l.dtype, &l.shape),
                (None, None, None) => return Err(Error::NotFound),
            };
            let mut rows = 0usize;
            for r in &reads {
                if let Err(err) = layout.check_member(path, r.id, r.dtype, &r.shape) {
                    tracing::warn!(path, error = %err, "cannot stack selection");
                    return Err(err);
                }
                rows += RowLayout::rows_of(&r.shape);
            }
            let values = materialize(self.pager.as_ref(), &reads, &mut FxHashMap::default())?;
            let parts: Vec<ArrayRef> = values.into_iter().map(|(_, v)| v.values().clone()).collect();
            let flat = concat_flat(layout.dtype, &parts)?;
            return Ok(FieldData::Stacked(NdArray::try_new(
                layout.stacked_shape(rows),
                flat,
            )?));
        }

        let reads = plan_reads(path, group, ids)?;
        if reads.len() > self.cfg.lazy_read_threshold {
            tracing::trace!(path, records = reads.len(), "lazy per-record read");
            return Ok(FieldData::Lazy(LazyRecords {
                pager: Arc::clone(&self.pager),
                catalog: Arc::clone(&self.catalog),
                path: Arc::from(path),
                ids: reads.iter().map(|r| r.id).collect(),
                batch: self.cfg.lazy_batch_size.max(1),
            }));
        }
        Ok(FieldData::PerRecord(materialize(
            self.pager.as_ref(),
            &reads,
            &mut FxHashMap::default(),
        )?))
    }

    /// Reads a single record with its original shape.
    pub fn get_record(&self, path: &str, id: RecordKey) -> Result<NdArray> {
        let catalog = self.catalog.read().unwrap();
        let group = catalog.group(path)?;
        let reads = plan_reads(path, group, Some(std::slice::from_ref(&id)))?;
        materialize(self.pager.as_ref(), &reads, &mut FxHashMap::default())?
            .pop()
            .map(|(_, v)| v)
            .ok_or(Error::NotFound)
    }
}
