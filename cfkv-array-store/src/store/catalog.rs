//! The persisted directory of field groups.
//!
//! The whole catalog is one JSON blob at the pager's root key. Lookup maps
//! from record ID to location are not persisted; [`FieldGroup::reindex`]
//! rebuilds them after load.

use crate::stack::RowLayout;
use cfkv_result::{Error, Result};
use cfkv_storage::PhysicalKey;
use cfkv_types::{DType, RecordKey};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One un-stacked record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct LeafEntry {
    pub id: RecordKey,
    pub pkey: PhysicalKey,
    pub dtype: DType,
    pub shape: Vec<usize>,
}

/// Position of one record inside a stacked block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct BlockRow {
    pub id: RecordKey,
    /// First row of the record along the stacked axis.
    pub offset: usize,
    pub rows: usize,
    /// Shape as appended; restored on per-record reads.
    pub shape: Vec<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct BlockEntry {
    pub pkey: PhysicalKey,
    pub layout: RowLayout,
    pub total_rows: usize,
    pub rows: Vec<BlockRow>,
}

impl BlockEntry {
    /// Element range of `row` within the flat block.
    #[inline]
    pub fn element_range(&self, row: &BlockRow) -> (usize, usize) {
        let w = self.layout.row_width();
        (row.offset * w, row.rows * w)
    }
}

/// Physical layout of a field group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum GroupLayout {
    Uncollapsed {
        leaves: Vec<LeafEntry>,
    },
    Collapsed {
        block: BlockEntry,
        /// Records appended since the last concatenation.
        tail: Vec<LeafEntry>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Locator {
    Block(usize),
    Leaf(usize),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct FieldGroup {
    pub layout: GroupLayout,
    #[serde(skip)]
    pub index: FxHashMap<RecordKey, Locator>,
}

impl FieldGroup {
    pub fn new() -> Self {
        Self {
            layout: GroupLayout::Uncollapsed { leaves: Vec::new() },
            index: FxHashMap::default(),
        }
    }

    pub fn reindex(&mut self) {
        self.index.clear();
        match &self.layout {
            GroupLayout::Uncollapsed { leaves } => {
                for (i, l) in leaves.iter().enumerate() {
                    self.index.insert(l.id, Locator::Leaf(i));
                }
            }
            GroupLayout::Collapsed { block, tail } => {
                for (i, r) in block.rows.iter().enumerate() {
                    self.index.insert(r.id, Locator::Block(i));
                }
                for (i, l) in tail.iter().enumerate() {
                    self.index.insert(l.id, Locator::Leaf(i));
                }
            }
        }
    }

    /// Records not yet stacked.
    pub fn pending(&self) -> &[LeafEntry] {
        match &self.layout {
            GroupLayout::Uncollapsed { leaves } => leaves,
            GroupLayout::Collapsed { tail, .. } => tail,
        }
    }

    pub fn pending_mut(&mut self) -> &mut Vec<LeafEntry> {
        match &mut self.layout {
            GroupLayout::Uncollapsed { leaves } => leaves,
            GroupLayout::Collapsed { tail, .. } => tail,
        }
    }

    pub fn block(&self) -> Option<&BlockEntry> {
        match &self.layout {
            GroupLayout::Uncollapsed { .. } => None,
            GroupLayout::Collapsed { block, .. } => Some(block),
        }
    }

    pub fn len(&self) -> usize {
        self.block().map_or(0, |b| b.rows.len()) + self.pending().len()
    }

    /// Record IDs in insertion order.
    pub fn ids(&self) -> Vec<RecordKey> {
        let mut out = Vec::with_capacity(self.len());
        if let Some(b) = self.block() {
            out.extend(b.rows.iter().map(|r| r.id));
        }
        out.extend(self.pending().iter().map(|l| l.id));
        out
    }

    /// Dtype and shape of a record without loading it.
    pub fn describe(&self, id: RecordKey) -> Option<(DType, &[usize])> {
        match *self.index.get(&id)? {
            Locator::Leaf(i) => {
                let l = &self.pending()[i];
                Some((l.dtype, &l.shape))
            }
            Locator::Block(i) => {
                let b = self.block()?;
                Some((b.layout.dtype, &b.rows[i].shape))
            }
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct ArrayCatalog {
    pub groups: BTreeMap<String, FieldGroup>,
}

impl ArrayCatalog {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut catalog: ArrayCatalog = serde_json::from_slice(bytes)?;
        for group in catalog.groups.values_mut() {
            group.reindex();
        }
        Ok(catalog)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn group(&self, path: &str) -> Result<&FieldGroup> {
        self.groups.get(path).ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: RecordKey, pkey: PhysicalKey) -> LeafEntry {
        LeafEntry {
            id,
            pkey,
            dtype: DType::Float64,
            shape: vec![],
        }
    }

    #[test]
    fn catalog_roundtrip_rebuilds_index() {
        let mut cat = ArrayCatalog::default();
        let mut g = FieldGroup::new();
        g.layout = GroupLayout::Collapsed {
            block: BlockEntry {
                pkey: 9,
                layout: RowLayout::of(DType::Float64, &[]),
                total_rows: 2,
                rows: vec![
                    BlockRow {
                        id: -5,
                        offset: 0,
                        rows: 1,
                        shape: vec![],
                    },
                    BlockRow {
                        id: 7,
                        offset: 1,
                        rows: 1,
                        shape: vec![],
                    },
                ],
            },
            tail: vec![leaf(11, 12)],
        };
        cat.groups.insert("properties/e/energy".into(), g);

        let back = ArrayCatalog::from_bytes(&cat.to_bytes().unwrap()).unwrap();
        let g = back.group("properties/e/energy").unwrap();
        assert_eq!(g.ids(), vec![-5, 7, 11]);
        assert_eq!(g.index.get(&7), Some(&Locator::Block(1)));
        assert_eq!(g.index.get(&11), Some(&Locator::Leaf(0)));
        assert!(back.group("missing").is_err());
    }
}
