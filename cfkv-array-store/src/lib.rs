//! Per-field storage of shaped values keyed by record ID.
//!
//! Each logical field path (for example `configurations/arrays/positions`)
//! owns one group. A group starts [`GroupState::Uncollapsed`], with every
//! appended value stored as its own leaf blob. [`ArrayStore::concatenate_group`]
//! stacks the leaves along their leading axis into one block plus an offset
//! index, after which the group is [`GroupState::Collapsed`]. Groups whose
//! members differ in anything but the leading extent are refused and stay
//! readable per record.

pub mod stack;
pub mod store;

pub use store::{
    ArrayStore, ArrayStoreConfig, FieldData, GroupState, LazyRecordIter, LazyRecords,
};
