//! Blob storage primitives for the cfkv array store.
//!
//! - [`pager`]: the [`Pager`](pager::Pager) trait (allocate, read, commit
//!   a [`BlobBatch`](pager::BlobBatch)) and the in-memory
//!   [`MemPager`](pager::MemPager).
//! - [`serialization`]: a compact header-plus-buffers codec for the flat
//!   Arrow arrays that back every stored value.

pub mod codecs;
pub mod constants;
pub mod pager;
pub mod serialization;
pub mod types;

pub use pager::{BlobBatch, MemPager, MemPagerStats, Pager};
pub use types::PhysicalKey;
