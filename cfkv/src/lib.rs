//! cfkv: a hybrid storage engine for atomic configurations and properties.
//!
//! Bulk numeric payloads go to a columnar [`ArrayStore`] over a pager;
//! descriptive metadata, aggregates and the relationship graph go to a
//! [`DocumentStore`]. The [`Database`] keeps the two consistent.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cfkv::{AtomicStructure, Database, InsertOptions, MemDocumentStore, MemPager};
//!
//! let db = Database::open(Arc::new(MemPager::new()), Arc::new(MemDocumentStore::new())).unwrap();
//! let h2 = AtomicStructure::from_symbols(&["H", "H"], vec![[0.0; 3], [0.0, 0.0, 0.74]])
//!     .unwrap()
//!     .with_label("diatomic");
//! let ids = db.insert_data(&[h2], &InsertOptions::default()).unwrap();
//! assert_eq!(ids.len(), 1);
//! assert!(ids[0].1.is_none());
//! ```
//!
//! # Architecture
//!
//! - **Identity** (`cfkv-hash`): content-addressed IDs per entity kind.
//! - **Schemas** (`cfkv-schema`): property definitions, field maps, units.
//! - **Arrays** (`cfkv-array-store`, `cfkv-storage`): per-field groups of
//!   records with explicit concatenation into stacked blocks.
//! - **Metadata** (`cfkv-metadata`): typed documents and relationships.
//! - **Aggregation** (`cfkv-aggregate`): set and dataset statistics.

mod config;
mod database;
pub mod paths;

pub use config::DatabaseConfig;
pub use database::{
    ConfigurationIter, Database, InsertOptions, InsertStream, InsertedPair, NewDataset,
    PropertySettings,
};

pub use cfkv_aggregate::{ConfigurationSetAggregate, ConfigurationSummary, DatasetAggregate};
pub use cfkv_array_store::{ArrayStore, ArrayStoreConfig, FieldData, GroupState, LazyRecords};
pub use cfkv_hash::{ContentHasher, ContentIdentity, Sha512Hasher, SmallWidthHasher};
pub use cfkv_metadata::{
    ConfigurationDoc, ConfigurationSetDoc, DatasetDoc, DocumentStore, MemDocumentStore,
    MetadataStore, PropertyDoc, PropertySettingsDoc,
};
pub use cfkv_result::{Error, Result};
pub use cfkv_schema::{
    Extent, FieldMap, FieldSource, FieldSpec, FieldType, PropertyDefinition, PropertyMap,
};
pub use cfkv_types::{
    AtomicStructure, ConfigurationId, ConfigurationSetId, DType, DatasetId, NdArray, PropertyId,
    PropertySettingsId, RecordKey,
};

pub mod storage {
    //! Pager abstractions and implementations.

    pub use cfkv_storage::pager::{BlobBatch, MemPager, MemPagerStats, Pager};
}

pub use storage::MemPager;
