//! Document store trait and in-memory implementation.
//!
//! Documents are opaque serialized bytes addressed by (collection, key).
//! Mirrors the pager contract on the array side: batched gets, batched
//! writes, no query language.

use bytes::Bytes;
use cfkv_result::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mem;
pub use mem::MemDocumentStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Configurations,
    Properties,
    PropertySettings,
    PropertyDefinitions,
    ConfigurationSets,
    Datasets,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Configurations,
        Collection::Properties,
        Collection::PropertySettings,
        Collection::PropertyDefinitions,
        Collection::ConfigurationSets,
        Collection::Datasets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Configurations => "configurations",
            Collection::Properties => "properties",
            Collection::PropertySettings => "property_settings",
            Collection::PropertyDefinitions => "property_definitions",
            Collection::ConfigurationSets => "configuration_sets",
            Collection::Datasets => "datasets",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocGet {
    pub collection: Collection,
    pub key: String,
}

#[derive(Clone, Debug)]
pub enum DocWrite {
    Upsert {
        collection: Collection,
        key: String,
        doc: Vec<u8>,
    },
    Delete {
        collection: Collection,
        key: String,
    },
}

/// Key/document store backing the metadata side.
///
/// `batch_write` must apply all writes or none, and readers must never
/// observe part of a batch. This is what makes both sides of a relationship
/// edge appear together.
pub trait DocumentStore: Send + Sync + 'static {
    /// One result per request, in order; `None` when absent.
    fn batch_get(&self, gets: &[DocGet]) -> Result<Vec<Option<Bytes>>>;

    /// Applies `writes` atomically, in order.
    fn batch_write(&self, writes: &[DocWrite]) -> Result<()>;

    /// Keys of `collection` in first-insertion order.
    fn keys(&self, collection: Collection) -> Result<Vec<String>>;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Bytes>> {
        Ok(self
            .batch_get(&[DocGet {
                collection,
                key: key.to_string(),
            }])?
            .pop()
            .flatten())
    }
}
