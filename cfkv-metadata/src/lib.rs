//! Metadata documents and the relationship graph between them.
//!
//! - [`store`]: the [`DocumentStore`](store::DocumentStore) trait (batched,
//!   atomic writes of JSON documents per collection) and the in-memory
//!   [`MemDocumentStore`](store::MemDocumentStore).
//! - [`documents`]: typed documents for every entity kind.
//! - [`MetadataStore`]: typed reads and write batches over any document
//!   store.

pub mod documents;
mod metadata;
pub mod store;

pub use documents::{
    AttributeKeys, ConfigurationDoc, ConfigurationSetDoc, DatasetDoc, Document, PropertyDefinitionDoc,
    PropertyDoc, PropertySettingsDoc, SettingsFile, link_configuration_set, link_dataset_configuration_set,
    link_dataset_property, link_property, link_property_settings,
};
pub use metadata::{MetadataStore, WriteBatch};
pub use store::{Collection, DocGet, DocWrite, DocumentStore, MemDocumentStore};
