//! The engine tying identity, schemas, arrays and metadata together.

use crate::config::DatabaseConfig;
use bytes::Bytes;
use cfkv_array_store::ArrayStore;
use cfkv_metadata::{
    ConfigurationDoc, DocumentStore, MetadataStore, PropertyDefinitionDoc, PropertySettingsDoc,
    SettingsFile, WriteBatch,
};
use cfkv_result::{Error, Result};
use cfkv_schema::{PropertyDefinition, SchemaRegistry};
use cfkv_storage::pager::Pager;
use cfkv_types::{ConfigurationId, PropertySettingsId};
use std::collections::BTreeSet;
use std::sync::Arc;

mod groups;
mod insert;
mod query;

pub use groups::NewDataset;
pub use insert::{InsertOptions, InsertStream, InsertedPair};
pub use query::ConfigurationIter;

/// Input of [`Database::insert_property_settings`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertySettings {
    pub method: String,
    pub description: String,
    /// `(file name, file contents)` pairs.
    pub files: Vec<(String, String)>,
    pub labels: BTreeSet<String>,
}

impl PropertySettings {
    pub fn new(method: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.push((name.into(), contents.into()));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }
}

/// Configurations, properties and their groupings over one pager and one
/// document store.
///
/// Writes to a given field path must be serialized by the caller; reads may
/// run concurrently with each other.
pub struct Database<P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    arrays: ArrayStore<P>,
    metadata: MetadataStore<S>,
    registry: SchemaRegistry,
    cfg: DatabaseConfig,
}

impl<P, S> Database<P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    pub fn open(pager: Arc<P>, documents: Arc<S>) -> Result<Self> {
        Self::open_with_config(pager, documents, DatabaseConfig::default())
    }

    /// Opens both stores and re-registers every persisted property
    /// definition.
    pub fn open_with_config(pager: Arc<P>, documents: Arc<S>, cfg: DatabaseConfig) -> Result<Self> {
        let arrays = ArrayStore::open_with_config(pager, cfg.array_store.clone())?;
        let metadata = MetadataStore::new(documents);
        let registry = SchemaRegistry::new();
        for doc in metadata.all::<PropertyDefinitionDoc>()? {
            registry.register(PropertyDefinition::from_json(&doc.definition)?)?;
        }
        tracing::debug!(
            definitions = registry.ids().len(),
            fields = arrays.field_paths().len(),
            "database opened"
        );
        Ok(Self {
            arrays,
            metadata,
            registry,
            cfg,
        })
    }

    #[inline]
    pub fn config(&self) -> &DatabaseConfig {
        &self.cfg
    }

    #[inline]
    pub fn arrays(&self) -> &ArrayStore<P> {
        &self.arrays
    }

    #[inline]
    pub fn metadata(&self) -> &MetadataStore<S> {
        &self.metadata
    }

    #[inline]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Registers `definition` and persists it. Re-inserting an identical
    /// definition is a no-op; a conflicting one fails with
    /// [`Error::Schema`].
    pub fn insert_property_definition(&self, definition: PropertyDefinition) -> Result<()> {
        let id = definition.id.clone();
        let json = definition.to_json()?;
        let added = self.registry.register(definition)?;
        if added || !self.metadata.contains::<PropertyDefinitionDoc>(&id)? {
            self.metadata.put(&PropertyDefinitionDoc {
                id: id.clone(),
                definition: json,
            })?;
            tracing::debug!(definition = %id, "property definition inserted");
        }
        Ok(())
    }

    pub fn get_property_definition(&self, id: &str) -> Result<Arc<PropertyDefinition>> {
        self.registry.get(id).ok_or(Error::NotFound)
    }

    /// Stores a property-settings record. Re-inserting the same method,
    /// description and files unions the labels into the existing record.
    pub fn insert_property_settings(&self, settings: &PropertySettings) -> Result<PropertySettingsId> {
        let files: Vec<(&str, &str)> = settings
            .files
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        let id = self
            .cfg
            .identity
            .property_settings(&settings.method, &settings.description, &files);

        let mut doc = match self.metadata.get::<PropertySettingsDoc>(id)? {
            Some(doc) => doc,
            None => PropertySettingsDoc::new(
                id,
                settings.method.clone(),
                settings.description.clone(),
                settings
                    .files
                    .iter()
                    .map(|(name, contents)| SettingsFile {
                        name: name.clone(),
                        contents: contents.clone(),
                    })
                    .collect(),
            ),
        };
        doc.labels.extend(settings.labels.iter().cloned());
        self.metadata.put(&doc)?;
        tracing::debug!(settings = %id, method = %settings.method, "property settings inserted");
        Ok(id)
    }

    /// Adds `labels` to existing configurations. Labels are never removed.
    /// Returns the number of configurations that changed.
    ///
    /// Aggregates of sets and datasets holding these configurations are not
    /// refreshed until they are resynced.
    pub fn apply_labels(&self, ids: &[ConfigurationId], labels: &[&str]) -> Result<usize> {
        let labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let unique: BTreeSet<ConfigurationId> = ids.iter().copied().collect();
        let docs = self.metadata.require_many::<ConfigurationDoc, _>(unique)?;
        let mut batch = WriteBatch::new();
        let mut changed = 0;
        for mut doc in docs {
            if doc.merge_descriptors(std::iter::empty(), &labels) {
                batch.upsert(&doc)?;
                changed += 1;
            }
        }
        self.metadata.commit(batch)?;
        tracing::debug!(configurations = changed, "labels applied");
        Ok(changed)
    }
}
