//! Configuration sets, datasets and resync.
//!
//! Aggregates are snapshots: they are computed when a group is constructed
//! or explicitly resynced, never when a member changes.

use super::Database;
use bytes::Bytes;
use cfkv_aggregate::{
    ConfigurationSetAccumulator, ConfigurationSetAggregate, DatasetAccumulator, DatasetAggregate,
    PropertySummary,
};
use cfkv_metadata::{
    ConfigurationDoc, ConfigurationSetDoc, DatasetDoc, DocumentStore, PropertyDoc, WriteBatch,
    link_configuration_set, link_dataset_configuration_set, link_dataset_property,
};
use cfkv_result::{Error, Result};
use cfkv_storage::pager::Pager;
use cfkv_types::{ConfigurationId, ConfigurationSetId, DatasetId, PropertyId};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Input of [`Database::insert_dataset`].
#[derive(Clone, Debug, Default)]
pub struct NewDataset {
    pub configuration_sets: Vec<ConfigurationSetId>,
    pub properties: Vec<PropertyId>,
    pub authors: Vec<String>,
    pub links: Vec<String>,
    pub description: String,
    /// Resync every member configuration set before aggregating.
    pub resync: bool,
}

impl NewDataset {
    pub fn new(
        configuration_sets: impl IntoIterator<Item = ConfigurationSetId>,
        properties: impl IntoIterator<Item = PropertyId>,
    ) -> Self {
        Self {
            configuration_sets: configuration_sets.into_iter().collect(),
            properties: properties.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_resync(mut self, resync: bool) -> Self {
        self.resync = resync;
        self
    }
}

fn aggregate_configurations(configs: &[ConfigurationDoc]) -> ConfigurationSetAggregate {
    let mut acc = ConfigurationSetAccumulator::new();
    for c in configs {
        acc.update(&c.summary, &c.labels);
    }
    acc.finalize()
}

fn aggregate_dataset(sets: &[ConfigurationSetDoc], properties: &[PropertyDoc]) -> DatasetAggregate {
    let mut acc = DatasetAccumulator::new();
    for s in sets {
        acc.update_configuration_set(&s.aggregated_info);
    }
    for p in properties {
        acc.update_property(PropertySummary {
            definition: &p.definition,
            labels: &p.labels,
        });
    }
    acc.finalize()
}

impl<P, S> Database<P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    /// Groups existing configurations into a set and aggregates them.
    ///
    /// The set's ID depends only on its members. Constructing a set that
    /// already exists refreshes its aggregate and keeps its description.
    pub fn insert_configuration_set(
        &self,
        configurations: &[ConfigurationId],
        description: &str,
    ) -> Result<ConfigurationSetId> {
        if configurations.is_empty() {
            return Err(Error::InvalidArgumentError(
                "a configuration set needs at least one configuration".into(),
            ));
        }
        let id = self.cfg.identity.configuration_set(configurations);
        let members: BTreeSet<ConfigurationId> = configurations.iter().copied().collect();
        let mut configs = self.metadata.require_many::<ConfigurationDoc, _>(&members)?;
        let aggregated_info = aggregate_configurations(&configs);

        let mut set = match self.metadata.get::<ConfigurationSetDoc>(id)? {
            Some(mut set) => {
                set.aggregated_info = aggregated_info;
                set.last_modified = OffsetDateTime::now_utc();
                set
            }
            None => ConfigurationSetDoc {
                id,
                description: description.to_string(),
                last_modified: OffsetDateTime::now_utc(),
                aggregated_info,
                relationships: Default::default(),
            },
        };

        let mut batch = WriteBatch::new();
        for c in &mut configs {
            if link_configuration_set(c, &mut set) {
                batch.upsert(&*c)?;
            }
        }
        batch.upsert(&set)?;
        self.metadata.commit(batch)?;

        tracing::info!(
            configuration_set = %id,
            configurations = members.len(),
            nsites = set.aggregated_info.nsites,
            "configuration set inserted"
        );
        Ok(id)
    }

    /// Recomputes a set's aggregate from the current state of its members.
    pub fn resync_configuration_set(
        &self,
        id: ConfigurationSetId,
    ) -> Result<ConfigurationSetAggregate> {
        let mut set = self.metadata.require::<ConfigurationSetDoc>(id)?;
        let configs = self
            .metadata
            .require_many::<ConfigurationDoc, _>(&set.relationships.configurations)?;
        set.aggregated_info = aggregate_configurations(&configs);
        set.last_modified = OffsetDateTime::now_utc();
        self.metadata.put(&set)?;
        tracing::info!(configuration_set = %id, "configuration set resynced");
        Ok(set.aggregated_info)
    }

    /// Groups configuration sets and properties into a dataset.
    ///
    /// Authors, links and description are recorded when the dataset is
    /// first created and kept on later constructions; the aggregate is
    /// recomputed every time. With `resync` each member set is resynced
    /// first, otherwise their stored aggregates are pooled as they are.
    pub fn insert_dataset(&self, request: &NewDataset) -> Result<DatasetId> {
        if request.configuration_sets.is_empty() {
            return Err(Error::InvalidArgumentError(
                "a dataset needs at least one configuration set".into(),
            ));
        }
        let set_ids: BTreeSet<ConfigurationSetId> =
            request.configuration_sets.iter().copied().collect();
        let property_ids: BTreeSet<PropertyId> = request.properties.iter().copied().collect();
        if request.resync {
            for &sid in &set_ids {
                self.resync_configuration_set(sid)?;
            }
        }

        let id = self
            .cfg
            .identity
            .dataset(&request.configuration_sets, &request.properties);
        let mut sets = self
            .metadata
            .require_many::<ConfigurationSetDoc, _>(&set_ids)?;
        let mut properties = self.metadata.require_many::<PropertyDoc, _>(&property_ids)?;
        let aggregated_info = aggregate_dataset(&sets, &properties);

        let mut dataset = match self.metadata.get::<DatasetDoc>(id)? {
            Some(mut ds) => {
                ds.aggregated_info = aggregated_info;
                ds.last_modified = OffsetDateTime::now_utc();
                ds
            }
            None => DatasetDoc {
                id,
                authors: request.authors.clone(),
                links: request.links.clone(),
                description: request.description.clone(),
                last_modified: OffsetDateTime::now_utc(),
                aggregated_info,
                relationships: Default::default(),
            },
        };

        let mut batch = WriteBatch::new();
        for s in &mut sets {
            if link_dataset_configuration_set(&mut dataset, s) {
                batch.upsert(&*s)?;
            }
        }
        for p in &mut properties {
            if link_dataset_property(&mut dataset, p) {
                batch.upsert(&*p)?;
            }
        }
        batch.upsert(&dataset)?;
        self.metadata.commit(batch)?;

        tracing::info!(
            dataset = %id,
            configuration_sets = set_ids.len(),
            properties = property_ids.len(),
            "dataset inserted"
        );
        Ok(id)
    }

    /// Resyncs every member set, then recomputes the dataset aggregate from
    /// the current sets and properties.
    pub fn resync_dataset(&self, id: DatasetId) -> Result<DatasetAggregate> {
        let mut dataset = self.metadata.require::<DatasetDoc>(id)?;
        for &sid in &dataset.relationships.configuration_sets {
            self.resync_configuration_set(sid)?;
        }
        let sets = self
            .metadata
            .require_many::<ConfigurationSetDoc, _>(&dataset.relationships.configuration_sets)?;
        let properties = self
            .metadata
            .require_many::<PropertyDoc, _>(&dataset.relationships.properties)?;
        dataset.aggregated_info = aggregate_dataset(&sets, &properties);
        dataset.last_modified = OffsetDateTime::now_utc();
        self.metadata.put(&dataset)?;
        tracing::info!(dataset = %id, "dataset resynced");
        Ok(dataset.aggregated_info)
    }
}
