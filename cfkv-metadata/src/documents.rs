//! Typed metadata documents.
//!
//! Each entity kind has one document type stored as JSON in its own
//! [`Collection`]. Every document that takes part in the relationship graph
//! carries a `relationships` block naming the IDs on the other side of each
//! edge; the `link_*` functions update both sides of an edge together so a
//! single write batch can persist them.

use crate::store::Collection;
use cfkv_aggregate::{ConfigurationSetAggregate, ConfigurationSummary, DatasetAggregate};
use cfkv_types::{ConfigurationId, ConfigurationSetId, DatasetId, PropertyId, PropertySettingsId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// A serializable record living in one collection under a string key.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn key(&self) -> String;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRelationships {
    pub properties: BTreeSet<PropertyId>,
    pub configuration_sets: BTreeSet<ConfigurationSetId>,
}

/// Keys of the free-form attributes a configuration has stored, under
/// `configurations/info/<key>` and `configurations/arrays/<key>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeKeys {
    pub info: BTreeSet<String>,
    pub arrays: BTreeSet<String>,
}

/// Metadata of one configuration. Numeric fields live in the array store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDoc {
    pub id: ConfigurationId,
    pub names: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub attributes: AttributeKeys,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    #[serde(flatten)]
    pub summary: ConfigurationSummary,
    #[serde(default)]
    pub relationships: ConfigurationRelationships,
}

impl ConfigurationDoc {
    pub fn new(id: ConfigurationId, summary: ConfigurationSummary) -> Self {
        Self {
            id,
            names: BTreeSet::new(),
            labels: BTreeSet::new(),
            attributes: AttributeKeys::default(),
            last_modified: OffsetDateTime::now_utc(),
            summary,
            relationships: ConfigurationRelationships::default(),
        }
    }

    /// Unions `names` and `labels` into the document. Returns true when
    /// anything was added.
    pub fn merge_descriptors<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a String>,
        labels: impl IntoIterator<Item = &'a String>,
    ) -> bool {
        let mut changed = false;
        for n in names {
            changed |= self.names.insert(n.clone());
        }
        for l in labels {
            changed |= self.labels.insert(l.clone());
        }
        if changed {
            self.touch();
        }
        changed
    }

    /// Records attribute keys whose values were stored. Keys already known
    /// keep the value stored first.
    pub fn merge_attribute_keys<'a>(
        &mut self,
        info: impl IntoIterator<Item = &'a String>,
        arrays: impl IntoIterator<Item = &'a String>,
    ) -> bool {
        let mut changed = false;
        for k in info {
            changed |= self.attributes.info.insert(k.clone());
        }
        for k in arrays {
            changed |= self.attributes.arrays.insert(k.clone());
        }
        if changed {
            self.touch();
        }
        changed
    }

    pub fn touch(&mut self) {
        self.last_modified = OffsetDateTime::now_utc();
    }
}

impl Document for ConfigurationDoc {
    const COLLECTION: Collection = Collection::Configurations;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRelationships {
    pub configurations: BTreeSet<ConfigurationId>,
    pub property_settings: BTreeSet<PropertySettingsId>,
    #[serde(default)]
    pub datasets: BTreeSet<DatasetId>,
}

/// Metadata of one property instance. Field values live in the array store
/// under `properties/<definition>/<field>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDoc {
    pub id: PropertyId,
    /// Property definition ID.
    pub definition: String,
    /// Names of the fields that were instantiated, in definition order.
    pub fields: Vec<String>,
    /// Union of the labels of attached property settings.
    pub labels: BTreeSet<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    #[serde(default)]
    pub relationships: PropertyRelationships,
}

impl PropertyDoc {
    pub fn new(id: PropertyId, definition: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            id,
            definition: definition.into(),
            fields,
            labels: BTreeSet::new(),
            last_modified: OffsetDateTime::now_utc(),
            relationships: PropertyRelationships::default(),
        }
    }
}

impl Document for PropertyDoc {
    const COLLECTION: Collection = Collection::Properties;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    pub name: String,
    pub contents: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySettingsRelationships {
    pub properties: BTreeSet<PropertyId>,
}

/// How a group of properties was computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySettingsDoc {
    pub id: PropertySettingsId,
    pub method: String,
    pub description: String,
    pub files: Vec<SettingsFile>,
    pub labels: BTreeSet<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    #[serde(default)]
    pub relationships: PropertySettingsRelationships,
}

impl PropertySettingsDoc {
    pub fn new(
        id: PropertySettingsId,
        method: impl Into<String>,
        description: impl Into<String>,
        files: Vec<SettingsFile>,
    ) -> Self {
        Self {
            id,
            method: method.into(),
            description: description.into(),
            files,
            labels: BTreeSet::new(),
            last_modified: OffsetDateTime::now_utc(),
            relationships: PropertySettingsRelationships::default(),
        }
    }
}

impl Document for PropertySettingsDoc {
    const COLLECTION: Collection = Collection::PropertySettings;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// A registered property definition in its JSON form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinitionDoc {
    pub id: String,
    pub definition: serde_json::Value,
}

impl Document for PropertyDefinitionDoc {
    const COLLECTION: Collection = Collection::PropertyDefinitions;

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSetRelationships {
    pub configurations: BTreeSet<ConfigurationId>,
    pub datasets: BTreeSet<DatasetId>,
}

/// A configuration set and its aggregate snapshot.
///
/// `aggregated_info` reflects the members at the last construction or
/// resync; it is not refreshed when members change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSetDoc {
    pub id: ConfigurationSetId,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    pub aggregated_info: ConfigurationSetAggregate,
    #[serde(default)]
    pub relationships: ConfigurationSetRelationships,
}

impl Document for ConfigurationSetDoc {
    const COLLECTION: Collection = Collection::ConfigurationSets;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRelationships {
    pub configuration_sets: BTreeSet<ConfigurationSetId>,
    pub properties: BTreeSet<PropertyId>,
}

/// A dataset. `authors`, `links` and `description` are set once at
/// creation; `aggregated_info` is recomputed by resync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetDoc {
    pub id: DatasetId,
    pub authors: Vec<String>,
    pub links: Vec<String>,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    pub aggregated_info: DatasetAggregate,
    #[serde(default)]
    pub relationships: DatasetRelationships,
}

impl Document for DatasetDoc {
    const COLLECTION: Collection = Collection::Datasets;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Adds the configuration/property edge to both documents. Returns true when
/// either side was missing it.
pub fn link_property(configuration: &mut ConfigurationDoc, property: &mut PropertyDoc) -> bool {
    let a = configuration.relationships.properties.insert(property.id);
    let b = property.relationships.configurations.insert(configuration.id);
    if a {
        configuration.touch();
    }
    if b {
        property.last_modified = OffsetDateTime::now_utc();
    }
    a || b
}

/// Adds the property/settings edge to both documents and unions the
/// settings' labels into the property.
pub fn link_property_settings(property: &mut PropertyDoc, settings: &mut PropertySettingsDoc) -> bool {
    let mut changed = property.relationships.property_settings.insert(settings.id);
    changed |= settings.relationships.properties.insert(property.id);
    for l in &settings.labels {
        changed |= property.labels.insert(l.clone());
    }
    if changed {
        property.last_modified = OffsetDateTime::now_utc();
    }
    changed
}

/// Adds the configuration/set edge to both documents.
pub fn link_configuration_set(
    configuration: &mut ConfigurationDoc,
    set: &mut ConfigurationSetDoc,
) -> bool {
    let a = configuration.relationships.configuration_sets.insert(set.id);
    let b = set.relationships.configurations.insert(configuration.id);
    if a {
        configuration.touch();
    }
    a || b
}

/// Adds the dataset/set edge to both documents.
pub fn link_dataset_configuration_set(dataset: &mut DatasetDoc, set: &mut ConfigurationSetDoc) -> bool {
    let a = dataset.relationships.configuration_sets.insert(set.id);
    let b = set.relationships.datasets.insert(dataset.id);
    a || b
}

/// Adds the dataset/property edge to both documents.
pub fn link_dataset_property(dataset: &mut DatasetDoc, property: &mut PropertyDoc) -> bool {
    let a = dataset.relationships.properties.insert(property.id);
    let b = property.relationships.datasets.insert(dataset.id);
    a || b
}
