//! Eager and lazy insertion of configurations and their properties.
//!
//! Each input record goes through two phases. `prepare` derives IDs,
//! computes the configuration summary, collects the structure's `info` and
//! `arrays` attributes and instantiates every mapped property; it touches
//! no storage. `commit` appends array values that are not stored yet, then
//! upserts documents and relationship edges in one metadata batch.
//!
//! Eager insertion prepares every record before committing any, so a
//! validation failure leaves both stores untouched. Lazy insertion prepares
//! and commits one record at a time; a failure leaves the records before
//! it committed.

use super::Database;
use crate::paths::{
    ATOMIC_NUMBERS, CELL, PBC, POSITIONS, configuration_array, configuration_info,
    is_standard_field, property_field,
};
use bytes::Bytes;
use cfkv_aggregate::ConfigurationSummary;
use cfkv_metadata::{
    ConfigurationDoc, DocumentStore, PropertyDoc, PropertySettingsDoc, WriteBatch, link_property,
    link_property_settings,
};
use cfkv_result::{Error, Result};
use cfkv_schema::{FieldMap, PropertyMap};
use cfkv_storage::pager::Pager;
use cfkv_types::{
    AtomicStructure, ConfigurationId, NdArray, PropertyId, PropertySettingsId, RecordKey,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// `(configuration, property)` produced by an insertion. A record with no
/// instantiated property yields one pair with `None`; a record with several
/// yields one pair per property.
pub type InsertedPair = (ConfigurationId, Option<PropertyId>);

/// Which properties to extract from each inserted structure.
#[derive(Clone, Debug, Default)]
pub struct InsertOptions {
    /// Definition ID to field map.
    pub property_map: PropertyMap,
    /// Definition ID to the settings its properties are linked to.
    pub property_settings: BTreeMap<String, PropertySettingsId>,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, definition: impl Into<String>, fields: FieldMap) -> Self {
        self.property_map.insert(definition.into(), fields);
        self
    }

    pub fn with_settings(mut self, definition: impl Into<String>, id: PropertySettingsId) -> Self {
        self.property_settings.insert(definition.into(), id);
        self
    }
}

struct PreparedProperty {
    id: PropertyId,
    definition: String,
    fields: Vec<(String, NdArray)>,
    settings: Option<PropertySettingsId>,
}

struct PreparedRecord {
    id: ConfigurationId,
    summary: ConfigurationSummary,
    names: BTreeSet<String>,
    labels: BTreeSet<String>,
    arrays: [(&'static str, NdArray); 4],
    /// `(path, value)` of every `info` and `arrays` attribute.
    attributes: Vec<(String, NdArray)>,
    info_keys: Vec<String>,
    array_keys: Vec<String>,
    properties: Vec<PreparedProperty>,
}

impl PreparedRecord {
    fn pairs(&self) -> Vec<InsertedPair> {
        if self.properties.is_empty() {
            return vec![(self.id, None)];
        }
        self.properties.iter().map(|p| (self.id, Some(p.id))).collect()
    }
}

impl<P, S> Database<P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    /// Inserts every structure or none of them.
    ///
    /// All records are validated before anything is written; the first
    /// failure is returned wrapped in [`Error::Record`] with its input index.
    /// Every `info` and `arrays` attribute is stored under
    /// `configurations/info/<key>` or `configurations/arrays/<key>`. The
    /// `info` keys `cell` and `pbc` and the `arrays` keys `atomic_numbers`
    /// and `positions` name identity fields and are rejected.
    ///
    /// Re-inserting a known structure unions its names and labels and does
    /// not store its arrays again. Attribute keys it did not have before
    /// are added; values of keys it already has are kept. A property is stored once per distinct
    /// ID and linked to every configuration it was extracted from.
    pub fn insert_data(
        &self,
        structures: &[AtomicStructure],
        options: &InsertOptions,
    ) -> Result<Vec<InsertedPair>> {
        self.check_settings(options)?;
        let prepared = structures
            .iter()
            .enumerate()
            .map(|(i, s)| self.prepare(s, options).map_err(|e| e.for_record(i)))
            .collect::<Result<Vec<_>>>()?;
        self.commit(&prepared)?;
        tracing::debug!(records = prepared.len(), "inserted data");
        Ok(prepared.iter().flat_map(PreparedRecord::pairs).collect())
    }

    /// Inserts structures one at a time as the returned stream is consumed.
    ///
    /// Peak memory is bounded by one record. The stream is single-pass and
    /// not atomic: when a record fails its error is yielded, wrapped in
    /// [`Error::Record`], while earlier records stay committed. Consuming
    /// further continues with the next record.
    pub fn insert_data_lazy<I>(
        &self,
        structures: I,
        options: InsertOptions,
    ) -> Result<InsertStream<'_, P, S, I::IntoIter>>
    where
        I: IntoIterator,
        I::Item: Borrow<AtomicStructure>,
    {
        self.check_settings(&options)?;
        Ok(InsertStream {
            db: self,
            options,
            structures: structures.into_iter(),
            index: 0,
            pending: VecDeque::new(),
        })
    }

    fn check_settings(&self, options: &InsertOptions) -> Result<()> {
        for (definition, id) in &options.property_settings {
            if !options.property_map.contains_key(definition) {
                return Err(Error::InvalidArgumentError(format!(
                    "settings given for unmapped property '{definition}'"
                )));
            }
            if !self.metadata.contains::<PropertySettingsDoc>(id)? {
                return Err(Error::InvalidArgumentError(format!(
                    "property settings {id} have not been inserted"
                )));
            }
        }
        Ok(())
    }

    fn prepare(&self, s: &AtomicStructure, options: &InsertOptions) -> Result<PreparedRecord> {
        let identity = &self.cfg.identity;
        let id = identity.configuration(s);
        let summary = ConfigurationSummary::from_structure(s)?;

        let atomic_numbers = NdArray::from_i64(
            vec![s.natoms()],
            s.atomic_numbers.iter().map(|&z| i64::from(z)).collect(),
        )?;
        let arrays = [
            (ATOMIC_NUMBERS, atomic_numbers),
            (POSITIONS, NdArray::from_rows(&s.positions)),
            (CELL, NdArray::from_rows(&s.cell)),
            (PBC, NdArray::from_bool(vec![3], s.pbc.to_vec())?),
        ];

        let info = s.info.iter().map(|(k, v)| (configuration_info(k), v));
        let per_atom = s.arrays.iter().map(|(k, v)| (configuration_array(k), v));
        let mut attributes = Vec::with_capacity(s.info.len() + s.arrays.len());
        for (path, value) in info.chain(per_atom) {
            if is_standard_field(&path) {
                return Err(Error::InvalidArgumentError(format!(
                    "attribute '{path}' collides with a configuration field"
                )));
            }
            attributes.push((path, value.clone()));
        }

        let mut properties = Vec::with_capacity(options.property_map.len());
        for (definition, field_map) in &options.property_map {
            let fields = self.registry.instantiate(definition, field_map, s)?;
            let pid = identity.property(
                definition,
                fields.iter().map(|(name, value)| (name.as_str(), value)),
            );
            properties.push(PreparedProperty {
                id: pid,
                definition: definition.clone(),
                fields,
                settings: options.property_settings.get(definition).copied(),
            });
        }

        Ok(PreparedRecord {
            id,
            summary,
            names: s.names.clone(),
            labels: s.labels.clone(),
            arrays,
            attributes,
            info_keys: s.info.keys().cloned().collect(),
            array_keys: s.arrays.keys().cloned().collect(),
            properties,
        })
    }

    fn commit(&self, records: &[PreparedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Arrays: only values the store does not hold yet.
        let mut appends: BTreeMap<String, Vec<(RecordKey, &NdArray)>> = BTreeMap::new();
        let mut queued: FxHashSet<(String, RecordKey)> = FxHashSet::default();
        let candidates = records.iter().flat_map(|r| {
            let config = r
                .arrays
                .iter()
                .map(move |(path, value)| (path.to_string(), r.id.raw(), value))
                .chain(
                    r.attributes
                        .iter()
                        .map(move |(path, value)| (path.clone(), r.id.raw(), value)),
                );
            let properties = r.properties.iter().flat_map(|p| {
                p.fields.iter().map(move |(field, value)| {
                    (property_field(&p.definition, field), p.id.raw(), value)
                })
            });
            config.chain(properties)
        });
        for (path, key, value) in candidates {
            if !self.arrays.contains(&path, key) && queued.insert((path.clone(), key)) {
                appends.entry(path).or_default().push((key, value));
            }
        }
        for (path, values) in &appends {
            self.arrays.append_many(path, values.iter().copied())?;
        }

        // Documents: load what exists, fold every record in, write once.
        let cids: BTreeSet<ConfigurationId> = records.iter().map(|r| r.id).collect();
        let pids: BTreeSet<PropertyId> = records
            .iter()
            .flat_map(|r| r.properties.iter().map(|p| p.id))
            .collect();
        let sids: BTreeSet<PropertySettingsId> = records
            .iter()
            .flat_map(|r| r.properties.iter().filter_map(|p| p.settings))
            .collect();

        let mut configs: FxHashMap<ConfigurationId, ConfigurationDoc> = cids
            .iter()
            .copied()
            .zip(self.metadata.get_many::<ConfigurationDoc, _>(&cids)?)
            .filter_map(|(id, doc)| doc.map(|d| (id, d)))
            .collect();
        let mut props: FxHashMap<PropertyId, PropertyDoc> = pids
            .iter()
            .copied()
            .zip(self.metadata.get_many::<PropertyDoc, _>(&pids)?)
            .filter_map(|(id, doc)| doc.map(|d| (id, d)))
            .collect();
        let mut settings: FxHashMap<PropertySettingsId, PropertySettingsDoc> = sids
            .iter()
            .copied()
            .zip(self.metadata.require_many::<PropertySettingsDoc, _>(&sids)?)
            .collect();

        for r in records {
            let config = configs
                .entry(r.id)
                .or_insert_with(|| ConfigurationDoc::new(r.id, r.summary.clone()));
            config.merge_descriptors(&r.names, &r.labels);
            config.merge_attribute_keys(&r.info_keys, &r.array_keys);

            for p in &r.properties {
                let prop = props.entry(p.id).or_insert_with(|| {
                    PropertyDoc::new(
                        p.id,
                        p.definition.clone(),
                        p.fields.iter().map(|(name, _)| name.clone()).collect(),
                    )
                });
                link_property(config, prop);
                if let Some(sid) = p.settings {
                    let doc = settings.get_mut(&sid).ok_or(Error::NotFound)?;
                    link_property_settings(prop, doc);
                }
            }
        }

        let mut batch = WriteBatch::new();
        for doc in configs.values() {
            batch.upsert(doc)?;
        }
        for doc in props.values() {
            batch.upsert(doc)?;
        }
        for doc in settings.values() {
            batch.upsert(doc)?;
        }
        self.metadata.commit(batch)?;

        tracing::trace!(
            configurations = configs.len(),
            properties = props.len(),
            array_paths = appends.len(),
            "insert batch committed"
        );
        Ok(())
    }
}

/// Lazy insertion in progress; see [`Database::insert_data_lazy`].
pub struct InsertStream<'db, P, S, I>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    db: &'db Database<P, S>,
    options: InsertOptions,
    structures: I,
    index: usize,
    pending: VecDeque<InsertedPair>,
}

impl<P, S, I> InsertStream<'_, P, S, I>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    /// Number of input records consumed so far, failed ones included.
    pub fn records_consumed(&self) -> usize {
        self.index
    }
}

impl<P, S, I> Iterator for InsertStream<'_, P, S, I>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
    I: Iterator,
    I::Item: Borrow<AtomicStructure>,
{
    type Item = Result<InsertedPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pair) = self.pending.pop_front() {
            return Some(Ok(pair));
        }
        let structure = self.structures.next()?;
        let index = self.index;
        self.index += 1;

        let inserted = self
            .db
            .prepare(Borrow::<AtomicStructure>::borrow(&structure), &self.options)
            .and_then(|record| {
                self.db.commit(std::slice::from_ref(&record))?;
                Ok(record)
            });
        match inserted {
            Ok(record) => {
                self.pending.extend(record.pairs());
                self.pending.pop_front().map(Ok)
            }
            Err(err) => {
                tracing::debug!(record = index, error = %err, "lazy insert failed");
                Some(Err(err.for_record(index)))
            }
        }
    }
}
