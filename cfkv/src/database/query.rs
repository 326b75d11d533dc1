use super::Database;
use crate::paths::{
    ATOMIC_NUMBERS, CELL, PBC, POSITIONS, configuration_array, configuration_info,
    property_field,
};
use bytes::Bytes;
use cfkv_array_store::FieldData;
use cfkv_metadata::{ConfigurationDoc, DocumentStore};
use cfkv_result::{Error, Result};
use cfkv_storage::pager::Pager;
use cfkv_types::{AtomicStructure, ConfigurationId, NdArray, PropertyId, RecordKey};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

impl<P, S> Database<P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    /// Reads records of an array-store field path. See
    /// [`ArrayStore::get_data`](cfkv_array_store::ArrayStore::get_data).
    pub fn get_data(
        &self,
        path: &str,
        ids: Option<&[RecordKey]>,
        concatenate: bool,
    ) -> Result<FieldData<P>> {
        self.arrays.get_data(path, ids, concatenate)
    }

    /// Reads one field of a property definition, optionally restricted to
    /// (and ordered by) `ids`.
    pub fn get_property_data(
        &self,
        definition: &str,
        field: &str,
        ids: Option<&[PropertyId]>,
        concatenate: bool,
    ) -> Result<FieldData<P>> {
        let keys: Option<Vec<RecordKey>> = ids.map(|ids| ids.iter().map(|p| p.raw()).collect());
        self.arrays
            .get_data(&property_field(definition, field), keys.as_deref(), concatenate)
    }

    /// Stacks every record appended to `path` since its last concatenation.
    /// Returns the number of records stacked.
    pub fn concatenate_group(&self, path: &str) -> Result<usize> {
        self.arrays.concatenate_group(path)
    }

    /// Concatenates each standard configuration field that holds data.
    pub fn concatenate_configurations(&self) -> Result<usize> {
        let mut stacked = 0;
        for path in &self.cfg.standard_configuration_fields {
            if self.arrays.group_state(path).is_some() {
                stacked += self.arrays.concatenate_group(path)?;
            }
        }
        tracing::debug!(records = stacked, "configurations concatenated");
        Ok(stacked)
    }

    /// IDs of every stored configuration in first-insertion order.
    pub fn configuration_ids(&self) -> Result<Vec<ConfigurationId>> {
        if self.arrays.group_state(ATOMIC_NUMBERS).is_none() {
            return Ok(Vec::new());
        }
        Ok(self
            .arrays
            .record_ids(ATOMIC_NUMBERS)?
            .into_iter()
            .map(ConfigurationId::new)
            .collect())
    }

    /// Rebuilds one stored structure with its current names, labels and
    /// stored `info` and `arrays` attributes.
    pub fn get_configuration(&self, id: ConfigurationId) -> Result<AtomicStructure> {
        let mut out = self.load_configurations(std::slice::from_ref(&id))?;
        out.pop().ok_or(Error::NotFound)
    }

    /// Rebuilds the selected structures, or all of them in insertion order
    /// when `ids` is `None`.
    pub fn get_configurations(
        &self,
        ids: Option<&[ConfigurationId]>,
    ) -> Result<Vec<AtomicStructure>> {
        match ids {
            Some(ids) => self.load_configurations(ids),
            None => self.load_configurations(&self.configuration_ids()?),
        }
    }

    /// Like [`get_configurations`](Self::get_configurations) but loads
    /// structures in batches as the iterator is consumed.
    pub fn iter_configurations(
        &self,
        ids: Option<&[ConfigurationId]>,
    ) -> Result<ConfigurationIter<'_, P, S>> {
        let ids = match ids {
            Some(ids) => ids.to_vec(),
            None => self.configuration_ids()?,
        };
        Ok(ConfigurationIter {
            db: self,
            ids,
            pos: 0,
            buffered: Vec::new().into_iter(),
            failed: false,
        })
    }

    pub(crate) fn load_configurations(
        &self,
        ids: &[ConfigurationId],
    ) -> Result<Vec<AtomicStructure>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<RecordKey> = ids.iter().map(|c| c.raw()).collect();
        let mut columns = Vec::with_capacity(4);
        for path in [ATOMIC_NUMBERS, POSITIONS, CELL, PBC] {
            columns.push(
                self.arrays
                    .get_data(path, Some(&keys[..]), false)?
                    .into_records()?,
            );
        }
        let docs = self
            .metadata
            .require_many::<ConfigurationDoc, _>(ids.iter())?;
        let attributes = self.load_attributes(&docs)?;

        let mut out = Vec::with_capacity(ids.len());
        for (i, doc) in docs.into_iter().enumerate() {
            let mut structure = structure_from_arrays(
                &columns[0][i].1,
                &columns[1][i].1,
                &columns[2][i].1,
                &columns[3][i].1,
            )?;
            let key = doc.id.raw();
            for k in doc.attributes.info {
                let value = loaded_attribute(&attributes, configuration_info(&k), key)?;
                structure.info.insert(k, value);
            }
            for k in doc.attributes.arrays {
                let value = loaded_attribute(&attributes, configuration_array(&k), key)?;
                structure.arrays.insert(k, value);
            }
            structure.names = doc.names;
            structure.labels = doc.labels;
            out.push(structure);
        }
        Ok(out)
    }

    /// Reads every attribute the documents list, one selection per path.
    fn load_attributes(
        &self,
        docs: &[ConfigurationDoc],
    ) -> Result<FxHashMap<(String, RecordKey), NdArray>> {
        let mut wanted: BTreeMap<String, Vec<RecordKey>> = BTreeMap::new();
        for doc in docs {
            let info = doc.attributes.info.iter().map(|k| configuration_info(k));
            let arrays = doc.attributes.arrays.iter().map(|k| configuration_array(k));
            for path in info.chain(arrays) {
                wanted.entry(path).or_default().push(doc.id.raw());
            }
        }

        let mut out = FxHashMap::default();
        for (path, keys) in wanted {
            for (key, value) in self
                .arrays
                .get_data(&path, Some(&keys[..]), false)?
                .into_records()?
            {
                out.insert((path.clone(), key), value);
            }
        }
        Ok(out)
    }
}

fn loaded_attribute(
    loaded: &FxHashMap<(String, RecordKey), NdArray>,
    path: String,
    key: RecordKey,
) -> Result<NdArray> {
    loaded
        .get(&(path, key))
        .cloned()
        .ok_or_else(|| {
            Error::Internal(format!("attribute of configuration {key} was not loaded"))
        })
}

fn structure_from_arrays(
    atomic_numbers: &NdArray,
    positions: &NdArray,
    cell: &NdArray,
    pbc: &NdArray,
) -> Result<AtomicStructure> {
    let corrupt = |what: &str| Error::Internal(format!("stored {what} has an unexpected layout"));

    let zs = atomic_numbers
        .as_i64()
        .ok_or_else(|| corrupt("atomic numbers"))?
        .iter()
        .map(|&z| u8::try_from(z).map_err(|_| corrupt("atomic numbers")))
        .collect::<Result<Vec<u8>>>()?;
    let positions = rows3(positions).ok_or_else(|| corrupt("positions"))?;
    let cell_rows = rows3(cell).ok_or_else(|| corrupt("cell"))?;
    let cell: [[f64; 3]; 3] = cell_rows.try_into().map_err(|_| corrupt("cell"))?;
    let pbc: [bool; 3] = pbc
        .to_bool_vec()
        .and_then(|v| <[bool; 3]>::try_from(v).ok())
        .ok_or_else(|| corrupt("pbc"))?;
    AtomicStructure::new(zs, positions, cell, pbc)
}

fn rows3(a: &NdArray) -> Option<Vec<[f64; 3]>> {
    if a.trailing_shape() != [3] {
        return None;
    }
    Some(
        a.as_f64()?
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
    )
}

/// Structures loaded in batches; see [`Database::iter_configurations`].
pub struct ConfigurationIter<'db, P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    db: &'db Database<P, S>,
    ids: Vec<ConfigurationId>,
    pos: usize,
    buffered: std::vec::IntoIter<AtomicStructure>,
    failed: bool,
}

impl<P, S> Iterator for ConfigurationIter<'_, P, S>
where
    P: Pager<Blob = Bytes>,
    S: DocumentStore,
{
    type Item = Result<AtomicStructure>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(s) = self.buffered.next() {
            return Some(Ok(s));
        }
        if self.failed || self.pos >= self.ids.len() {
            return None;
        }
        let batch = self.db.cfg.array_store.lazy_batch_size.max(1);
        let end = (self.pos + batch).min(self.ids.len());
        let chunk = &self.ids[self.pos..end];
        self.pos = end;
        match self.db.load_configurations(chunk) {
            Ok(loaded) => {
                self.buffered = loaded.into_iter();
                self.buffered.next().map(Ok)
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.buffered.len() + self.ids.len() - self.pos;
        if self.failed { (0, Some(self.buffered.len())) } else { (n, Some(n)) }
    }
}
