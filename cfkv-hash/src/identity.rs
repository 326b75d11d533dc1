//! Identity derivation per entity kind.
//!
//! | kind | included | excluded |
//! |---|---|---|
//! | configuration | atomic numbers, positions, cell, pbc | names, labels, info, arrays, timestamps |
//! | property | definition ID, each field's name and value in definition order | settings, labels, attached configurations |
//! | property settings | method, description, file names and contents | labels |
//! | configuration set | sorted member configuration IDs | description, aggregates |
//! | dataset | sorted configuration-set IDs, sorted property IDs | authors, links, description, aggregates |

use crate::canonical::CanonicalEncoder;
use crate::hasher::{ContentHasher, EntityKind, Sha512Hasher};
use cfkv_types::{
    AtomicStructure, ConfigurationId, ConfigurationSetId, DatasetId, NdArray, PropertyId,
    PropertySettingsId,
};
use std::sync::Arc;

/// Borrowed `(file name, file contents)` pair of a property-settings record.
pub type SettingsFileRef<'a> = (&'a str, &'a str);

/// Derives typed IDs through an injected [`ContentHasher`].
#[derive(Clone)]
pub struct ContentIdentity {
    hasher: Arc<dyn ContentHasher>,
}

impl Default for ContentIdentity {
    fn default() -> Self {
        Self::new(Arc::new(Sha512Hasher))
    }
}

impl std::fmt::Debug for ContentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentIdentity").finish_non_exhaustive()
    }
}

impl ContentIdentity {
    pub fn new(hasher: Arc<dyn ContentHasher>) -> Self {
        Self { hasher }
    }

    pub fn configuration(&self, s: &AtomicStructure) -> ConfigurationId {
        let mut enc = CanonicalEncoder::new();
        enc.u64(s.atomic_numbers.len() as u64);
        for &z in &s.atomic_numbers {
            enc.u64(z as u64);
        }
        for p in &s.positions {
            for &x in p {
                enc.f64(x);
            }
        }
        for row in &s.cell {
            for &x in row {
                enc.f64(x);
            }
        }
        for &p in &s.pbc {
            enc.bool(p);
        }
        ConfigurationId(self.hasher.hash(EntityKind::Configuration, enc.as_bytes()))
    }

    pub fn property<'a, I>(&self, definition_id: &str, fields: I) -> PropertyId
    where
        I: IntoIterator<Item = (&'a str, &'a NdArray)>,
    {
        let mut enc = CanonicalEncoder::new();
        enc.str(definition_id);
        for (name, value) in fields {
            enc.str(name).nd(value);
        }
        PropertyId(self.hasher.hash(EntityKind::Property, enc.as_bytes()))
    }

    pub fn property_settings(
        &self,
        method: &str,
        description: &str,
        files: &[SettingsFileRef<'_>],
    ) -> PropertySettingsId {
        let mut enc = CanonicalEncoder::new();
        enc.str(method).str(description).u64(files.len() as u64);
        for (name, contents) in files {
            enc.str(name).str(contents);
        }
        PropertySettingsId(self.hasher.hash(EntityKind::PropertySettings, enc.as_bytes()))
    }

    pub fn configuration_set(&self, members: &[ConfigurationId]) -> ConfigurationSetId {
        let mut sorted: Vec<i64> = members.iter().map(|c| c.raw()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        let mut enc = CanonicalEncoder::new();
        enc.u64(sorted.len() as u64);
        for id in sorted {
            enc.i64(id);
        }
        ConfigurationSetId(self.hasher.hash(EntityKind::ConfigurationSet, enc.as_bytes()))
    }

    pub fn dataset(
        &self,
        configuration_sets: &[ConfigurationSetId],
        properties: &[PropertyId],
    ) -> DatasetId {
        let mut sets: Vec<i64> = configuration_sets.iter().map(|c| c.raw()).collect();
        sets.sort_unstable();
        sets.dedup();
        let mut props: Vec<i64> = properties.iter().map(|p| p.raw()).collect();
        props.sort_unstable();
        props.dedup();
        let mut enc = CanonicalEncoder::new();
        enc.u64(sets.len() as u64);
        for id in sets {
            enc.i64(id);
        }
        enc.u64(props.len() as u64);
        for id in props {
            enc.i64(id);
        }
        DatasetId(self.hasher.hash(EntityKind::Dataset, enc.as_bytes()))
    }
}
