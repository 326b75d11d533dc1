#![allow(dead_code)]

use cfkv::{
    Database, DatabaseConfig, FieldMap, FieldSource, InsertOptions, MemDocumentStore, MemPager,
    NdArray, PropertyDefinition, PropertySettings, PropertySettingsId,
};
use serde_json::json;
use std::sync::Arc;

pub type MemDatabase = Database<MemPager, MemDocumentStore>;

pub struct Harness {
    pub pager: Arc<MemPager>,
    pub docs: Arc<MemDocumentStore>,
    pub db: MemDatabase,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(cfg: DatabaseConfig) -> Self {
        cfkv_test_utils::init_tracing_for_tests();
        let pager = Arc::new(MemPager::new());
        let docs = Arc::new(MemDocumentStore::new());
        let db = Database::open_with_config(Arc::clone(&pager), Arc::clone(&docs), cfg)
            .expect("open database");
        Self { pager, docs, db }
    }

    /// A second engine over the same stores.
    pub fn reopen(&self) -> MemDatabase {
        Database::open(Arc::clone(&self.pager), Arc::clone(&self.docs)).expect("reopen database")
    }
}

pub fn default_definition() -> PropertyDefinition {
    PropertyDefinition::from_json(&json!({
        "property-id": "default",
        "property-title": "A default property used for testing",
        "property-description": "A description of the property",
        "energy": {"type": "float", "has-unit": true, "extent": [], "required": true, "description": "empty"},
        "stress": {"type": "float", "has-unit": true, "extent": [6], "required": true, "description": "empty"},
        "name": {"type": "string", "has-unit": false, "extent": [], "required": true, "description": "empty"},
        "nd-same-shape": {"type": "float", "has-unit": true, "extent": [2, 3, 5], "required": true, "description": "empty"},
        "nd-diff-shapes": {"type": "float", "has-unit": true, "extent": [":", ":", ":"], "required": true, "description": "empty"},
        "forces": {"type": "float", "has-unit": true, "extent": [":", 3], "required": true, "description": "empty"},
        "nd-same-shape-arr": {"type": "float", "has-unit": true, "extent": [":", 2, 3], "required": true, "description": "empty"},
        "nd-diff-shapes-arr": {"type": "float", "has-unit": true, "extent": [":", ":", ":"], "required": true, "description": "empty"},
    }))
    .expect("valid definition")
}

pub fn default_field_map() -> FieldMap {
    let mut map = FieldMap::new();
    for (field, units) in [
        ("energy", Some("eV")),
        ("stress", Some("GPa")),
        ("name", None),
        ("nd-same-shape", Some("eV")),
        ("nd-diff-shapes", Some("eV")),
        ("forces", Some("eV/Ang")),
        ("nd-same-shape-arr", Some("eV/Ang")),
        ("nd-diff-shapes-arr", Some("eV/Ang")),
    ] {
        let mut src = FieldSource::new(field);
        if let Some(u) = units {
            src = src.with_units(u);
        }
        map.insert(field.to_string(), src);
    }
    map
}

pub fn vasp_settings() -> PropertySettings {
    PropertySettings::new("VASP", "A basic test calculation")
        .with_file("dummy_name", "dummy file contents")
        .with_label("pso_label1")
        .with_label("pso_label2")
}

/// Registers the default definition and settings; returns options that
/// extract the default property linked to those settings.
pub fn setup_default_property(db: &MemDatabase) -> (PropertySettingsId, InsertOptions) {
    db.insert_property_definition(default_definition())
        .expect("insert definition");
    let pso = db
        .insert_property_settings(&vasp_settings())
        .expect("insert settings");
    let options = InsertOptions::new()
        .with_property("default", default_field_map())
        .with_settings("default", pso);
    (pso, options)
}

pub fn flat_f64<'a>(arrays: impl IntoIterator<Item = &'a NdArray>) -> Vec<f64> {
    arrays
        .into_iter()
        .flat_map(|a| a.to_f64_vec().expect("numeric array"))
        .collect()
}

pub fn shift_energies(structures: &mut [cfkv::AtomicStructure], delta: f64) {
    for s in structures {
        let e = s.info["energy"].as_f64().expect("float energy")[0];
        s.info
            .insert("energy".to_string(), NdArray::scalar_f64(e + delta));
    }
}
