//! Definition storage and property instantiation.

use crate::definition::{FieldType, PropertyDefinition, display_extent};
use crate::units::{StandardUnits, UnitConverter};
use cfkv_result::{Error, Result};
use cfkv_types::{AtomicStructure, DType, NdArray};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Where a property field's value comes from in the raw attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSource {
    /// Key looked up in the structure's `info`, then `arrays`.
    pub field: String,
    /// Unit of the raw value; `None` stores it unchanged.
    #[serde(default)]
    pub units: Option<String>,
}

impl FieldSource {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

/// Definition field name to raw source.
pub type FieldMap = BTreeMap<String, FieldSource>;

/// Definition ID to its field map.
pub type PropertyMap = BTreeMap<String, FieldMap>;

/// Registered property definitions.
///
/// Registration and lookup go through an internal lock, so a shared registry
/// can be used from several readers while definitions are added.
pub struct SchemaRegistry {
    definitions: RwLock<FxHashMap<String, Arc<PropertyDefinition>>>,
    units: Arc<dyn UnitConverter>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::with_units(Arc::new(StandardUnits))
    }

    pub fn with_units(units: Arc<dyn UnitConverter>) -> Self {
        Self {
            definitions: RwLock::new(FxHashMap::default()),
            units,
        }
    }

    /// Registers `definition`.
    ///
    /// Returns `true` when the ID was new. Re-registering an identical schema
    /// is a no-op returning `false`; a different schema under a known ID is a
    /// [`Error::Schema`].
    pub fn register(&self, definition: PropertyDefinition) -> Result<bool> {
        definition.validate()?;
        let mut defs = self.definitions.write().unwrap();
        if let Some(existing) = defs.get(&definition.id) {
            if existing.same_schema(&definition) {
                return Ok(false);
            }
            return Err(Error::Schema(format!(
                "property definition '{}' already exists with a different schema",
                definition.id
            )));
        }
        tracing::debug!(definition = %definition.id, fields = definition.fields.len(), "property definition registered");
        defs.insert(definition.id.clone(), Arc::new(definition));
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<Arc<PropertyDefinition>> {
        self.definitions.read().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.read().unwrap().contains_key(id)
    }

    /// Registered definition IDs, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.definitions.read().unwrap().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Resolves the fields of `definition_id` from `raw` through `field_map`.
    ///
    /// Fields are checked in definition order: presence (required fields
    /// only), element type, shape pattern, then unit conversion. Optional
    /// fields with no mapping or no raw value are skipped. The returned
    /// values are in definition order, floats widened to `f64` and in base
    /// units.
    pub fn instantiate(
        &self,
        definition_id: &str,
        field_map: &FieldMap,
        raw: &AtomicStructure,
    ) -> Result<Vec<(String, NdArray)>> {
        let definition = self.get(definition_id).ok_or_else(|| {
            Error::Schema(format!("unknown property definition '{definition_id}'"))
        })?;

        if let Some(unknown) = field_map
            .keys()
            .find(|k| !definition.fields.contains_key(*k))
        {
            return Err(Error::Schema(format!(
                "property '{definition_id}' has no field '{unknown}'"
            )));
        }

        let mut out = Vec::with_capacity(definition.fields.len());
        for (name, spec) in &definition.fields {
            let missing = || Error::MissingField {
                definition: definition_id.to_string(),
                field: name.clone(),
            };
            let Some(source) = field_map.get(name) else {
                if spec.required {
                    return Err(missing());
                }
                continue;
            };
            let Some(value) = raw.attribute(&source.field) else {
                if spec.required {
                    return Err(missing());
                }
                continue;
            };

            if !spec.field_type.accepts(value.dtype()) {
                return Err(Error::Schema(format!(
                    "field '{name}' of property '{definition_id}' expects {}, got {}",
                    spec.field_type.name(),
                    value.dtype().name()
                )));
            }
            if !spec.shape_matches(value.shape()) {
                return Err(Error::ShapeMismatch {
                    definition: definition_id.to_string(),
                    field: name.clone(),
                    expected: display_extent(&spec.extent),
                    actual: value.shape().to_vec(),
                });
            }

            let mut value = if spec.field_type == FieldType::Float && value.dtype() == DType::Int64
            {
                value.map_f64(|x| x)?
            } else {
                value.clone()
            };

            if let Some(units) = &source.units {
                if !spec.has_unit {
                    return Err(Error::Schema(format!(
                        "field '{name}' of property '{definition_id}' is unitless but units '{units}' were given"
                    )));
                }
                if spec.field_type == FieldType::Float {
                    let factor = self.units.factor(units)?;
                    if factor != 1.0 {
                        value = value.map_f64(|x| x * factor)?;
                    }
                }
            }
            out.push((name.clone(), value));
        }

        tracing::trace!(definition = definition_id, fields = out.len(), "property instantiated");
        Ok(out)
    }
}
