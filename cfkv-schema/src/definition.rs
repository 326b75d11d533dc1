//! Property definitions in the OpenKIM property-definition layout.
//!
//! ```json
//! {
//!   "property-id": "default",
//!   "property-title": "...",
//!   "property-description": "...",
//!   "energy": {"type": "float", "has-unit": true, "extent": [], "required": true},
//!   "forces": {"type": "float", "has-unit": true, "extent": [":", 3], "required": true}
//! }
//! ```
//!
//! Every key other than the three reserved ones is a field. Fields are kept
//! sorted by name; that order is the definition order used for hashing and
//! storage.

use cfkv_result::{Error, Result};
use cfkv_types::DType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

const KEY_ID: &str = "property-id";
const KEY_TITLE: &str = "property-title";
const KEY_DESCRIPTION: &str = "property-description";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Float,
    Int,
    Bool,
    String,
    /// File contents, stored as a string.
    File,
}

impl FieldType {
    /// Whether a raw value of `dtype` can fill a field of this type.
    pub fn accepts(self, dtype: DType) -> bool {
        matches!(
            (self, dtype),
            (FieldType::Float, DType::Float64 | DType::Int64)
                | (FieldType::Int, DType::Int64)
                | (FieldType::Bool, DType::Bool)
                | (FieldType::String | FieldType::File, DType::Utf8)
        )
    }

    /// Element type the field is stored as.
    pub fn storage_dtype(self) -> DType {
        match self {
            FieldType::Float => DType::Float64,
            FieldType::Int => DType::Int64,
            FieldType::Bool => DType::Bool,
            FieldType::String | FieldType::File => DType::Utf8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Float => "float",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::File => "file",
        }
    }
}

/// One dimension of a field's shape pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extent {
    Fixed(usize),
    /// `":"`: any extent.
    Wildcard,
}

impl Extent {
    #[inline]
    pub fn matches(self, extent: usize) -> bool {
        match self {
            Extent::Fixed(n) => n == extent,
            Extent::Wildcard => true,
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Fixed(n) => write!(f, "{n}"),
            Extent::Wildcard => f.write_str(":"),
        }
    }
}

impl Serialize for Extent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Extent::Fixed(n) => serializer.serialize_u64(*n as u64),
            Extent::Wildcard => serializer.serialize_str(":"),
        }
    }
}

impl<'de> Deserialize<'de> for Extent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Fixed(u64),
            Token(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Fixed(0) => Err(serde::de::Error::custom("extent must be positive")),
            Raw::Fixed(n) => Ok(Extent::Fixed(n as usize)),
            Raw::Token(t) if t == ":" => Ok(Extent::Wildcard),
            Raw::Token(t) => Err(serde::de::Error::custom(format!(
                "extent token must be ':' or a positive integer, got '{t}'"
            ))),
        }
    }
}

/// Renders a shape pattern as `[:, 3]`.
pub fn display_extent(extent: &[Extent]) -> String {
    let parts: Vec<String> = extent.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(rename = "has-unit", default)]
    pub has_unit: bool,
    #[serde(default)]
    pub extent: Vec<Extent>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl FieldSpec {
    pub fn new(field_type: FieldType, extent: Vec<Extent>) -> Self {
        Self {
            field_type,
            has_unit: false,
            extent,
            required: true,
            description: String::new(),
        }
    }

    pub fn with_unit(mut self) -> Self {
        self.has_unit = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// True when `shape` has the pattern's rank and every fixed extent.
    pub fn shape_matches(&self, shape: &[usize]) -> bool {
        shape.len() == self.extent.len()
            && self.extent.iter().zip(shape).all(|(e, &n)| e.matches(n))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub fields: BTreeMap<String, FieldSpec>,
}

fn check_identifier(kind: &str, s: &str) -> Result<()> {
    let ok = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::Schema(format!(
            "{kind} '{s}' must be non-empty lowercase letters, digits or '-'"
        )))
    }
}

impl PropertyDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Checks identifiers and that at least one field is defined.
    pub fn validate(&self) -> Result<()> {
        check_identifier("property id", &self.id)?;
        if self.fields.is_empty() {
            return Err(Error::Schema(format!(
                "property '{}' defines no fields",
                self.id
            )));
        }
        for name in self.fields.keys() {
            check_identifier("field name", name)?;
        }
        Ok(())
    }

    /// Parses and validates the JSON form.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Schema("property definition must be a JSON object".into()))?;
        let text = |key: &str| -> Result<String> {
            match obj.get(key) {
                None => Ok(String::new()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(Error::Schema(format!("'{key}' must be a string"))),
            }
        };
        let id = match obj.get(KEY_ID) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(Error::Schema(format!("missing string '{KEY_ID}'"))),
        };

        let mut fields = BTreeMap::new();
        for (name, spec) in obj {
            if matches!(name.as_str(), KEY_ID | KEY_TITLE | KEY_DESCRIPTION) {
                continue;
            }
            let spec: FieldSpec = serde_json::from_value(spec.clone())
                .map_err(|e| Error::Schema(format!("field '{name}' of '{id}': {e}")))?;
            fields.insert(name.clone(), spec);
        }

        let def = Self {
            title: text(KEY_TITLE)?,
            description: text(KEY_DESCRIPTION)?,
            id,
            fields,
        };
        def.validate()?;
        Ok(def)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut obj = Map::new();
        obj.insert(KEY_ID.into(), Value::String(self.id.clone()));
        obj.insert(KEY_TITLE.into(), Value::String(self.title.clone()));
        obj.insert(
            KEY_DESCRIPTION.into(),
            Value::String(self.description.clone()),
        );
        for (name, spec) in &self.fields {
            obj.insert(name.clone(), serde_json::to_value(spec)?);
        }
        Ok(Value::Object(obj))
    }

    /// True when both definitions constrain fields identically.
    pub fn same_schema(&self, other: &Self) -> bool {
        self.id == other.id && self.fields == other.fields
    }
}
