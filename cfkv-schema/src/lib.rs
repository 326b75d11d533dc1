//! Property-definition schemas and their instantiation.
//!
//! A [`PropertyDefinition`] names a set of typed, shaped fields. The
//! [`SchemaRegistry`] stores definitions and turns the raw attributes of an
//! [`AtomicStructure`](cfkv_types::AtomicStructure) into validated field
//! values through a [`FieldMap`].

pub mod definition;
pub mod registry;
pub mod units;

pub use definition::{Extent, FieldSpec, FieldType, PropertyDefinition};
pub use registry::{FieldMap, FieldSource, PropertyMap, SchemaRegistry};
pub use units::{StandardUnits, UnitConverter};
