//! Core value types shared across cfkv crates.
//!
//! These live in their own crate so the hasher, schema registry, array store
//! and metadata store can agree on identifiers and payload shapes without
//! depending on each other.

pub mod composition;
pub mod elements;
pub mod ids;
pub mod ndarray;
pub mod structure;

pub use composition::Composition;
pub use ids::{
    ConfigurationId, ConfigurationSetId, DatasetId, PropertyId, PropertySettingsId, RecordKey,
};
pub use ndarray::{DType, NdArray};
pub use structure::AtomicStructure;
