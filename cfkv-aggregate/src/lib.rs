//! Statistics folded over configurations and properties.
//!
//! [`ConfigurationSummary`] is the per-configuration view stored on each
//! configuration document. [`ConfigurationSetAccumulator`] folds summaries
//! into a [`ConfigurationSetAggregate`]; [`DatasetAccumulator`] pools set
//! aggregates and property summaries into a [`DatasetAggregate`]. Every
//! folded quantity is a set, count or sum, so the result does not depend on
//! the order members are visited in.

mod accumulator;
mod summary;

pub use accumulator::{
    ConfigurationSetAccumulator, ConfigurationSetAggregate, DatasetAccumulator, DatasetAggregate,
    PropertySummary,
};
pub use summary::ConfigurationSummary;
