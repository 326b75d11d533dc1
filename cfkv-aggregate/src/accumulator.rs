use crate::summary::ConfigurationSummary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregated info of a configuration set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSetAggregate {
    pub nconfigurations: u64,
    pub nsites: u64,
    pub nelements: usize,
    pub elements: Vec<String>,
    /// Distinct per-configuration ratio tuples.
    pub individual_elements_ratios: Vec<Vec<f64>>,
    /// Pooled fraction of all sites per entry of `elements`.
    pub total_elements_ratios: Vec<f64>,
    pub element_site_counts: Vec<u64>,
    pub labels: Vec<String>,
    pub labels_counts: Vec<u64>,
    pub chemical_formula_reduced: Vec<String>,
    pub chemical_formula_anonymous: Vec<String>,
    pub chemical_formula_hill: Vec<String>,
    pub nperiodic_dimensions: Vec<u8>,
    pub dimension_types: Vec<[u8; 3]>,
}

/// Aggregated info of a dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetAggregate {
    pub nconfigurations: u64,
    pub nsites: u64,
    pub nelements: usize,
    pub elements: Vec<String>,
    pub individual_elements_ratios: Vec<Vec<f64>>,
    pub total_elements_ratios: Vec<f64>,
    pub element_site_counts: Vec<u64>,
    pub configuration_labels: Vec<String>,
    pub configuration_labels_counts: Vec<u64>,
    pub chemical_formula_reduced: Vec<String>,
    pub chemical_formula_anonymous: Vec<String>,
    pub chemical_formula_hill: Vec<String>,
    pub nperiodic_dimensions: Vec<u8>,
    pub dimension_types: Vec<[u8; 3]>,
    pub nproperties: u64,
    /// Distinct property definition IDs.
    pub types: Vec<String>,
    pub types_counts: Vec<u64>,
    pub property_labels: Vec<String>,
    pub property_labels_counts: Vec<u64>,
}

/// What a dataset folds from each member property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySummary<'a> {
    pub definition: &'a str,
    pub labels: &'a BTreeSet<String>,
}

fn split_counts<K: Clone>(map: &BTreeMap<K, u64>) -> (Vec<K>, Vec<u64>) {
    map.iter().map(|(k, v)| (k.clone(), *v)).unzip()
}

/// Ratios are non-negative, so their bit patterns order like the values.
fn ratio_key(ratios: &[f64]) -> Vec<u64> {
    ratios.iter().map(|r| r.to_bits()).collect()
}

/// Folds configurations into a [`ConfigurationSetAggregate`].
#[derive(Clone, Debug, Default)]
pub struct ConfigurationSetAccumulator {
    nconfigurations: u64,
    nsites: u64,
    element_sites: BTreeMap<String, u64>,
    individual_ratios: BTreeSet<Vec<u64>>,
    labels: BTreeMap<String, u64>,
    reduced: BTreeSet<String>,
    anonymous: BTreeSet<String>,
    hill: BTreeSet<String>,
    nperiodic: BTreeSet<u8>,
    dimension_types: BTreeSet<[u8; 3]>,
}

impl ConfigurationSetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one configuration and its labels.
    pub fn update(&mut self, summary: &ConfigurationSummary, labels: &BTreeSet<String>) {
        self.nconfigurations += 1;
        self.nsites += summary.nsites;
        for (el, &n) in summary.elements.iter().zip(&summary.element_counts) {
            *self.element_sites.entry(el.clone()).or_default() += n;
        }
        self.individual_ratios
            .insert(ratio_key(&summary.elements_ratios));
        for label in labels {
            *self.labels.entry(label.clone()).or_default() += 1;
        }
        self.reduced
            .insert(summary.chemical_formula_reduced.clone());
        self.anonymous
            .insert(summary.chemical_formula_anonymous.clone());
        self.hill.insert(summary.chemical_formula_hill.clone());
        self.nperiodic.insert(summary.nperiodic_dimensions);
        self.dimension_types.insert(summary.dimension_types);
    }

    /// Pools an already finalized set aggregate into this one.
    pub fn merge_aggregate(&mut self, agg: &ConfigurationSetAggregate) {
        self.nconfigurations += agg.nconfigurations;
        self.nsites += agg.nsites;
        for (el, &n) in agg.elements.iter().zip(&agg.element_site_counts) {
            *self.element_sites.entry(el.clone()).or_default() += n;
        }
        self.individual_ratios
            .extend(agg.individual_elements_ratios.iter().map(|r| ratio_key(r)));
        for (label, &n) in agg.labels.iter().zip(&agg.labels_counts) {
            *self.labels.entry(label.clone()).or_default() += n;
        }
        self.reduced
            .extend(agg.chemical_formula_reduced.iter().cloned());
        self.anonymous
            .extend(agg.chemical_formula_anonymous.iter().cloned());
        self.hill.extend(agg.chemical_formula_hill.iter().cloned());
        self.nperiodic.extend(agg.nperiodic_dimensions.iter().copied());
        self.dimension_types
            .extend(agg.dimension_types.iter().copied());
    }

    pub fn finalize(self) -> ConfigurationSetAggregate {
        let (elements, element_site_counts) = split_counts(&self.element_sites);
        let total_elements_ratios = if self.nsites == 0 {
            Vec::new()
        } else {
            element_site_counts
                .iter()
                .map(|&n| n as f64 / self.nsites as f64)
                .collect()
        };
        let (labels, labels_counts) = split_counts(&self.labels);
        ConfigurationSetAggregate {
            nconfigurations: self.nconfigurations,
            nsites: self.nsites,
            nelements: elements.len(),
            elements,
            individual_elements_ratios: self
                .individual_ratios
                .into_iter()
                .map(|k| k.into_iter().map(f64::from_bits).collect())
                .collect(),
            total_elements_ratios,
            element_site_counts,
            labels,
            labels_counts,
            chemical_formula_reduced: self.reduced.into_iter().collect(),
            chemical_formula_anonymous: self.anonymous.into_iter().collect(),
            chemical_formula_hill: self.hill.into_iter().collect(),
            nperiodic_dimensions: self.nperiodic.into_iter().collect(),
            dimension_types: self.dimension_types.into_iter().collect(),
        }
    }
}

/// Pools configuration-set aggregates and properties into a
/// [`DatasetAggregate`].
#[derive(Clone, Debug, Default)]
pub struct DatasetAccumulator {
    configurations: ConfigurationSetAccumulator,
    nproperties: u64,
    types: BTreeMap<String, u64>,
    property_labels: BTreeMap<String, u64>,
}

impl DatasetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_configuration_set(&mut self, agg: &ConfigurationSetAggregate) {
        self.configurations.merge_aggregate(agg);
    }

    pub fn update_property(&mut self, property: PropertySummary<'_>) {
        self.nproperties += 1;
        *self
            .types
            .entry(property.definition.to_string())
            .or_default() += 1;
        for label in property.labels {
            *self.property_labels.entry(label.clone()).or_default() += 1;
        }
    }

    pub fn finalize(self) -> DatasetAggregate {
        let cs = self.configurations.finalize();
        let (types, types_counts) = split_counts(&self.types);
        let (property_labels, property_labels_counts) = split_counts(&self.property_labels);
        DatasetAggregate {
            nconfigurations: cs.nconfigurations,
            nsites: cs.nsites,
            nelements: cs.nelements,
            elements: cs.elements,
            individual_elements_ratios: cs.individual_elements_ratios,
            total_elements_ratios: cs.total_elements_ratios,
            element_site_counts: cs.element_site_counts,
            configuration_labels: cs.labels,
            configuration_labels_counts: cs.labels_counts,
            chemical_formula_reduced: cs.chemical_formula_reduced,
            chemical_formula_anonymous: cs.chemical_formula_anonymous,
            chemical_formula_hill: cs.chemical_formula_hill,
            nperiodic_dimensions: cs.nperiodic_dimensions,
            dimension_types: cs.dimension_types,
            nproperties: self.nproperties,
            types,
            types_counts,
            property_labels,
            property_labels_counts,
        }
    }
}
