use cfkv_result::Result;
use cfkv_types::AtomicStructure;
use serde::{Deserialize, Serialize};

/// Composition, formulas and periodicity of one configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSummary {
    /// Element symbols, sorted.
    pub elements: Vec<String>,
    pub nelements: usize,
    /// Fraction of sites per entry of `elements`.
    pub elements_ratios: Vec<f64>,
    /// Site count per entry of `elements`.
    pub element_counts: Vec<u64>,
    pub chemical_formula_reduced: String,
    pub chemical_formula_anonymous: String,
    pub chemical_formula_hill: String,
    pub nsites: u64,
    /// Periodic boundary flags as 0/1.
    pub dimension_types: [u8; 3],
    pub nperiodic_dimensions: u8,
    pub lattice_vectors: [[f64; 3]; 3],
}

impl ConfigurationSummary {
    pub fn from_structure(structure: &AtomicStructure) -> Result<Self> {
        let composition = structure.composition()?;
        Ok(Self {
            nelements: composition.nelements(),
            elements_ratios: composition.elements_ratios(),
            chemical_formula_reduced: composition.reduced_formula(),
            chemical_formula_anonymous: composition.anonymous_formula(),
            chemical_formula_hill: composition.hill_formula(),
            nsites: composition.nsites,
            element_counts: composition.counts,
            elements: composition.elements,
            dimension_types: structure.pbc.map(u8::from),
            nperiodic_dimensions: structure.nperiodic_dimensions(),
            lattice_vectors: structure.cell,
        })
    }
}
